//! # Scene Engine
//!
//! The scene core of a real-time 3D game engine: object lifecycle,
//! replication of object hierarchies, the per-frame pipeline and merging of
//! content loaded in the background.
//!
//! ## Features
//!
//! - **Object arena**: handle-addressed objects with a container membership
//!   ledger; objects die when their last membership goes
//! - **Replication**: hierarchies and dupli groups copied with their logic
//!   links rewired to the copies
//! - **Deferred removal**: objects scheduled during a frame are torn down at
//!   its end
//! - **Frame pipeline**: logic, parallel animation, scenegraph, culling and
//!   render submission in a fixed order
//! - **Library linking**: synchronous or background loads merged into
//!   running scenes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! fn spawn_and_run(mut scene: Scene, template: ObjectId) {
//!     let pool = TaskPool::new("animation", 2);
//!     scene.add_replica_object(template, None, 100.0);
//!
//!     scene.logic_begin_frame(0.0, 1.0 / 60.0);
//!     scene.logic_update_frame();
//!     scene.update_animations(0.0, &pool);
//!     scene.update_parents(0.0);
//!     scene.logic_end_frame();
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod physics;
pub mod render;
pub mod logic;
pub mod scene;
pub mod convert;
pub mod orchestrator;

mod engine;

pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        Engine, EngineError,
        config::{Config, EngineConfig, SceneConfig},
        convert::{AssetSource, LibLoadError, LibLoadStatus, LoadOptions, SceneConverter},
        foundation::{
            handles::{AssetId, ObjectId, SceneId},
            math::{Quat, Transform, Vec3},
            task_pool::TaskPool,
        },
        logic::{Actuator, ActuatorKind, Controller, ControllerKind, Sensor, SensorKind},
        orchestrator::{FrameOrchestrator, FramePhase, FrameStats},
        render::{Material, Mesh, NullRasterizer, Rasterizer},
        scene::{Action, GameObject, GroupDef, MergeError, ObjectKind, PropertyValue, Scene},
    };
}
