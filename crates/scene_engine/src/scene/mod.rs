//! Scene core
//!
//! A [`Scene`] owns everything needed to run one level:
//! - the object arena and the container lists objects live in
//! - the scenegraph of transform nodes
//! - the logic manager and its event managers
//! - name, asset and mesh lookup tables
//! - render buckets and, optionally, a physics environment
//!
//! Objects are created by replicating inactive templates
//! ([`Scene::add_replica_object`]), torn down in two phases
//! ([`Scene::delayed_remove_object`] during the frame,
//! [`Scene::logic_end_frame`] at its end) and can be folded into another
//! scene with [`Scene::merge_scene`].

pub mod animation;
pub mod bounds;
pub mod group;
pub mod node;
pub mod object;
pub mod registry;
pub mod store;

mod culling;
mod frame;
mod game_scene;
mod lifecycle;
mod merge;
mod replication;

#[cfg(test)]
mod tests;

pub use animation::{Action, ActionManager, ActionPlayback, Deformer, LocationKey};
pub use bounds::{BoundingBox, Frustum, Intersection, Plane};
pub use game_scene::{DrawCallback, Scene};
pub use group::{GroupDef, GroupMember};
pub use merge::MergeError;
pub use node::{ClientRef, NodeController, OwnedNode, SceneGraph, SceneGraphNode};
pub use object::{CameraData, GameObject, ObjectKind, PropertyValue, TIMEBOMB_PROPERTY};
pub use registry::{AssetRegistry, ObjectRegistry};
pub use store::{ListKind, ObjectList, ObjectLists, ObjectStore, Release};
