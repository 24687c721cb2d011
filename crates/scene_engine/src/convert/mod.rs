//! Library linking
//!
//! Content from external libraries is pulled into a running scene through a
//! [`SceneConverter`]. The converter asks an [`AssetSource`] for converted
//! scenes, meshes or actions and folds them into a target scene, either
//! right away or on the loader pool, in which case the converted scenes wait
//! in a locked merge queue until the main thread drains it.
//!
//! ```text
//! link_library ──(sync)──────────────────────────────▶ Scene::merge_scene
//!      └──(async)──▶ loader pool ──▶ merge queue ──▶ merge_async_loads
//! ```

mod converter;
mod status;

pub use converter::SceneConverter;
pub use status::LibLoadStatus;

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use thiserror::Error;

use crate::config::SceneConfig;
use crate::render::Mesh;
use crate::scene::{Action, Scene};

bitflags! {
    /// Options of a library link
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LoadOptions: u16 {
        /// Keep authored scene settings of linked scenes
        const SCENE_DATA = 1 << 0;
        /// Report every linked scene, mesh and action at info level
        const VERBOSE = 1 << 1;
        /// Make the library's scripts importable
        const LOAD_SCRIPTS = 1 << 2;
        /// Register the library's actions along with its scenes
        const LOAD_ACTIONS = 1 << 3;
        /// Convert on the loader pool and merge later
        const ASYNC = 1 << 4;
    }
}

/// Kind of data linked from a library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryGroup {
    /// Whole scenes, merged into the target
    Scene,
    /// Meshes, registered by name in the target
    Mesh,
    /// Actions, registered by name in the target
    Action,
}

impl FromStr for LibraryGroup {
    type Err = LibLoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Scene" => Ok(Self::Scene),
            "Mesh" => Ok(Self::Mesh),
            "Action" => Ok(Self::Action),
            other => Err(LibLoadError::InvalidGroup(other.to_string())),
        }
    }
}

impl fmt::Display for LibraryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scene => "Scene",
            Self::Mesh => "Mesh",
            Self::Action => "Action",
        };
        f.write_str(name)
    }
}

/// Library link and free failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibLoadError {
    /// Only scenes, meshes and actions can be linked
    #[error("invalid ID type given \"{0}\"")]
    InvalidGroup(String),

    /// The library is linked already
    #[error("library already open \"{0}\"")]
    AlreadyOpen(String),

    /// The asset source has no such library
    #[error("could not open library \"{0}\"")]
    CouldNotOpen(String),

    /// An asynchronous load of the library has not been merged yet
    #[error("library \"{0}\" is currently being loaded asynchronously and cannot be freed until this process is done")]
    StillLoading(String),

    /// No library is linked under this path
    #[error("library \"{0}\" is not loaded")]
    NotLoaded(String),
}

/// External provider of converted content.
///
/// Called from loader threads for asynchronous links, hence `Send + Sync`.
pub trait AssetSource: Send + Sync {
    /// Whether a library exists at `path`
    fn can_open(&self, path: &str) -> bool;

    /// Names of the scenes stored in the library
    fn scene_names(&self, path: &str) -> Vec<String>;

    /// Convert one scene of the library into a fresh scene.
    ///
    /// `None` when the scene cannot be converted; the link goes on without it.
    fn convert_scene(&self, path: &str, name: &str, config: &SceneConfig, options: LoadOptions) -> Option<Scene>;

    /// Meshes stored in the library
    fn meshes(&self, path: &str) -> Vec<Mesh>;

    /// Actions stored in the library
    fn actions(&self, path: &str) -> Vec<Action>;

    /// Script modules stored in the library
    fn scripts(&self, _path: &str) -> Vec<String> {
        Vec::new()
    }
}
