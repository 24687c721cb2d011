//! Engine facade
//!
//! Owns the running scenes together with the converter that links libraries
//! into them, the frame orchestrator and the rasterizer they are drawn with.

use std::sync::Arc;

use thiserror::Error;

use crate::config::{Config, ConfigError, EngineConfig};
use crate::convert::{AssetSource, LibLoadError, LibLoadStatus, LoadOptions, SceneConverter};
use crate::foundation::handles::SceneId;
use crate::foundation::time::FrameClock;
use crate::orchestrator::{FrameOrchestrator, FrameStats};
use crate::render::Rasterizer;
use crate::scene::{MergeError, Scene};

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// No running scene has this name
    #[error("scene not found: {0}")]
    SceneNotFound(String),

    /// Merge refused
    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),

    /// Library link or free refused
    #[error("library error: {0}")]
    LibLoad(#[from] LibLoadError),

    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Main engine struct
pub struct Engine {
    config: EngineConfig,
    scenes: Vec<Scene>,
    converter: SceneConverter,
    orchestrator: FrameOrchestrator,
    rasterizer: Box<dyn Rasterizer>,
}

impl Engine {
    /// Create an engine; fails if `config` does not validate
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn AssetSource>,
        rasterizer: Box<dyn Rasterizer>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        log::info!(
            "Initializing engine ({} animation workers, {} loader workers)",
            config.animation_workers,
            config.loader_workers
        );
        Ok(Self {
            converter: SceneConverter::new(source, config.scene.clone(), config.loader_workers),
            orchestrator: FrameOrchestrator::new(config.animation_workers),
            scenes: Vec::new(),
            rasterizer,
            config,
        })
    }

    /// Create an engine from a TOML or RON configuration file
    pub fn from_config_file(
        path: &str,
        source: Arc<dyn AssetSource>,
        rasterizer: Box<dyn Rasterizer>,
    ) -> Result<Self, EngineError> {
        let config = EngineConfig::load_from_file(path)?;
        Self::new(config, source, rasterizer)
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Frame clock
    pub fn clock(&self) -> &FrameClock {
        self.orchestrator.clock()
    }

    /// Frame orchestrator
    pub fn orchestrator_mut(&mut self) -> &mut FrameOrchestrator {
        &mut self.orchestrator
    }

    /// Library converter
    pub fn converter(&self) -> &SceneConverter {
        &self.converter
    }

    /// Create an empty scene and start running it
    pub fn create_scene(&mut self, name: impl Into<String>) -> SceneId {
        let scene = self.converter.create_scene(name);
        self.add_scene(scene)
    }

    /// Start running a scene built elsewhere.
    ///
    /// Scenes without a conversion context join the converter's, so
    /// libraries can be linked into them.
    pub fn add_scene(&mut self, mut scene: Scene) -> SceneId {
        if scene.converter().is_none() {
            scene.set_converter(Some(self.converter.id()));
        }
        let id = scene.id();
        log::info!("Scene '{}' added", scene.name());
        self.scenes.push(scene);
        id
    }

    /// Stop running the scene called `name` and hand it back
    pub fn remove_scene(&mut self, name: &str) -> Result<Scene, EngineError> {
        let index = self.index_of(name)?;
        let scene = self.scenes.remove(index);
        log::info!("Scene '{}' removed", name);
        Ok(scene)
    }

    fn index_of(&self, name: &str) -> Result<usize, EngineError> {
        self.scenes
            .iter()
            .position(|scene| scene.name() == name)
            .ok_or_else(|| EngineError::SceneNotFound(name.to_string()))
    }

    /// Running scenes in frame order
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    /// Scene called `name`
    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.iter().find(|scene| scene.name() == name)
    }

    /// Scene called `name`, for modification
    pub fn scene_mut(&mut self, name: &str) -> Option<&mut Scene> {
        self.scenes.iter_mut().find(|scene| scene.name() == name)
    }

    /// Link library data into the scene called `scene`
    pub fn link_library(
        &mut self,
        path: &str,
        group: &str,
        scene: &str,
        options: LoadOptions,
    ) -> Result<Arc<LibLoadStatus>, EngineError> {
        let index = self.index_of(scene)?;
        let status = self.converter.link_library(path, group, &mut self.scenes[index], options)?;
        Ok(status)
    }

    /// Unlink a library from every running scene
    pub fn free_library(&mut self, path: &str) -> Result<(), EngineError> {
        self.converter.free_library(path, &mut self.scenes)?;
        Ok(())
    }

    /// Wait for background library loads and merge them
    pub fn finalize_async_loads(&mut self) -> usize {
        self.converter.finalize_async_loads(&mut self.scenes)
    }

    /// Fold the scene called `donor` into the one called `recipient`.
    ///
    /// The donor stops running. When the merge is refused both scenes are
    /// left untouched.
    pub fn merge_scenes(&mut self, recipient: &str, donor: &str) -> Result<(), EngineError> {
        let recipient_index = self.index_of(recipient)?;
        let donor_index = self.index_of(donor)?;
        if recipient_index == donor_index {
            return Err(MergeError::SameScene.into());
        }
        self.scenes[recipient_index].can_merge(&self.scenes[donor_index])?;

        let donor = self.scenes.remove(donor_index);
        let recipient_index = if donor_index < recipient_index {
            recipient_index - 1
        } else {
            recipient_index
        };
        self.scenes[recipient_index].merge_scene(donor)?;
        Ok(())
    }

    /// Merge finished background loads, then run one frame of every scene
    pub fn next_frame(&mut self, delta: f64) -> FrameStats {
        let merged = self.converter.merge_async_loads(&mut self.scenes);
        if merged > 0 {
            log::debug!("Merged {} library scenes before frame", merged);
        }
        self.orchestrator
            .next_frame(delta, &mut self.scenes, self.rasterizer.as_mut())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Unmerged scenes would otherwise be dropped with the converter
        self.finalize_async_loads();
        log::info!("Engine shutdown complete");
    }
}
