//! # Scene Core Settings
//!
//! Tunables for replication, lifetime handling, culling and the worker pools.
//!
//! - **Scene Config**: per-scene replication and culling behavior
//! - **Engine Config**: worker pool sizes, logging, and the scene defaults
//!   applied to every scene the engine creates

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};

/// Smallest activity culling radius a scene accepts
pub const MIN_ACTIVITY_RADIUS: f32 = 0.5;

/// # Scene Configuration
///
/// Read by the replication engine (recursion bound, lifespans) and the frame
/// pipeline (culling and obstacle simulation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Deepest dupli-group nesting instantiated; deeper levels are skipped
    pub max_dupli_recursion: u32,
    /// Seconds per lifespan unit for timed objects (lifespans are authored in frames)
    pub timebomb_frame_seconds: f32,
    /// Ask the physics broad-phase for visible objects instead of testing each one
    pub broadphase_culling: bool,
    /// Suspend objects far from the active camera
    pub activity_culling: bool,
    /// Manhattan half-extent of the activity box around the camera
    pub activity_radius: f32,
    /// Advance the obstacle simulation at the end of each logic frame
    pub obstacle_simulation: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            max_dupli_recursion: 8,
            timebomb_frame_seconds: 0.02,
            broadphase_culling: false,
            activity_culling: false,
            activity_radius: 10.0,
            obstacle_simulation: false,
        }
    }
}

impl SceneConfig {
    /// Validate the scene configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.timebomb_frame_seconds <= 0.0 {
            return Err("timebomb_frame_seconds must be positive".to_string());
        }
        if !self.activity_radius.is_finite() {
            return Err("activity_radius must be finite".to_string());
        }
        Ok(())
    }

    /// Activity radius with the lower bound applied
    pub fn clamped_activity_radius(&self) -> f32 {
        self.activity_radius.max(MIN_ACTIVITY_RADIUS)
    }
}

/// Logger setup used by [`crate::foundation::logging::init_with_config`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `env_logger` filter used when `RUST_LOG` is not set
    pub filter: String,
    /// Prefix records with millisecond timestamps
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            timestamps: true,
        }
    }
}

/// # Engine Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Defaults for every scene the engine creates
    pub scene: SceneConfig,
    /// Threads in the animation pool (0 runs animation inline)
    pub animation_workers: usize,
    /// Threads in the background loader pool (0 converts inline)
    pub loader_workers: usize,
    /// Logger setup
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let animation_workers = std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1).max(1))
            .unwrap_or(2);
        Self {
            scene: SceneConfig::default(),
            animation_workers,
            loader_workers: 1,
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Validate all sub-configurations
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scene.validate().map_err(ConfigError::Invalid)?;
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("logging filter is empty".to_string()));
        }
        Ok(())
    }
}

impl Config for SceneConfig {}
impl Config for EngineConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scene.max_dupli_recursion, 8);
        assert!(config.animation_workers >= 1);
    }

    #[test]
    fn test_activity_radius_is_clamped() {
        let config = SceneConfig {
            activity_radius: 0.1,
            ..SceneConfig::default()
        };
        assert!((config.clamped_activity_radius() - MIN_ACTIVITY_RADIUS).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SceneConfig = toml::from_str("max_dupli_recursion = 3\n").unwrap();
        assert_eq!(config.max_dupli_recursion, 3);
        assert!((config.timebomb_frame_seconds - 0.02).abs() < f32::EPSILON);
    }

    #[test]
    fn test_ron_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("scene_config_{}.ron", std::process::id()));
        let path = path.to_string_lossy().to_string();
        let config = SceneConfig {
            broadphase_culling: true,
            ..SceneConfig::default()
        };
        config.save_to_file(&path).unwrap();
        let loaded = SceneConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let err = SceneConfig::load_from_file("settings.json");
        assert!(matches!(err, Err(ConfigError::Io(_)) | Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_invalid_timebomb_scale() {
        let config = EngineConfig {
            scene: SceneConfig {
                timebomb_frame_seconds: 0.0,
                ..SceneConfig::default()
            },
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
