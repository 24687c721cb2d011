//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the scene core:
//! - Math types and transform composition
//! - Typed handles for objects, nodes, scenes and assets
//! - Worker pools for the animation phase and background loading
//! - Frame timing
//! - Logging utilities

pub mod math;
pub mod handles;
pub mod task_pool;
pub mod time;
pub mod logging;
