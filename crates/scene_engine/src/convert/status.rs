//! Progress of one library load

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::foundation::handles::SceneId;

#[derive(Debug)]
struct Progress {
    value: f32,
    finished: bool,
    started: Instant,
    ended: Option<Instant>,
}

/// Shared state of a library load.
///
/// Written by the loader thread while converting and by the main thread when
/// the converted scenes are merged. A load counts as finished only after the
/// merge.
#[derive(Debug)]
pub struct LibLoadStatus {
    path: String,
    target: SceneId,
    progress: Mutex<Progress>,
}

impl LibLoadStatus {
    /// Start tracking a load of `path` into `target`
    pub fn new(path: impl Into<String>, target: SceneId) -> Self {
        Self {
            path: path.into(),
            target,
            progress: Mutex::new(Progress {
                value: 0.0,
                finished: false,
                started: Instant::now(),
                ended: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Progress> {
        self.progress.lock().unwrap_or_else(|poisoned| {
            log::warn!("Load status of '{}' was poisoned, recovering", self.path);
            PoisonError::into_inner(poisoned)
        })
    }

    /// Library path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Scene the library is merged into
    pub fn target(&self) -> SceneId {
        self.target
    }

    /// Completion between 0 and 1
    pub fn progress(&self) -> f32 {
        self.lock().value
    }

    /// Whether conversion and merge are both done
    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// Add to the completion, capped at 1
    pub fn add_progress(&self, amount: f32) {
        let mut progress = self.lock();
        progress.value = (progress.value + amount).min(1.0);
    }

    /// Mark the load as done
    pub fn finish(&self) {
        let mut progress = self.lock();
        progress.value = 1.0;
        progress.finished = true;
        progress.ended = Some(Instant::now());
    }

    /// Time from start to finish, or until now while unfinished
    pub fn time_taken(&self) -> Duration {
        let progress = self.lock();
        progress
            .ended
            .unwrap_or_else(Instant::now)
            .saturating_duration_since(progress.started)
    }
}
