//! Per-frame pipeline
//!
//! Runs the phases of every non-suspended scene in a fixed order:
//!
//! ```text
//! LogicBegin → LogicUpdate → AnimationUpdate → ScenegraphUpdate → LogicEnd
//!     → ActivityCulling → VisibilityCulling → RenderSubmission
//! ```
//!
//! Only the animation phase fans out to worker threads, and it joins before
//! the scenegraph update. Nothing is removed before `LogicEnd`.

use std::fmt;

use crate::foundation::handles::SceneId;
use crate::foundation::task_pool::TaskPool;
use crate::foundation::time::FrameClock;
use crate::render::Rasterizer;
use crate::scene::Scene;

/// Phase of the per-frame pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramePhase {
    /// Timed objects count down and expire
    LogicBegin,
    /// Event managers fire controllers and actuators
    LogicUpdate,
    /// Actions and deformers advance on the animation pool
    AnimationUpdate,
    /// Scheduled nodes recompute their world transforms
    ScenegraphUpdate,
    /// Pending removals are carried out
    LogicEnd,
    /// Objects far from the camera are suspended
    ActivityCulling,
    /// Objects are flagged visible or culled for the active camera
    VisibilityCulling,
    /// Buckets are refreshed and handed to the rasterizer
    RenderSubmission,
}

impl FramePhase {
    /// Every phase in execution order
    pub const ORDER: [Self; 8] = [
        Self::LogicBegin,
        Self::LogicUpdate,
        Self::AnimationUpdate,
        Self::ScenegraphUpdate,
        Self::LogicEnd,
        Self::ActivityCulling,
        Self::VisibilityCulling,
        Self::RenderSubmission,
    ];
}

impl fmt::Display for FramePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Called when a scene enters a phase
pub type PhaseObserver = Box<dyn FnMut(SceneId, FramePhase) + Send>;

/// What one frame did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Scenes that ran the pipeline
    pub scenes_run: usize,
    /// Scenes skipped because they are suspended
    pub scenes_suspended: usize,
    /// Actuator commands applied
    pub commands: usize,
    /// Scenegraph nodes updated
    pub nodes_updated: usize,
    /// Scenes submitted to the rasterizer
    pub scenes_rendered: usize,
}

impl FrameStats {
    fn accumulate(&mut self, other: Self) {
        self.scenes_run += other.scenes_run;
        self.scenes_suspended += other.scenes_suspended;
        self.commands += other.commands;
        self.nodes_updated += other.nodes_updated;
        self.scenes_rendered += other.scenes_rendered;
    }
}

/// Drives scenes through the frame phases
pub struct FrameOrchestrator {
    animation_pool: TaskPool,
    clock: FrameClock,
    phase: Option<FramePhase>,
    observer: Option<PhaseObserver>,
}

impl FrameOrchestrator {
    /// Create an orchestrator with `animation_workers` animation threads
    pub fn new(animation_workers: usize) -> Self {
        Self {
            animation_pool: TaskPool::new("animation", animation_workers),
            clock: FrameClock::new(),
            phase: None,
            observer: None,
        }
    }

    /// Frame clock
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Phase currently running; `None` between frames
    pub fn current_phase(&self) -> Option<FramePhase> {
        self.phase
    }

    /// Install a callback notified as each scene enters each phase
    pub fn set_phase_observer(&mut self, observer: Option<PhaseObserver>) {
        self.observer = observer;
    }

    fn enter(&mut self, scene: SceneId, phase: FramePhase) {
        log::trace!("Scene {} entering {}", scene, phase);
        self.phase = Some(phase);
        if let Some(observer) = self.observer.as_mut() {
            observer(scene, phase);
        }
    }

    /// Advance the clock by `delta` seconds and run one frame of every
    /// scene that is not suspended
    pub fn next_frame(&mut self, delta: f64, scenes: &mut [Scene], rasterizer: &mut dyn Rasterizer) -> FrameStats {
        self.clock.advance(delta);
        let mut stats = FrameStats::default();
        for scene in scenes.iter_mut() {
            if scene.is_suspended() {
                stats.scenes_suspended += 1;
                continue;
            }
            stats.accumulate(self.run_scene(scene, rasterizer));
        }
        log::trace!(
            "Frame {} done: {} scenes, {} commands, {} nodes",
            self.clock.frame_count(),
            stats.scenes_run,
            stats.commands,
            stats.nodes_updated
        );
        stats
    }

    /// Run every phase of one scene at the current clock time
    pub fn run_scene(&mut self, scene: &mut Scene, rasterizer: &mut dyn Rasterizer) -> FrameStats {
        let time = self.clock.current_time();
        let step = self.clock.frame_step();
        let id = scene.id();
        let mut stats = FrameStats {
            scenes_run: 1,
            ..FrameStats::default()
        };

        self.enter(id, FramePhase::LogicBegin);
        scene.logic_begin_frame(time, step);

        self.enter(id, FramePhase::LogicUpdate);
        stats.commands = scene.logic_update_frame();

        self.enter(id, FramePhase::AnimationUpdate);
        scene.update_animations(time, &self.animation_pool);

        self.enter(id, FramePhase::ScenegraphUpdate);
        stats.nodes_updated = scene.update_parents(time);

        self.enter(id, FramePhase::LogicEnd);
        scene.logic_end_frame();

        self.enter(id, FramePhase::ActivityCulling);
        scene.update_object_activity();

        self.enter(id, FramePhase::VisibilityCulling);
        let view = scene.cull_active_camera();

        self.enter(id, FramePhase::RenderSubmission);
        if let Some(view) = view {
            scene.render_buckets(&view, rasterizer);
            stats.scenes_rendered = 1;
        }

        self.phase = None;
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use crate::logic::{Actuator, ActuatorKind, Controller, ControllerKind, Sensor, SensorKind};
    use crate::render::NullRasterizer;
    use crate::scene::{CameraData, GameObject, ObjectKind};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_phases_run_in_order() {
        let mut orchestrator = FrameOrchestrator::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        orchestrator.set_phase_observer(Some(Box::new(move |_, phase| {
            record.lock().expect("record").push(phase);
        })));

        let mut scenes = vec![Scene::new("main", SceneConfig::default())];
        let mut rasterizer = NullRasterizer::default();
        let stats = orchestrator.next_frame(1.0 / 60.0, &mut scenes, &mut rasterizer);

        assert_eq!(stats.scenes_run, 1);
        assert_eq!(*seen.lock().expect("seen"), FramePhase::ORDER.to_vec());
        assert_eq!(orchestrator.current_phase(), None);
        assert_eq!(orchestrator.clock().frame_count(), 1);
    }

    #[test]
    fn test_culling_and_submission_are_separate_phases() {
        let mut orchestrator = FrameOrchestrator::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        orchestrator.set_phase_observer(Some(Box::new(move |_, phase| {
            record.lock().expect("record").push(phase);
        })));

        // No camera: both phases still run, nothing is submitted
        let mut scenes = vec![Scene::new("dark", SceneConfig::default())];
        let mut rasterizer = NullRasterizer::default();
        let stats = orchestrator.next_frame(1.0 / 60.0, &mut scenes, &mut rasterizer);

        let phases = seen.lock().expect("seen").clone();
        assert_eq!(
            &phases[phases.len() - 2..],
            &[FramePhase::VisibilityCulling, FramePhase::RenderSubmission]
        );
        assert_eq!(stats.scenes_rendered, 0);
        assert_eq!(rasterizer.submissions, 0);
    }

    #[test]
    fn test_suspended_scenes_are_skipped() {
        let mut orchestrator = FrameOrchestrator::new(0);
        let mut paused = Scene::new("paused", SceneConfig::default());
        paused.suspend();
        let mut scenes = vec![paused, Scene::new("live", SceneConfig::default())];
        let mut rasterizer = NullRasterizer::default();

        let stats = orchestrator.next_frame(0.1, &mut scenes, &mut rasterizer);
        assert_eq!(stats.scenes_run, 1);
        assert_eq!(stats.scenes_suspended, 1);
    }

    #[test]
    fn test_end_object_is_removed_within_the_frame() {
        let mut orchestrator = FrameOrchestrator::new(2);
        let mut scene = Scene::new("main", SceneConfig::default());
        scene.add_object(
            GameObject::new(
                "camera",
                ObjectKind::Camera(CameraData::perspective(1.0, std::f32::consts::FRAC_PI_2, 0.1, 100.0)),
            ),
            None,
            true,
        );
        let doomed = scene.add_object(GameObject::new("doomed", ObjectKind::Empty), None, true);
        let sensor = scene
            .add_sensor(doomed, Sensor::new("always", SensorKind::Always))
            .expect("sensor");
        let controller = scene
            .add_controller(doomed, Controller::new("and", ControllerKind::And))
            .expect("controller");
        let actuator = scene
            .add_actuator(doomed, Actuator::new("end", ActuatorKind::EndObject))
            .expect("actuator");
        assert!(scene.link_sensor(controller, sensor));
        assert!(scene.link_actuator(controller, actuator));

        let mut scenes = vec![scene];
        let mut rasterizer = NullRasterizer::default();
        let stats = orchestrator.next_frame(1.0 / 60.0, &mut scenes, &mut rasterizer);

        assert_eq!(stats.commands, 1);
        assert_eq!(stats.scenes_rendered, 1);
        assert!(scenes[0].object(doomed).is_none());
        assert!(scenes[0].euthanasia_list().is_empty());
        assert_eq!(rasterizer.submissions, 1);
    }
}
