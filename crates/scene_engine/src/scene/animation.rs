//! Actions, deformers and per-object animation tasks
//!
//! The animation phase runs one [`AnimationTask`] per animated object on a
//! task pool. A task owns everything it writes: the object's
//! [`ActionManager`] and the deformers it claimed, all moved out of the
//! store before dispatch and moved back after the join. Tasks therefore
//! never share mutable state.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::foundation::handles::{AssetId, ObjectId};
use crate::foundation::math::Vec3;

/// Mesh deformer (skinning, shape keys, modifiers) driven by the animation phase
pub trait Deformer: Send {
    /// Recompute deformed vertices; returns whether anything changed
    fn update(&mut self) -> bool;

    /// Refresh bucket-side data (bounds) before culling
    fn update_buckets(&mut self);

    /// Independent copy for a replicated object
    fn replica(&self) -> Box<dyn Deformer>;
}

/// Location keyframe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationKey {
    /// Seconds from the start of the action
    pub time: f32,
    /// Local position at `time`
    pub position: Vec3,
}

/// Authored action with a location channel
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Action name, registered in the scene's action table
    pub name: String,
    /// Authored data the action was converted from
    pub asset: Option<AssetId>,
    /// Keys sorted by time
    pub keys: Vec<LocationKey>,
}

impl Action {
    /// Create an action, sorting its keys
    pub fn new(name: impl Into<String>, mut keys: Vec<LocationKey>) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            name: name.into(),
            asset: None,
            keys,
        }
    }

    /// Length in seconds
    pub fn duration(&self) -> f32 {
        self.keys.last().map_or(0.0, |k| k.time)
    }

    /// Linearly interpolated location at `time`
    pub fn sample(&self, time: f32) -> Option<Vec3> {
        let first = self.keys.first()?;
        if time <= first.time {
            return Some(first.position);
        }
        for pair in self.keys.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if time <= b.time {
                let span = b.time - a.time;
                let t = if span > 0.0 { (time - a.time) / span } else { 1.0 };
                return Some(a.position.lerp(&b.position, t));
            }
        }
        self.keys.last().map(|k| k.position)
    }
}

/// One action being played on an object
#[derive(Debug, Clone)]
pub struct ActionPlayback {
    action: Arc<Action>,
    start_time: Option<f64>,
    speed: f32,
    looping: bool,
    local_time: f32,
    finished: bool,
}

impl ActionPlayback {
    /// Name of the played action
    pub fn name(&self) -> &str {
        &self.action.name
    }

    /// Position in the action, seconds
    pub fn local_time(&self) -> f32 {
        self.local_time
    }

    /// Whether a non-looping action reached its end
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Actions playing on one object
#[derive(Debug, Clone, Default)]
pub struct ActionManager {
    playing: Vec<ActionPlayback>,
    pending_location: Option<Vec3>,
    pose_updates: u64,
}

impl ActionManager {
    /// Start `action`; its clock starts at the next update
    pub fn play(&mut self, action: Arc<Action>, speed: f32, looping: bool) {
        self.playing.retain(|p| p.action.name != action.name);
        self.playing.push(ActionPlayback {
            action,
            start_time: None,
            speed,
            looping,
            local_time: 0.0,
            finished: false,
        });
    }

    /// Stop an action by name
    pub fn stop(&mut self, name: &str) -> bool {
        let before = self.playing.len();
        self.playing.retain(|p| p.action.name != name);
        before != self.playing.len()
    }

    /// Drop every action that came from `asset`
    pub fn stop_asset(&mut self, asset: AssetId) {
        self.playing.retain(|p| p.action.asset != Some(asset));
    }

    /// Whether anything is playing
    pub fn is_playing(&self) -> bool {
        !self.playing.is_empty()
    }

    /// Playing actions
    pub fn playing(&self) -> &[ActionPlayback] {
        &self.playing
    }

    /// Number of updates that evaluated a pose
    pub fn pose_updates(&self) -> u64 {
        self.pose_updates
    }

    /// Advance action clocks to `curtime`.
    ///
    /// When `apply_pose` is false only time and end-of-action handling run;
    /// the pose is left untouched.
    pub fn update(&mut self, curtime: f64, apply_pose: bool) {
        let mut sampled = None;
        for playback in &mut self.playing {
            let start = *playback.start_time.get_or_insert(curtime);
            let duration = playback.action.duration();
            let mut local = ((curtime - start) as f32) * playback.speed;
            if duration > 0.0 && local >= duration {
                if playback.looping {
                    local %= duration;
                } else {
                    local = duration;
                    playback.finished = true;
                }
            }
            playback.local_time = local;
            if apply_pose {
                sampled = playback.action.sample(local).or(sampled);
            }
        }
        if apply_pose && !self.playing.is_empty() {
            self.pose_updates += 1;
            self.pending_location = sampled;
        }
    }

    /// Take the location evaluated by the last posed update and retire
    /// finished actions
    pub fn take_ipo_location(&mut self) -> Option<Vec3> {
        self.playing.retain(|p| !p.finished);
        self.pending_location.take()
    }
}

/// Work item of the animation phase for one object
pub(crate) struct AnimationTask {
    pub(crate) object: ObjectId,
    pub(crate) needs_update: bool,
    pub(crate) actions: Option<ActionManager>,
    pub(crate) deformers: Vec<(ObjectId, Box<dyn Deformer>)>,
}

impl AnimationTask {
    /// Advance actions and, when the pose is needed, run the claimed deformers.
    ///
    /// A panicking action update or deformer is contained here so the task
    /// always hands its state back to the store.
    pub(crate) fn run(mut self, curtime: f64) -> Self {
        let object = self.object;
        if let Some(actions) = self.actions.as_mut() {
            let needs_update = self.needs_update;
            if panic::catch_unwind(AssertUnwindSafe(|| actions.update(curtime, needs_update))).is_err() {
                log::error!("Action update of object {} panicked", object);
            }
        }
        if self.needs_update {
            for (owner, deformer) in &mut self.deformers {
                if panic::catch_unwind(AssertUnwindSafe(|| deformer.update())).is_err() {
                    log::error!("Deformer of object {} panicked", owner);
                }
            }
        }
        self
    }
}

/// Whether an armature has to evaluate its pose this frame.
///
/// `children` yields `(culled, mesh_count)` for each child object. The pose
/// is needed when any child is visible, or when the armature drives only
/// non-mesh children.
pub(crate) fn armature_needs_pose(children: impl IntoIterator<Item = (bool, usize)>) -> bool {
    let mut has_mesh = false;
    let mut has_non_mesh = false;
    for (culled, mesh_count) in children {
        if !culled {
            return true;
        }
        if mesh_count == 0 {
            has_non_mesh = true;
        } else {
            has_mesh = true;
        }
    }
    !has_mesh && has_non_mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn slide() -> Arc<Action> {
        Arc::new(Action::new(
            "slide",
            vec![
                LocationKey { time: 1.0, position: Vec3::new(10.0, 0.0, 0.0) },
                LocationKey { time: 0.0, position: Vec3::zeros() },
            ],
        ))
    }

    #[test]
    fn test_sample_interpolates_sorted_keys() {
        let action = slide();
        assert_relative_eq!(action.duration(), 1.0);
        let mid = action.sample(0.25).expect("keyed action");
        assert_relative_eq!(mid.x, 2.5);
    }

    #[test]
    fn test_culled_update_only_advances_time() {
        let mut actions = ActionManager::default();
        actions.play(slide(), 1.0, false);
        actions.update(5.0, false);
        actions.update(5.5, false);
        assert_eq!(actions.pose_updates(), 0);
        assert!(actions.take_ipo_location().is_none());
        assert_relative_eq!(actions.playing()[0].local_time(), 0.5);
    }

    #[test]
    fn test_finished_action_is_retired_after_ipo_pass() {
        let mut actions = ActionManager::default();
        actions.play(slide(), 2.0, false);
        actions.update(0.0, true);
        actions.update(1.0, true);
        let location = actions.take_ipo_location().expect("posed update");
        assert_relative_eq!(location.x, 10.0);
        assert!(!actions.is_playing());
    }

    #[test]
    fn test_armature_pose_rule() {
        assert!(armature_needs_pose([(true, 1), (false, 1)]));
        assert!(!armature_needs_pose([(true, 1), (true, 0)]));
        assert!(armature_needs_pose([(true, 0)]));
        assert!(!armature_needs_pose(std::iter::empty()));
    }
}
