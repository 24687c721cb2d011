//! Per-frame phases of a scene
//!
//! The frame orchestrator calls these in a fixed order: logic begin, logic
//! update, animation, scenegraph, logic end, then culling and rendering
//! (see [`culling`](super::culling)). Removal only ever happens in
//! [`Scene::logic_end_frame`]; everything before it just schedules.

use std::collections::HashSet;

use super::animation::{armature_needs_pose, AnimationTask, Deformer};
use super::game_scene::Scene;
use super::object::{GameObject, PropertyValue, TIMEBOMB_PROPERTY};
use super::store::{ListKind, Release};
use crate::foundation::handles::ObjectId;
use crate::foundation::math::{Quat, Vec3};
use crate::foundation::task_pool::TaskPool;
use crate::logic::ActuatorCommand;

impl Scene {
    /// Count down timed objects and start the logic frame.
    ///
    /// Objects whose countdown runs out are scheduled for removal, not
    /// removed.
    pub fn logic_begin_frame(&mut self, current_time: f64, frame_step: f64) {
        let timed: Vec<ObjectId> = self.lists.list(ListKind::Temp).iter().rev().collect();
        for object in timed {
            let expired = match self
                .objects
                .get_mut(object)
                .and_then(|o| o.property_mut(TIMEBOMB_PROPERTY))
            {
                Some(PropertyValue::Float(left)) => {
                    *left -= frame_step;
                    *left <= 0.0
                }
                _ => false,
            };
            if expired {
                self.delayed_remove_object(object);
            }
        }
        self.logic.begin_frame(current_time, frame_step);
    }

    /// Dispatch the event managers and apply the commands of every fired
    /// actuator; returns the number of commands applied
    pub fn logic_update_frame(&mut self) -> usize {
        let commands = self.logic.update_frame(&mut self.objects);
        let count = commands.len();
        for command in commands {
            self.apply_actuator_command(command);
        }
        count
    }

    /// Apply the effect of one fired actuator
    pub fn apply_actuator_command(&mut self, command: ActuatorCommand) {
        match command {
            ActuatorCommand::AddObject {
                template,
                reference,
                lifespan,
            } => {
                if self.add_replica_object(template, Some(reference), lifespan).is_none() {
                    log::warn!("Add-object actuator of {} has no valid template {}", reference, template);
                }
            }
            ActuatorCommand::EndObject { object } => {
                self.delayed_remove_object(object);
            }
            ActuatorCommand::SetVisible {
                object,
                visible,
                recursive,
            } => {
                let mut targets = vec![object];
                if recursive {
                    targets.extend(self.descendants_of(object));
                }
                for target in targets {
                    if let Some(obj) = self.objects.get_mut(target) {
                        obj.set_visible(visible);
                    }
                }
            }
            ActuatorCommand::SetProperty { object, name, value } => {
                let is_timer = matches!(value, PropertyValue::Timer(_));
                if let Some(obj) = self.objects.get_mut(object) {
                    obj.set_property(name.clone(), value);
                }
                if is_timer {
                    self.logic.time_manager().add_time_property(object, name);
                }
            }
            ActuatorCommand::TrackTo { object, target } => self.track_to(object, target),
        }
    }

    /// Turn `object` so its Y axis points at `target`
    fn track_to(&mut self, object: ObjectId, target: ObjectId) {
        let (Some(from), Some(to)) = (self.world_transform(object), self.world_transform(target)) else {
            return;
        };
        let direction = to.position - from.position;
        if direction.norm() <= f32::EPSILON {
            return;
        }
        let Some(world_rotation) = Quat::rotation_between(&Vec3::y(), &direction) else {
            return;
        };
        let local = match self.parent_of(object).and_then(|p| self.world_transform(p)) {
            Some(parent) => parent.rotation.inverse() * world_rotation,
            None => world_rotation,
        };
        self.set_local_orientation(object, local);
    }

    /// Advance actions and deformers of every animated object.
    ///
    /// Each object becomes one task on `pool`. A task owns the object's
    /// action manager and the deformers it updates (its own unless parented
    /// to an armature, plus those of its children); they are moved out of
    /// the store before dispatch and back after the join. Culled armatures
    /// only advance action time. The IPO pass that writes node transforms
    /// runs serially after the join.
    pub fn update_animations(&mut self, current_time: f64, pool: &TaskPool) {
        let animated: Vec<ObjectId> = self.lists.list(ListKind::Animated).iter().collect();
        if animated.is_empty() {
            return;
        }

        let mut claimed: HashSet<ObjectId> = HashSet::new();
        let mut tasks = Vec::with_capacity(animated.len());
        for object in &animated {
            let Some(obj) = self.objects.get(*object) else {
                continue;
            };
            let children = self.children_of(*object);
            let needs_update = !obj.is_armature()
                || armature_needs_pose(
                    children
                        .iter()
                        .filter_map(|c| self.objects.get(*c))
                        .map(|c| (c.is_culled(), c.mesh_count())),
                );

            let mut owners = Vec::new();
            if needs_update {
                let parent_is_armature = self
                    .parent_of(*object)
                    .and_then(|p| self.objects.get(p))
                    .is_some_and(GameObject::is_armature);
                if !parent_is_armature {
                    owners.push(*object);
                }
                owners.extend(children);
            }

            let mut deformers: Vec<(ObjectId, Box<dyn Deformer>)> = Vec::new();
            for owner in owners {
                if !claimed.insert(owner) {
                    continue;
                }
                if let Some(deformer) = self.objects.get_mut(owner).and_then(|o| o.deformer.take()) {
                    deformers.push((owner, deformer));
                }
            }

            tasks.push(AnimationTask {
                object: *object,
                needs_update,
                actions: self.objects.get_mut(*object).and_then(|o| o.actions.take()),
                deformers,
            });
        }

        let finished = pool.scatter(tasks, move |task: AnimationTask| task.run(current_time));

        for task in finished {
            if let Some(obj) = self.objects.get_mut(task.object) {
                obj.actions = task.actions;
            }
            for (owner, deformer) in task.deformers {
                if let Some(obj) = self.objects.get_mut(owner) {
                    obj.deformer = Some(deformer);
                }
            }
        }

        // Reads what the tasks wrote, so strictly after the join
        for object in animated {
            let location = self
                .objects
                .get_mut(object)
                .and_then(|o| o.actions.as_mut())
                .and_then(|a| a.take_ipo_location());
            if let Some(location) = location {
                self.set_local_position(object, location);
            }
        }
    }

    /// Recompute world transforms of every scheduled node; returns the
    /// number of nodes updated
    pub fn update_parents(&mut self, current_time: f64) -> usize {
        self.graph.update_parents(current_time)
    }

    /// Finish the logic frame: tear down every object scheduled for
    /// removal, then advance the obstacle simulation
    pub fn logic_end_frame(&mut self) {
        self.logic.end_frame();

        let mut removed = 0usize;
        while let Some(object) = self.lists.pop_unreleased(ListKind::Euthanasia) {
            if let Release::Reclaimed(reclaimed) = self.objects.release(object) {
                self.finalize_reclaimed(object, reclaimed);
            }
            self.remove_object(object);
            removed += 1;
        }
        if removed > 0 {
            log::debug!("Removed {} objects at end of frame in scene '{}'", removed, self.name());
        }

        if self.config.obstacle_simulation {
            if let Some(obstacles) = self.obstacles.as_mut() {
                obstacles.update_obstacles();
            }
        }
    }

    /// Suspend active objects outside the activity box around the active
    /// camera and resume the ones inside it
    pub fn update_object_activity(&mut self) {
        if !self.config.activity_culling {
            return;
        }
        let Some(camera) = self
            .active_camera
            .and_then(|c| self.world_transform(c))
            .map(|w| w.position)
        else {
            return;
        };
        let radius = self.config.clamped_activity_radius();

        let active: Vec<ObjectId> = self.lists.list(ListKind::Active).iter().collect();
        for object in active {
            let Some(position) = self.world_transform(object).map(|w| w.position) else {
                continue;
            };
            let Some(obj) = self.objects.get_mut(object) else {
                continue;
            };
            if obj.ignores_activity_culling() {
                continue;
            }
            let outside = (camera - position).iter().any(|d| d.abs() > radius);
            if outside {
                obj.suspend();
            } else {
                obj.resume();
            }
        }
    }
}
