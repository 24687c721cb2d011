//! Object removal
//!
//! Removal has two halves. [`Scene::new_remove_object`] is the logical half:
//! it unregisters an object everywhere and drops every container membership,
//! releasing one reference per membership. [`Scene::remove_object`] is the
//! physical half used at the end of a frame: it detaches the object's node
//! and tears the subtree down children first, running the logical half for
//! each node's client.
//!
//! An object still referenced after the logical half is a zombie. Its node is
//! destroyed anyway; the object itself is reclaimed on its last release.

use super::game_scene::Scene;
use super::store::{ListKind, Release};
use crate::foundation::handles::ObjectId;
use crate::logic::{ActuatorRef, ControllerRef, SensorRef};

impl Scene {
    /// Schedule `object` for removal at the end of the frame.
    ///
    /// Idempotent. Objects instantiated by a dupli group are scheduled before
    /// the group object itself. Zombies are already torn down and are
    /// refused. Returns whether `object` was newly scheduled.
    pub fn delayed_remove_object(&mut self, object: ObjectId) -> bool {
        let instances = match self.objects.get(object) {
            Some(obj) if obj.node().is_some() => obj.instance_objects.clone(),
            _ => return false,
        };
        for instance in instances {
            self.delayed_remove_object(instance);
        }
        let scheduled = self.lists.add(ListKind::Euthanasia, object, &mut self.objects);
        if scheduled {
            log::trace!("Object {} scheduled for removal", object);
        }
        scheduled
    }

    /// Remove `object` from every lookup table, registry and container.
    ///
    /// Returns the references left afterwards: `0` when the object was
    /// reclaimed (or did not exist), anything else means something outside
    /// the containers still holds it.
    pub fn new_remove_object(&mut self, object: ObjectId) -> u32 {
        let Some(obj) = self.objects.get(object) else {
            return 0;
        };
        let asset = obj.asset();
        let name = obj.name().to_string();
        let sensors: Vec<SensorRef> = (0..obj.sensors.len()).map(|i| SensorRef::new(object, i)).collect();
        let controllers: Vec<ControllerRef> = (0..obj.controllers.len())
            .map(|i| ControllerRef::new(object, i))
            .collect();
        let actuators: Vec<ActuatorRef> = (0..obj.actuators.len()).map(|i| ActuatorRef::new(object, i)).collect();
        let group_object = obj.dupli_group_object;
        let instances = obj.instance_objects.clone();
        let obstacle = obj.is_obstacle();

        self.registry.unregister_object(asset, &name, object);

        for sensor in sensors {
            for listener in self.logic.remove_sensor(sensor) {
                if let Some(controller) = self
                    .objects
                    .get_mut(listener.object)
                    .and_then(|o| o.controllers.get_mut(listener.index))
                {
                    controller.sensors.retain(|s| *s != sensor);
                }
            }
        }
        for controller in controllers {
            self.logic.remove_controller(controller);
        }
        for actuator in actuators {
            for driver in self.logic.remove_actuator(actuator) {
                if let Some(controller) = self
                    .objects
                    .get_mut(driver.object)
                    .and_then(|o| o.controllers.get_mut(driver.index))
                {
                    controller.actuators.retain(|a| *a != actuator);
                }
            }
        }
        self.logic.time_manager().remove_object(object);

        for instance in instances {
            if let Some(member) = self.objects.get_mut(instance) {
                member.dupli_group_object = None;
            }
        }
        if let Some(group) = group_object.and_then(|g| self.objects.get_mut(g)) {
            group.instance_objects.retain(|i| *i != object);
        }

        if obstacle {
            if let Some(obstacles) = self.obstacles.as_mut() {
                obstacles.destroy_obstacle(object);
            }
        }
        self.buckets.remove_mesh_user(object);
        for other in self.objects.values_mut() {
            for actuator in &mut other.actuators {
                actuator.unlink_object(object);
            }
        }

        let mut remaining = self.objects.ref_count(object).unwrap_or(0);
        for kind in ListKind::ALL {
            match self.lists.remove(kind, object, &mut self.objects) {
                Some(Release::Remaining(count)) => remaining = count,
                Some(Release::Reclaimed(reclaimed)) => {
                    remaining = 0;
                    self.finalize_reclaimed(object, reclaimed);
                }
                Some(Release::Unknown) | None => {}
            }
        }

        if self.active_camera == Some(object) {
            self.active_camera = None;
        }
        remaining
    }

    /// Detach `object`'s node and destroy its subtree, children first.
    ///
    /// Every client object along the way is removed logically; zombies are
    /// logged and counted and lose their node regardless. Returns `false`
    /// for unknown objects.
    pub fn remove_object(&mut self, object: ObjectId) -> bool {
        if !self.objects.contains(object) {
            return false;
        }
        let Some(node) = self.node_of(object) else {
            self.remove_node_destruct_object(object);
            return true;
        };
        self.graph.disconnect_from_parent(node);
        for current in self.graph.subtree_post_order(node) {
            if let Some(client) = self.graph.client(current) {
                self.remove_node_destruct_object(client);
            }
        }
        true
    }

    /// Per-node teardown: logical removal, then zombie handling
    fn remove_node_destruct_object(&mut self, object: ObjectId) {
        let remaining = self.new_remove_object(object);
        if remaining == 0 {
            return;
        }
        self.zombies += 1;
        let Some(obj) = self.objects.get_mut(object) else {
            return;
        };
        log::warn!(
            "Zombie object! {} '{}' still has {} references after removal",
            object,
            obj.name(),
            remaining
        );
        obj.graphic = None;
        if let Some(owned) = obj.node.take() {
            self.graph.remove_node(owned);
        }
    }
}
