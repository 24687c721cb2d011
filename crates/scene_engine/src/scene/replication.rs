//! Replication of object hierarchies and dupli-group instances
//!
//! A replication pass clones a hierarchy node by node, recording every
//! `original -> replica` pair in a transient map. Logic is only rewired once
//! the whole member set exists, in three sequential passes over it:
//!
//! 1. re-parent the cloned bricks onto their new owners;
//! 2. relink actuator object pointers through the map and assign the layer;
//! 3. rewire controller links to sensors and actuators by brick position.
//!
//! Links into the replicated set follow the map. Links leaving it survive
//! only if their target is still active.

use std::collections::{HashMap, HashSet};

use super::game_scene::Scene;
use super::node::ClientRef;
use super::object::{GameObject, ObjectKind, PropertyValue, TIMEBOMB_PROPERTY};
use super::store::ListKind;
use crate::foundation::handles::{NodeId, ObjectId};
use crate::foundation::math::Vec3;
use crate::logic::{ActuatorRef, ControllerRef, EventManagerKind, SensorRef};
use crate::physics::{ConstraintParticipant, MotionState};

/// State of one replication pass; dropped when the pass ends
#[derive(Default)]
struct ReplicationPass {
    map: HashMap<ObjectId, ObjectId>,
    hierarchy: Vec<ObjectId>,
    /// Originals a dupli-group pass may replicate; `None` admits everything
    group_members: Option<HashSet<ObjectId>>,
}

impl ReplicationPass {
    fn for_group(members: &[ObjectId]) -> Self {
        Self {
            group_members: Some(members.iter().copied().collect()),
            ..Self::default()
        }
    }

    fn admits(&self, original: ObjectId) -> bool {
        self.group_members.as_ref().map_or(true, |m| m.contains(&original))
    }
}

impl Scene {
    /// Replicate `original` and its subtree.
    ///
    /// The replica is placed at `reference`'s world position and orientation
    /// (scaled by the local scale of the reference's root) when given, and
    /// put on the reference's layer, otherwise on the scene's layers. A
    /// positive `lifespan` (in frames) puts the replica in the temp list with
    /// a countdown property. Dupli-group objects found in the new hierarchy
    /// are instantiated afterwards.
    ///
    /// Returns `None` when `original` does not exist or has no node.
    pub fn add_replica_object(&mut self, original: ObjectId, reference: Option<ObjectId>, lifespan: f32) -> Option<ObjectId> {
        let mut pass = ReplicationPass::default();
        self.replication_priority += 1;

        let Some(replica) = self.add_node_replica_object(&mut pass, original, None) else {
            log::debug!("Object {} cannot be replicated", original);
            return None;
        };

        if lifespan > 0.0 {
            self.lists.add(ListKind::Temp, replica, &mut self.objects);
            let seconds = f64::from(lifespan * self.config.timebomb_frame_seconds);
            if let Some(obj) = self.objects.get_mut(replica) {
                obj.set_property(TIMEBOMB_PROPERTY, PropertyValue::Float(seconds));
            }
        }
        self.lists.add(ListKind::RootParents, replica, &mut self.objects);

        self.replicate_children(&mut pass, original, replica);

        let reference = reference.filter(|r| self.objects.contains(*r));
        let root = self.node_of(replica)?;
        if let Some(reference) = reference {
            self.place_at_reference(root, reference);
        }
        self.graph.update_world_data(root, 0.0);
        if let Some(bbox) = self.node_of(original).and_then(|n| self.graph.get(n)).map(|n| *n.bbox()) {
            self.graph.set_bbox(root, bbox);
        }
        self.activate_graphic_controller(replica);

        let layer = reference
            .and_then(|r| self.objects.get(r))
            .map_or(self.layer(), GameObject::layer);
        self.replicate_pass_logic(&pass, layer);

        // Collected first: each recursion runs its own pass
        let duplis: Vec<ObjectId> = pass
            .hierarchy
            .iter()
            .copied()
            .filter(|id| self.objects.get(*id).is_some_and(|o| o.dupli_group.is_some()))
            .collect();
        for dupli in duplis {
            self.dupli_group_recurse(dupli, 0);
        }

        log::debug!(
            "Replicated {} as {} ({} objects)",
            original,
            replica,
            pass.hierarchy.len()
        );
        Some(replica)
    }

    /// Instantiate the dupli group of `group_object` at nesting `level`.
    ///
    /// Members are looked up among converted objects by asset; members
    /// outside the group's layers are skipped. Only members without a parent
    /// are replicated, their children come along through the node hierarchy.
    /// Each root replica is placed by composing the group object's world
    /// transform with the member's position relative to the group origin.
    /// Nested dupli groups recurse at `level + 1` and stop past the
    /// configured maximum depth.
    pub fn dupli_group_recurse(&mut self, group_object: ObjectId, level: u32) {
        let Some(obj) = self.objects.get(group_object) else {
            return;
        };
        let (Some(group), Some(group_node)) = (obj.dupli_group.clone(), obj.node()) else {
            return;
        };
        if level > self.config.max_dupli_recursion {
            log::warn!(
                "Dupli group '{}' nested deeper than {} levels, not instantiated",
                group.name,
                self.config.max_dupli_recursion
            );
            return;
        }
        let group_asset = obj.asset();
        let group_layer = obj.layer();
        let group_world = self.graph.world(group_node).cloned().unwrap_or_default();

        self.replication_priority += 1;

        let mut members: Vec<ObjectId> = Vec::new();
        for member in &group.members {
            if Some(member.asset) == group_asset {
                continue;
            }
            let Some(live) = self.registry.find_object(member.asset) else {
                log::debug!("Group '{}' member {} is not converted", group.name, member.asset);
                continue;
            };
            if let Some(template) = self.objects.get_mut(live) {
                template.group_template = group_asset;
            }
            if member.layer & group.layer_mask == 0 {
                continue;
            }
            if !members.contains(&live) {
                members.push(live);
            }
        }

        let mut pass = ReplicationPass::for_group(&members);
        for member in members {
            // Children of group members are carried by their parent
            if self.parent_of(member).is_some() {
                continue;
            }
            let Some(replica) = self.add_node_replica_object(&mut pass, member, None) else {
                continue;
            };
            self.lists.add(ListKind::RootParents, replica, &mut self.objects);
            self.replicate_children(&mut pass, member, replica);

            let Some(node) = self.node_of(replica) else {
                continue;
            };
            let member_node = self.node_of(member);
            let member_world = member_node
                .and_then(|n| self.graph.world(n))
                .cloned()
                .unwrap_or_default();

            let scale = group_world.scale;
            let relative = group_world.rotation * (member_world.position - group.offset);
            self.graph.set_relative_scale(node, &scale);
            self.graph
                .set_local_position(node, group_world.position + scale.component_mul(&relative));
            self.graph
                .set_local_orientation(node, group_world.rotation * member_world.rotation);
            self.graph.update_world_data(node, 0.0);
            if let Some(bbox) = member_node.and_then(|n| self.graph.get(n)).map(|n| *n.bbox()) {
                self.graph.set_bbox(node, bbox);
            }
            self.activate_graphic_controller(replica);
        }

        self.replicate_pass_logic(&pass, group_layer);

        let participants: Vec<ConstraintParticipant> = pass
            .hierarchy
            .iter()
            .filter_map(|id| {
                self.objects.get(*id).map(|o| ConstraintParticipant {
                    object: *id,
                    asset: o.asset(),
                    name: o.name().to_string(),
                })
            })
            .collect();

        let mut nested = Vec::new();
        let mut instances = Vec::new();
        for id in &pass.hierarchy {
            let Some(obj) = self.objects.get_mut(*id) else {
                continue;
            };
            if let Some(physics) = obj.physics.as_mut() {
                physics.replicate_constraints(*id, &participants);
                physics.clear_constraints();
            }
            if *id != group_object && obj.dupli_group.is_some() {
                nested.push(*id);
            }
            if group_asset.is_some() && obj.group_template == group_asset {
                obj.dupli_group_object = Some(group_object);
                instances.push(*id);
            }
        }
        if let Some(obj) = self.objects.get_mut(group_object) {
            obj.instance_objects.extend(instances);
        }

        log::debug!(
            "Instantiated group '{}' at level {} ({} objects)",
            group.name,
            level,
            pass.hierarchy.len()
        );

        for dupli in nested {
            self.dupli_group_recurse(dupli, level + 1);
        }
    }

    /// Clone one object and its node under `parent_node`.
    ///
    /// The replica is active, joins the per-kind lists, gets mesh users,
    /// timers, node controllers and replicated physics/graphic controllers.
    /// Its logic is left pointing at the originals until the logic passes.
    fn add_node_replica_object(
        &mut self,
        pass: &mut ReplicationPass,
        original: ObjectId,
        parent_node: Option<NodeId>,
    ) -> Option<ObjectId> {
        if !pass.admits(original) {
            return None;
        }
        let source = self.objects.get(original)?;
        let source_node = source.node()?;
        let owned = self.graph.replicate_node(source_node, parent_node)?;
        let node = owned.id();
        let world = self.graph.world(node).cloned().unwrap_or_default();

        let mut replica = source.replica();
        replica.scene = Some(self.id());
        replica.node = Some(owned);

        replica.graphic = source
            .graphic
            .as_ref()
            .and_then(|g| g.replica(MotionState::new(node, world.clone())));
        let parent_physics = parent_node
            .and_then(|p| self.graph.client(p))
            .and_then(|p| self.objects.get(p))
            .and_then(|p| p.physics.as_deref());
        replica.physics = source
            .physics
            .as_ref()
            .and_then(|p| p.replica(MotionState::new(node, world), parent_physics));
        if source.physics.is_some() && replica.physics.is_none() {
            log::error!("Physics controller of '{}' could not be replicated", source.name());
        }

        let kind = replica.kind().clone();
        let obstacle = replica.is_obstacle();
        let meshes = replica.meshes.clone();
        let timers = replica.timer_properties();

        let id = self.objects.insert(replica);
        self.graph.set_client(node, Some(ClientRef::new(id)));

        let environment = self.physics.as_ref().map(|env| env.id());
        if let Some(obj) = self.objects.get_mut(id) {
            if let Some(graphic) = obj.graphic.as_mut() {
                graphic.set_client_object(id);
                if let Some(environment) = environment {
                    graphic.set_environment(environment);
                }
            }
            if let Some(physics) = obj.physics.as_mut() {
                physics.set_client_object(id);
                if let Some(environment) = environment {
                    physics.set_environment(environment);
                }
                // Children follow their parent kinematically
                if parent_node.is_some() {
                    physics.suspend_dynamics(false);
                }
            }
        }

        for timer in timers {
            self.logic.time_manager().add_time_property(id, timer);
        }
        if obstacle {
            if let Some(obstacles) = self.obstacles.as_mut() {
                obstacles.add_obstacle(id);
            }
        }

        self.lists.add(ListKind::Active, id, &mut self.objects);
        match kind {
            ObjectKind::Light => {
                self.lists.add(ListKind::Lights, id, &mut self.objects);
            }
            ObjectKind::Text => {
                self.lists.add(ListKind::Fonts, id, &mut self.objects);
            }
            ObjectKind::Armature => {
                self.lists.add(ListKind::Animated, id, &mut self.objects);
            }
            ObjectKind::Empty | ObjectKind::Mesh | ObjectKind::Camera(_) => {}
        }
        for mesh in &meshes {
            self.buckets.add_mesh_user(id, mesh);
        }

        pass.map.insert(original, id);
        pass.hierarchy.push(id);
        self.graph.replicate_controllers(source_node, node);
        Some(id)
    }

    /// Replicate the node hierarchy below `original` under `replica`
    fn replicate_children(&mut self, pass: &mut ReplicationPass, original: ObjectId, replica: ObjectId) {
        let mut stack = vec![(original, replica)];
        while let Some((original, replica)) = stack.pop() {
            let (Some(original_node), Some(replica_node)) = (self.node_of(original), self.node_of(replica)) else {
                continue;
            };
            let children: Vec<ObjectId> = self
                .graph
                .children(original_node)
                .iter()
                .filter_map(|child| self.graph.client(*child))
                .collect();
            for child in children {
                if let Some(child_replica) = self.add_node_replica_object(pass, child, Some(replica_node)) {
                    stack.push((child, child_replica));
                }
            }
        }
    }

    fn place_at_reference(&mut self, node: NodeId, reference: ObjectId) {
        let Some(reference_node) = self.node_of(reference) else {
            return;
        };
        let Some(world) = self.graph.world(reference_node).cloned() else {
            return;
        };
        let mut root = reference_node;
        while let Some(parent) = self.graph.parent(root) {
            root = parent;
        }
        let root_scale = self
            .graph
            .get(root)
            .map_or_else(|| Vec3::new(1.0, 1.0, 1.0), |n| n.local().scale);

        self.graph.set_local_position(node, world.position);
        self.graph.set_local_orientation(node, world.rotation);
        self.graph.set_relative_scale(node, &root_scale);
    }

    fn activate_graphic_controller(&mut self, object: ObjectId) {
        if let Some(graphic) = self.objects.get_mut(object).and_then(|o| o.graphic.as_mut()) {
            graphic.activate(true);
        }
    }

    /// Run the three logic passes over the completed member set
    fn replicate_pass_logic(&mut self, pass: &ReplicationPass, layer: u32) {
        for id in &pass.hierarchy {
            self.reparent_logic(*id);
        }
        for id in &pass.hierarchy {
            if let Some(obj) = self.objects.get_mut(*id) {
                for actuator in &mut obj.actuators {
                    actuator.relink(&pass.map);
                }
                obj.set_layer(layer);
            }
        }
        for id in &pass.hierarchy {
            self.replicate_logic(*id, &pass.map);
        }
    }

    /// Point the cloned bricks of `object` at their new owner
    fn reparent_logic(&mut self, object: ObjectId) {
        let scene = self.id();
        let Some(obj) = self.objects.get_mut(object) else {
            return;
        };
        for sensor in &mut obj.sensors {
            sensor.owner = Some(object);
            sensor.scene = Some(scene);
        }
        for controller in &mut obj.controllers {
            controller.owner = Some(object);
            controller.scene = Some(scene);
        }
        for actuator in &mut obj.actuators {
            actuator.owner = Some(object);
            actuator.scene = Some(scene);
        }
    }

    /// Rewire the controller links of a replica and register its sensors
    fn replicate_logic(&mut self, object: ObjectId, map: &HashMap<ObjectId, ObjectId>) {
        let priority = self.replication_priority;
        let Some(obj) = self.objects.get_mut(object) else {
            return;
        };

        let mut links: Vec<(ControllerRef, Vec<SensorRef>, Vec<ActuatorRef>)> = Vec::new();
        for (index, controller) in obj.controllers.iter_mut().enumerate() {
            controller.replication_priority = priority;
            links.push((
                ControllerRef::new(object, index),
                std::mem::take(&mut controller.sensors),
                std::mem::take(&mut controller.actuators),
            ));
        }
        let sensors: Vec<(SensorRef, EventManagerKind)> = obj
            .sensors
            .iter()
            .enumerate()
            .map(|(index, s)| (SensorRef::new(object, index), s.kind().event_manager()))
            .collect();

        for (controller, linked_sensors, linked_actuators) in links {
            let sensors: Vec<SensorRef> = linked_sensors
                .into_iter()
                .filter_map(|s| {
                    self.resolve_link(s.object, s.index, map, |o| o.sensors.len())
                        .map(|owner| s.with_object(owner))
                })
                .collect();
            let actuators: Vec<ActuatorRef> = linked_actuators
                .into_iter()
                .filter_map(|a| {
                    self.resolve_link(a.object, a.index, map, |o| o.actuators.len())
                        .map(|owner| a.with_object(owner))
                })
                .collect();

            for sensor in &sensors {
                self.logic.register_to_sensor(controller, *sensor);
            }
            for actuator in &actuators {
                self.logic.register_to_actuator(controller, *actuator);
            }
            if let Some(brick) = self
                .objects
                .get_mut(object)
                .and_then(|o| o.controllers.get_mut(controller.index))
            {
                brick.sensors = sensors;
                brick.actuators = actuators;
            }
        }

        for (sensor, manager) in sensors {
            self.logic.register_sensor(sensor, manager);
        }
    }

    /// Owner a replicated link should point at, or `None` to drop it
    fn resolve_link(
        &self,
        owner: ObjectId,
        index: usize,
        map: &HashMap<ObjectId, ObjectId>,
        brick_count: impl Fn(&GameObject) -> usize,
    ) -> Option<ObjectId> {
        match map.get(&owner) {
            Some(replica) => {
                if self.objects.get(*replica).is_some_and(|o| index < brick_count(o)) {
                    Some(*replica)
                } else {
                    log::error!(
                        "Brick {} of {} has no counterpart on replica {}, link skipped",
                        index,
                        owner,
                        replica
                    );
                    None
                }
            }
            None if self.lists.contains(ListKind::Active, owner) => Some(owner),
            None => None,
        }
    }
}
