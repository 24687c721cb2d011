//! Scene state and construction API
//!
//! A [`Scene`] owns its objects (through the [`ObjectStore`]), its scene
//! graph, logic manager, lookup tables, render buckets and optional physics
//! environment. Replication, removal, per-frame phases and merging are
//! implemented in sibling modules as further `impl Scene` blocks.

use std::sync::Arc;

use super::animation::Action;
use super::node::{ClientRef, SceneGraph};
use super::object::{GameObject, ObjectKind};
use super::registry::{AssetRegistry, ObjectRegistry};
use super::store::{ListKind, ObjectList, ObjectLists, ObjectStore, Release};
use crate::config::SceneConfig;
use crate::foundation::handles::{AssetId, ConverterId, MaterialId, NodeId, ObjectId, SceneId};
use crate::foundation::math::{Quat, Transform, Vec3};
use crate::logic::{
    Actuator, ActuatorRef, Controller, ControllerRef, LogicManager, Sensor, SensorRef,
};
use crate::physics::{ObstacleSimulation, PhysicsEnvironment};
use crate::render::{BucketManager, CameraView, Material, Mesh};

/// Callback run around render submission
pub type DrawCallback = Box<dyn FnMut(&CameraView) + Send>;

/// Live scene
pub struct Scene {
    id: SceneId,
    name: String,
    pub(crate) config: SceneConfig,
    converter: Option<ConverterId>,
    layer: u32,
    pub(crate) objects: ObjectStore,
    pub(crate) lists: ObjectLists,
    pub(crate) graph: SceneGraph,
    pub(crate) logic: LogicManager,
    pub(crate) registry: ObjectRegistry,
    pub(crate) assets: AssetRegistry,
    pub(crate) buckets: BucketManager,
    pub(crate) physics: Option<Box<dyn PhysicsEnvironment>>,
    pub(crate) obstacles: Option<Box<dyn ObstacleSimulation>>,
    pub(crate) active_camera: Option<ObjectId>,
    pub(crate) replication_priority: u32,
    pub(crate) zombies: usize,
    suspended: bool,
    pub(crate) pre_draw: Vec<DrawCallback>,
    pub(crate) post_draw: Vec<DrawCallback>,
}

impl Scene {
    /// Create an empty scene without physics
    pub fn new(name: impl Into<String>, config: SceneConfig) -> Self {
        let name = name.into();
        log::debug!("Creating scene '{}'", name);
        Self {
            id: SceneId::next(),
            name,
            config,
            converter: None,
            layer: u32::MAX,
            objects: ObjectStore::new(),
            lists: ObjectLists::new(),
            graph: SceneGraph::new(),
            logic: LogicManager::new(),
            registry: ObjectRegistry::new(),
            assets: AssetRegistry::new(),
            buckets: BucketManager::new(),
            physics: None,
            obstacles: None,
            active_camera: None,
            replication_priority: 0,
            zombies: 0,
            suspended: false,
            pre_draw: Vec::new(),
            post_draw: Vec::new(),
        }
    }

    /// Attach a physics environment and register the collision callbacks
    pub fn with_physics(mut self, environment: Box<dyn PhysicsEnvironment>) -> Self {
        self.set_physics_environment(environment);
        self
    }

    /// Replace the physics environment
    pub fn set_physics_environment(&mut self, mut environment: Box<dyn PhysicsEnvironment>) {
        self.logic.collision_manager().register_with(environment.as_mut());
        let env_id = environment.id();
        for object in self.objects.values_mut() {
            if let Some(physics) = object.physics.as_mut() {
                physics.set_environment(env_id);
            }
            if let Some(graphic) = object.graphic.as_mut() {
                graphic.set_environment(env_id);
            }
        }
        self.physics = Some(environment);
    }

    /// Attach an obstacle simulation
    pub fn set_obstacle_simulation(&mut self, simulation: Box<dyn ObstacleSimulation>) {
        self.obstacles = Some(simulation);
    }

    /// Record the conversion context this scene was built with
    pub fn set_converter(&mut self, converter: Option<ConverterId>) {
        self.converter = converter;
    }

    /// Conversion context
    pub fn converter(&self) -> Option<ConverterId> {
        self.converter
    }

    /// Scene identity
    pub fn id(&self) -> SceneId {
        self.id
    }

    /// Scene name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the scene
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Scene settings
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Visible layers; replicas without a placement reference use them
    pub fn layer(&self) -> u32 {
        self.layer
    }

    /// Set the visible layers
    pub fn set_layer(&mut self, layer: u32) {
        self.layer = layer;
    }

    /// Suspended scenes skip every frame phase
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Stop running frames
    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    /// Resume running frames
    pub fn resume(&mut self) {
        self.suspended = false;
    }

    /// Turn activity culling on or off
    pub fn set_activity_culling(&mut self, enabled: bool) {
        self.config.activity_culling = enabled;
    }

    /// Set the activity radius; values below the minimum are clamped
    pub fn set_activity_culling_radius(&mut self, radius: f32) {
        self.config.activity_radius = radius;
        self.config.activity_radius = self.config.clamped_activity_radius();
    }

    /// Object arena
    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    /// Look up an object
    pub fn object(&self, id: ObjectId) -> Option<&GameObject> {
        self.objects.get(id)
    }

    /// Look up an object for modification
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        self.objects.get_mut(id)
    }

    /// Container of `kind`
    pub fn list(&self, kind: ListKind) -> &ObjectList {
        self.lists.list(kind)
    }

    /// Containers currently holding `object`
    pub fn list_memberships(&self, object: ObjectId) -> Vec<ListKind> {
        self.lists.memberships(object)
    }

    /// Active objects
    pub fn object_list(&self) -> &ObjectList {
        self.lists.list(ListKind::Active)
    }

    /// Inactive templates
    pub fn inactive_list(&self) -> &ObjectList {
        self.lists.list(ListKind::Inactive)
    }

    /// Objects with a lifespan
    pub fn temp_list(&self) -> &ObjectList {
        self.lists.list(ListKind::Temp)
    }

    /// Hierarchy roots
    pub fn root_parent_list(&self) -> &ObjectList {
        self.lists.list(ListKind::RootParents)
    }

    /// Lamps
    pub fn light_list(&self) -> &ObjectList {
        self.lists.list(ListKind::Lights)
    }

    /// Cameras
    pub fn camera_list(&self) -> &ObjectList {
        self.lists.list(ListKind::Cameras)
    }

    /// Text objects
    pub fn font_list(&self) -> &ObjectList {
        self.lists.list(ListKind::Fonts)
    }

    /// Objects pending end-of-frame removal
    pub fn euthanasia_list(&self) -> &ObjectList {
        self.lists.list(ListKind::Euthanasia)
    }

    /// Scene graph
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Logic manager
    pub fn logic(&self) -> &LogicManager {
        &self.logic
    }

    /// Mutable logic manager (input injection, timers)
    pub fn logic_mut(&mut self) -> &mut LogicManager {
        &mut self.logic
    }

    /// Name and asset tables
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Materials and meshes owned by the scene
    pub fn assets(&self) -> &AssetRegistry {
        &self.assets
    }

    /// Render buckets
    pub fn buckets(&self) -> &BucketManager {
        &self.buckets
    }

    /// Physics environment
    pub fn physics_environment(&self) -> Option<&dyn PhysicsEnvironment> {
        self.physics.as_deref()
    }

    /// Mutable physics environment
    pub fn physics_environment_mut(&mut self) -> Option<&mut (dyn PhysicsEnvironment + 'static)> {
        self.physics.as_deref_mut()
    }

    /// Zombies detected so far
    pub fn zombie_count(&self) -> usize {
        self.zombies
    }

    /// Gravity of the physics environment
    pub fn gravity(&self) -> Option<Vec3> {
        self.physics.as_ref().map(|env| env.gravity())
    }

    /// Set gravity; ignored without physics
    pub fn set_gravity(&mut self, gravity: Vec3) {
        match self.physics.as_mut() {
            Some(env) => env.set_gravity(gravity),
            None => log::debug!("Scene '{}' has no physics, gravity ignored", self.name),
        }
    }

    /// Register a callback run before render submission
    pub fn add_pre_draw_callback(&mut self, callback: DrawCallback) {
        self.pre_draw.push(callback);
    }

    /// Register a callback run after render submission
    pub fn add_post_draw_callback(&mut self, callback: DrawCallback) {
        self.post_draw.push(callback);
    }

    /// Drop every draw callback
    pub fn clear_draw_callbacks(&mut self) {
        self.pre_draw.clear();
        self.post_draw.clear();
    }

    /// Object converted from `asset`
    pub fn find_object(&self, asset: AssetId) -> Option<ObjectId> {
        self.registry.find_object(asset)
    }

    /// Object registered under `name`
    pub fn find_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.registry.find_object_by_name(name)
    }

    /// Node of an object
    pub fn node_of(&self, object: ObjectId) -> Option<NodeId> {
        self.objects.get(object).and_then(GameObject::node)
    }

    /// Parent object in the scene graph
    pub fn parent_of(&self, object: ObjectId) -> Option<ObjectId> {
        let node = self.node_of(object)?;
        self.graph.parent(node).and_then(|p| self.graph.client(p))
    }

    /// Direct children objects in the scene graph
    pub fn children_of(&self, object: ObjectId) -> Vec<ObjectId> {
        self.node_of(object)
            .map(|node| self.graph.children(node).iter().filter_map(|c| self.graph.client(*c)).collect())
            .unwrap_or_default()
    }

    /// Every descendant object, depth first
    pub fn descendants_of(&self, object: ObjectId) -> Vec<ObjectId> {
        let Some(node) = self.node_of(object) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.graph.children(node).to_vec();
        while let Some(current) = stack.pop() {
            if let Some(client) = self.graph.client(current) {
                found.push(client);
            }
            stack.extend(self.graph.children(current).iter().copied());
        }
        found
    }

    /// World transform computed by the last scene-graph update
    pub fn world_transform(&self, object: ObjectId) -> Option<&Transform> {
        self.node_of(object).and_then(|n| self.graph.world(n))
    }

    /// Local transform
    pub fn local_transform(&self, object: ObjectId) -> Option<&Transform> {
        self.node_of(object).and_then(|n| self.graph.get(n)).map(|n| n.local())
    }

    /// Move an object; the node is scheduled for the next update
    pub fn set_local_position(&mut self, object: ObjectId, position: Vec3) -> bool {
        let Some(node) = self.node_of(object) else {
            return false;
        };
        self.graph.set_local_position(node, position);
        true
    }

    /// Rotate an object; the node is scheduled for the next update
    pub fn set_local_orientation(&mut self, object: ObjectId, rotation: Quat) -> bool {
        let Some(node) = self.node_of(object) else {
            return false;
        };
        self.graph.set_local_orientation(node, rotation);
        true
    }

    /// Parent `child` under `parent`.
    ///
    /// Fails for unknown objects and when `parent` is `child` or one of its
    /// descendants.
    pub fn set_parent(&mut self, child: ObjectId, parent: ObjectId) -> bool {
        let (Some(child_node), Some(parent_node)) = (self.node_of(child), self.node_of(parent)) else {
            return false;
        };
        if !self.graph.add_child(parent_node, child_node) {
            return false;
        }
        if let Some(Release::Reclaimed(object)) = self.lists.remove(ListKind::RootParents, child, &mut self.objects) {
            self.finalize_reclaimed(child, object);
        }
        true
    }

    /// Add an external reference (scripting proxy) to an object
    pub fn retain_object(&mut self, object: ObjectId) -> Option<u32> {
        self.objects.retain(object)
    }

    /// Drop an external reference; the object is reclaimed on the last one.
    ///
    /// Returns the remaining count, or `None` for unknown objects.
    pub fn release_object(&mut self, object: ObjectId) -> Option<u32> {
        match self.objects.release(object) {
            Release::Remaining(count) => Some(count),
            Release::Reclaimed(reclaimed) => {
                self.finalize_reclaimed(object, reclaimed);
                Some(0)
            }
            Release::Unknown => None,
        }
    }

    /// Tear down what a reclaimed object still owns
    pub(crate) fn finalize_reclaimed(&mut self, id: ObjectId, object: Box<GameObject>) {
        let mut object = *object;
        if let Some(owned) = object.node.take() {
            self.graph.remove_node(owned);
        }
        self.buckets.remove_mesh_user(id);
        if self.active_camera == Some(id) {
            self.active_camera = None;
        }
        log::debug!("Object {} '{}' destroyed", id, object.name());
    }

    /// Register a material and create its render bucket
    pub fn add_material(&mut self, mut material: Material) -> MaterialId {
        material.scene = Some(self.id);
        self.buckets.register_material(&material);
        self.assets.add_material(material)
    }

    /// Register a mesh by id and name
    pub fn add_mesh(&mut self, mesh: Mesh) -> Arc<Mesh> {
        let mesh = Arc::new(mesh);
        self.assets.add_mesh(Arc::clone(&mesh));
        self.registry.register_mesh(Arc::clone(&mesh), None);
        mesh
    }

    /// Register an action by name
    pub fn add_action(&mut self, action: Action) -> Arc<Action> {
        let action = Arc::new(action);
        self.registry.register_action(Arc::clone(&action));
        action
    }

    /// Place a converted object in the scene.
    ///
    /// The object gets its own scene-graph node, parented under `parent`'s
    /// node if given. Active objects go to the active list (and the root
    /// list when parentless) and to the per-kind lists; inactive ones are
    /// templates for replication. Name, asset, meshes and timer properties
    /// are registered.
    pub fn add_object(&mut self, mut object: GameObject, parent: Option<ObjectId>, active: bool) -> ObjectId {
        object.scene = Some(self.id);
        let owned = self.graph.create_node(object.initial.clone(), self.id);
        let node = owned.id();
        object.node = Some(owned);

        let bbox = object.bbox;
        let kind = object.kind().clone();
        let name = object.name().to_string();
        let asset = object.asset();
        let meshes = object.meshes.clone();
        let timers = object.timer_properties();
        let obstacle = object.is_obstacle();

        let id = self.objects.insert(object);
        self.graph.set_client(node, Some(ClientRef::new(id)));
        self.graph.set_bbox(node, bbox);

        let env_id = self.physics.as_ref().map(|env| env.id());
        if let Some(obj) = self.objects.get_mut(id) {
            if let Some(physics) = obj.physics.as_mut() {
                physics.set_client_object(id);
                if let Some(env_id) = env_id {
                    physics.set_environment(env_id);
                }
            }
            if let Some(graphic) = obj.graphic.as_mut() {
                graphic.set_client_object(id);
                if let Some(env_id) = env_id {
                    graphic.set_environment(env_id);
                }
                graphic.activate(active);
            }
        }

        let parent_node = parent.and_then(|p| self.node_of(p));
        if let Some(parent_node) = parent_node {
            self.graph.add_child(parent_node, node);
        }

        if active {
            self.lists.add(ListKind::Active, id, &mut self.objects);
            if parent_node.is_none() {
                self.lists.add(ListKind::RootParents, id, &mut self.objects);
            }
            match kind {
                ObjectKind::Light => {
                    self.lists.add(ListKind::Lights, id, &mut self.objects);
                }
                ObjectKind::Camera(_) => {
                    self.lists.add(ListKind::Cameras, id, &mut self.objects);
                    if self.active_camera.is_none() {
                        self.active_camera = Some(id);
                    }
                }
                ObjectKind::Text => {
                    self.lists.add(ListKind::Fonts, id, &mut self.objects);
                }
                ObjectKind::Armature => {
                    self.lists.add(ListKind::Animated, id, &mut self.objects);
                }
                ObjectKind::Empty | ObjectKind::Mesh => {}
            }
            if obstacle {
                if let Some(obstacles) = self.obstacles.as_mut() {
                    obstacles.add_obstacle(id);
                }
            }
        } else {
            self.lists.add(ListKind::Inactive, id, &mut self.objects);
        }

        for mesh in &meshes {
            self.buckets.add_mesh_user(id, mesh);
            self.registry.register_mesh(Arc::clone(mesh), asset);
        }
        self.registry.register_object_name(&name, id);
        if let Some(asset) = asset {
            self.registry.register_object(asset, id);
        }
        for timer in timers {
            self.logic.time_manager().add_time_property(id, timer);
        }

        log::debug!(
            "Added {} object {} '{}' to scene '{}'",
            if active { "active" } else { "inactive" },
            id,
            name,
            self.name
        );
        id
    }

    /// Attach a sensor to `object`.
    ///
    /// Sensors of active objects are registered with their event manager;
    /// sensors of templates only become live in replicas.
    pub fn add_sensor(&mut self, object: ObjectId, mut sensor: Sensor) -> Option<SensorRef> {
        let active = self.lists.contains(ListKind::Active, object);
        let obj = self.objects.get_mut(object)?;
        sensor.owner = Some(object);
        sensor.scene = Some(self.id);
        let manager = sensor.kind().event_manager();
        obj.sensors.push(sensor);
        let sensor_ref = SensorRef::new(object, obj.sensors.len() - 1);
        if active {
            self.logic.register_sensor(sensor_ref, manager);
        }
        Some(sensor_ref)
    }

    /// Attach a controller to `object`
    pub fn add_controller(&mut self, object: ObjectId, mut controller: Controller) -> Option<ControllerRef> {
        let obj = self.objects.get_mut(object)?;
        controller.owner = Some(object);
        controller.scene = Some(self.id);
        controller.replication_priority = self.replication_priority;
        obj.controllers.push(controller);
        Some(ControllerRef::new(object, obj.controllers.len() - 1))
    }

    /// Attach an actuator to `object`
    pub fn add_actuator(&mut self, object: ObjectId, mut actuator: Actuator) -> Option<ActuatorRef> {
        let obj = self.objects.get_mut(object)?;
        actuator.owner = Some(object);
        actuator.scene = Some(self.id);
        obj.actuators.push(actuator);
        Some(ActuatorRef::new(object, obj.actuators.len() - 1))
    }

    /// Make `controller` listen to `sensor`; both bricks must exist
    pub fn link_sensor(&mut self, controller: ControllerRef, sensor: SensorRef) -> bool {
        let sensor_exists = self
            .objects
            .get(sensor.object)
            .is_some_and(|o| sensor.index < o.sensors.len());
        let Some(brick) = self
            .objects
            .get_mut(controller.object)
            .and_then(|o| o.controllers.get_mut(controller.index))
        else {
            return false;
        };
        if !sensor_exists {
            return false;
        }
        if !brick.sensors.contains(&sensor) {
            brick.sensors.push(sensor);
        }
        self.logic.register_to_sensor(controller, sensor);
        true
    }

    /// Make `controller` drive `actuator`; both bricks must exist
    pub fn link_actuator(&mut self, controller: ControllerRef, actuator: ActuatorRef) -> bool {
        let actuator_exists = self
            .objects
            .get(actuator.object)
            .is_some_and(|o| actuator.index < o.actuators.len());
        let Some(brick) = self
            .objects
            .get_mut(controller.object)
            .and_then(|o| o.controllers.get_mut(controller.index))
        else {
            return false;
        };
        if !actuator_exists {
            return false;
        }
        if !brick.actuators.contains(&actuator) {
            brick.actuators.push(actuator);
        }
        self.logic.register_to_actuator(controller, actuator);
        true
    }

    /// Start playing a registered action on `object` and put it in the
    /// animated list
    pub fn play_action(&mut self, object: ObjectId, action: &str, speed: f32, looping: bool) -> bool {
        let Some(action) = self.registry.find_action(action) else {
            log::debug!("Action '{}' is not registered in scene '{}'", action, self.name);
            return false;
        };
        let Some(actions) = self.objects.get_mut(object).and_then(|o| o.actions.as_mut()) else {
            return false;
        };
        actions.play(action, speed, looping);
        self.lists.add(ListKind::Animated, object, &mut self.objects);
        true
    }

    /// Active camera; `None` if not defined
    pub fn active_camera(&self) -> Option<ObjectId> {
        self.active_camera
    }

    /// Make `camera` the active camera, adding it to the camera list
    pub fn set_active_camera(&mut self, camera: ObjectId) -> bool {
        if self.objects.get(camera).and_then(GameObject::camera).is_none() {
            return false;
        }
        if self.lists.add(ListKind::Cameras, camera, &mut self.objects) {
            log::info!("Added camera {} to scene '{}'", camera, self.name);
        }
        self.active_camera = Some(camera);
        true
    }

    /// Move `camera` to the back of the camera list so it renders last
    pub fn set_camera_on_top(&mut self, camera: ObjectId) -> bool {
        if self.objects.get(camera).and_then(GameObject::camera).is_none() {
            return false;
        }
        if !self.lists.move_to_back(ListKind::Cameras, camera) {
            self.lists.add(ListKind::Cameras, camera, &mut self.objects);
        }
        true
    }

    /// Swap the meshes of `object` for `mesh`.
    ///
    /// With `use_gfx` the mesh users and render slots are replaced and any
    /// deformer is dropped; with `use_phys` the physics shape is rebuilt.
    pub fn replace_mesh(&mut self, object: ObjectId, mesh: &Arc<Mesh>, use_gfx: bool, use_phys: bool) -> bool {
        if !self.objects.contains(object) {
            log::warn!("replace_mesh: invalid object {}, doing nothing", object);
            return false;
        }
        if use_gfx {
            self.buckets.remove_mesh_user(object);
            self.buckets.add_mesh_user(object, mesh);
            if let Some(obj) = self.objects.get_mut(object) {
                obj.meshes = vec![Arc::clone(mesh)];
                obj.deformer = None;
            }
        }
        if use_phys {
            let rebuilt = self
                .objects
                .get_mut(object)
                .and_then(|o| o.physics.as_mut())
                .map(|p| p.reinstance_shape(Some(mesh.as_ref())));
            if rebuilt == Some(false) {
                log::warn!("replace_mesh: physics shape of {} could not be rebuilt", object);
            }
        }
        true
    }

    /// Drop every mesh of `object` with its render slots and deformer
    pub fn remove_meshes(&mut self, object: ObjectId) -> bool {
        let Some(obj) = self.objects.get_mut(object) else {
            return false;
        };
        obj.meshes.clear();
        obj.deformer = None;
        self.buckets.remove_mesh_user(object);
        true
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("objects", &self.objects.len())
            .field("nodes", &self.graph.len())
            .field("physics", &self.physics.is_some())
            .finish_non_exhaustive()
    }
}
