//! Game objects
//!
//! A [`GameObject`] is the live entity of a scene. It owns exactly one
//! scene-graph node (through [`OwnedNode`]), its logic bricks, an optional
//! deformer and optional physics/graphic controllers. Objects live in the
//! scene's [`ObjectStore`](super::store::ObjectStore); containers refer to them
//! by [`ObjectId`].

use std::collections::BTreeMap;
use std::sync::Arc;

use super::animation::{ActionManager, Deformer};
use super::bounds::BoundingBox;
use super::group::GroupDef;
use super::node::OwnedNode;
use crate::foundation::handles::{AssetId, NodeId, ObjectId, SceneId};
use crate::foundation::math::{Mat4, Transform};
use crate::logic::{Actuator, Controller, Sensor};
use crate::physics::{GraphicController, PhysicsController};
use crate::render::Mesh;

/// Property name carrying the remaining lifetime of a timed object
pub const TIMEBOMB_PROPERTY: &str = "::timebomb";

/// Value of a game property
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    Text(String),
    /// Seconds, advanced every logic frame by the timer manager
    Timer(f64),
}

impl PropertyValue {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) | Self::Timer(v) => Some(*v),
            Self::Bool(_) | Self::Text(_) => None,
        }
    }
}

/// Camera parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CameraData {
    /// View-to-clip matrix
    pub projection: Mat4,
    /// Test objects against the frustum; when off everything is visible
    pub frustum_culling: bool,
}

impl CameraData {
    /// Perspective camera
    pub fn perspective(aspect: f32, fovy: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Mat4::new_perspective(aspect, fovy, near, far),
            frustum_culling: true,
        }
    }
}

/// Kind of object; decides per-kind list membership
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    /// Transform only
    Empty,
    /// Renders meshes
    Mesh,
    /// Lamp
    Light,
    /// Camera
    Camera(CameraData),
    /// Text object
    Text,
    /// Skeleton driving deformed child meshes
    Armature,
}

/// Live entity of a scene
pub struct GameObject {
    name: String,
    kind: ObjectKind,
    asset: Option<AssetId>,
    pub(crate) scene: Option<SceneId>,
    pub(crate) node: Option<OwnedNode>,
    pub(crate) initial: Transform,
    pub(crate) bbox: BoundingBox,
    pub(crate) sensors: Vec<Sensor>,
    pub(crate) controllers: Vec<Controller>,
    pub(crate) actuators: Vec<Actuator>,
    properties: BTreeMap<String, PropertyValue>,
    pub(crate) meshes: Vec<Arc<Mesh>>,
    pub(crate) deformer: Option<Box<dyn Deformer>>,
    pub(crate) physics: Option<Box<dyn PhysicsController>>,
    pub(crate) graphic: Option<Box<dyn GraphicController>>,
    pub(crate) actions: Option<ActionManager>,
    layer: u32,
    visible: bool,
    pub(crate) culled: bool,
    suspended: bool,
    ignore_activity_culling: bool,
    obstacle: bool,
    pub(crate) dupli_group: Option<Arc<GroupDef>>,
    pub(crate) group_template: Option<AssetId>,
    pub(crate) dupli_group_object: Option<ObjectId>,
    pub(crate) instance_objects: Vec<ObjectId>,
}

impl GameObject {
    /// Create an object of `kind` at the origin
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            asset: None,
            scene: None,
            node: None,
            initial: Transform::identity(),
            bbox: BoundingBox::default(),
            sensors: Vec::new(),
            controllers: Vec::new(),
            actuators: Vec::new(),
            properties: BTreeMap::new(),
            meshes: Vec::new(),
            deformer: None,
            physics: None,
            graphic: None,
            actions: Some(ActionManager::default()),
            layer: 1,
            visible: true,
            culled: true,
            suspended: false,
            ignore_activity_culling: false,
            obstacle: false,
            dupli_group: None,
            group_template: None,
            dupli_group_object: None,
            instance_objects: Vec::new(),
        }
    }

    /// Tag with the authored data it was converted from
    pub fn with_asset(mut self, asset: AssetId) -> Self {
        self.asset = Some(asset);
        self
    }

    /// Local transform used when the object's node is created
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.initial = transform;
        self
    }

    /// Local bounding box
    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = bbox;
        self
    }

    /// Add a mesh
    pub fn with_mesh(mut self, mesh: Arc<Mesh>) -> Self {
        self.meshes.push(mesh);
        self
    }

    /// Set a property
    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    /// Layer bit mask
    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    /// Attach a physics body
    pub fn with_physics(mut self, controller: Box<dyn PhysicsController>) -> Self {
        self.physics = Some(controller);
        self
    }

    /// Attach a broad-phase proxy
    pub fn with_graphic_controller(mut self, controller: Box<dyn GraphicController>) -> Self {
        self.graphic = Some(controller);
        self
    }

    /// Attach a deformer
    pub fn with_deformer(mut self, deformer: Box<dyn Deformer>) -> Self {
        self.deformer = Some(deformer);
        self
    }

    /// Make this object a dupli-group instance of `group`
    pub fn with_dupli_group(mut self, group: Arc<GroupDef>) -> Self {
        self.dupli_group = Some(group);
        self
    }

    /// Track the object in the obstacle simulation
    pub fn with_obstacle(mut self, obstacle: bool) -> Self {
        self.obstacle = obstacle;
        self
    }

    /// Exclude from activity culling
    pub fn with_ignore_activity_culling(mut self, ignore: bool) -> Self {
        self.ignore_activity_culling = ignore;
        self
    }

    /// Clone everything that a replica carries over.
    ///
    /// The replica has no node, no controllers and no group links; the
    /// replication engine provides those. Bricks are copied in order with
    /// their links still pointing at the originals.
    pub(crate) fn replica(&self) -> GameObject {
        GameObject {
            name: self.name.clone(),
            kind: self.kind.clone(),
            asset: self.asset,
            scene: self.scene,
            node: None,
            initial: self.initial.clone(),
            bbox: self.bbox,
            sensors: self.sensors.clone(),
            controllers: self.controllers.clone(),
            actuators: self.actuators.clone(),
            properties: self.properties.clone(),
            meshes: self.meshes.clone(),
            deformer: self.deformer.as_ref().map(|d| d.replica()),
            physics: None,
            graphic: None,
            actions: Some(ActionManager::default()),
            layer: self.layer,
            visible: self.visible,
            culled: true,
            suspended: self.suspended,
            ignore_activity_culling: self.ignore_activity_culling,
            obstacle: self.obstacle,
            dupli_group: self.dupli_group.clone(),
            group_template: self.group_template,
            dupli_group_object: None,
            instance_objects: Vec::new(),
        }
    }

    /// Object name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Object kind
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Authored data this object was converted or replicated from
    pub fn asset(&self) -> Option<AssetId> {
        self.asset
    }

    /// Scene the object belongs to
    pub fn scene(&self) -> Option<SceneId> {
        self.scene
    }

    /// Node of the object; `None` once torn down
    pub fn node(&self) -> Option<NodeId> {
        self.node.as_ref().map(OwnedNode::id)
    }

    /// Whether the object is an armature
    pub fn is_armature(&self) -> bool {
        self.kind == ObjectKind::Armature
    }

    /// Camera parameters, if this is a camera
    pub fn camera(&self) -> Option<&CameraData> {
        match &self.kind {
            ObjectKind::Camera(data) => Some(data),
            _ => None,
        }
    }

    /// Sensors in order
    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    /// Controllers in order
    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }

    /// Actuators in order
    pub fn actuators(&self) -> &[Actuator] {
        &self.actuators
    }

    /// Look up a property
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Look up a property for modification
    pub fn property_mut(&mut self, name: &str) -> Option<&mut PropertyValue> {
        self.properties.get_mut(name)
    }

    /// Set a property, returning the previous value
    pub fn set_property(&mut self, name: impl Into<String>, value: PropertyValue) -> Option<PropertyValue> {
        self.properties.insert(name.into(), value)
    }

    /// Remove a property
    pub fn remove_property(&mut self, name: &str) -> Option<PropertyValue> {
        self.properties.remove(name)
    }

    /// All properties
    pub fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    /// Names of timer properties
    pub fn timer_properties(&self) -> Vec<String> {
        self.properties
            .iter()
            .filter(|(_, v)| matches!(v, PropertyValue::Timer(_)))
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub(crate) fn sensors_and_properties_mut(&mut self) -> (&mut Vec<Sensor>, &BTreeMap<String, PropertyValue>) {
        (&mut self.sensors, &self.properties)
    }

    /// Meshes drawn by the object
    pub fn meshes(&self) -> &[Arc<Mesh>] {
        &self.meshes
    }

    /// Number of meshes
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Whether a deformer is attached (and not checked out by a running task)
    pub fn has_deformer(&self) -> bool {
        self.deformer.is_some()
    }

    /// Physics body
    pub fn physics_controller(&self) -> Option<&dyn PhysicsController> {
        self.physics.as_deref()
    }

    /// Broad-phase proxy
    pub fn graphic_controller(&self) -> Option<&dyn GraphicController> {
        self.graphic.as_deref()
    }

    /// Action manager
    pub fn actions(&self) -> Option<&ActionManager> {
        self.actions.as_ref()
    }

    /// Mutable action manager
    pub fn actions_mut(&mut self) -> Option<&mut ActionManager> {
        self.actions.as_mut()
    }

    /// Layer bit mask
    pub fn layer(&self) -> u32 {
        self.layer
    }

    /// Set the layer bit mask
    pub fn set_layer(&mut self, layer: u32) {
        self.layer = layer;
    }

    /// Visibility flag
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Set the visibility flag
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Culled for the camera of the last visibility pass
    pub fn is_culled(&self) -> bool {
        self.culled
    }

    /// Suspended objects skip logic
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Suspend logic (and physics, if any)
    pub fn suspend(&mut self) {
        if !self.suspended {
            self.suspended = true;
            if let Some(physics) = self.physics.as_mut() {
                physics.suspend_dynamics(false);
            }
        }
    }

    /// Resume after [`GameObject::suspend`]
    pub fn resume(&mut self) {
        if self.suspended {
            self.suspended = false;
            if let Some(physics) = self.physics.as_mut() {
                physics.restore_dynamics();
            }
        }
    }

    /// Excluded from activity culling
    pub fn ignores_activity_culling(&self) -> bool {
        self.ignore_activity_culling
    }

    /// Tracked by the obstacle simulation
    pub fn is_obstacle(&self) -> bool {
        self.obstacle
    }

    /// Group this object instantiates, if it is a dupli-group instance
    pub fn dupli_group(&self) -> Option<&Arc<GroupDef>> {
        self.dupli_group.as_ref()
    }

    /// Asset of the group template object this member was instantiated for
    pub fn group_template(&self) -> Option<AssetId> {
        self.group_template
    }

    /// Group instance that created this object
    pub fn dupli_group_object(&self) -> Option<ObjectId> {
        self.dupli_group_object
    }

    /// Objects created by this group instance
    pub fn instance_objects(&self) -> &[ObjectId] {
        &self.instance_objects
    }
}

impl std::fmt::Debug for GameObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameObject")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("asset", &self.asset)
            .field("node", &self.node())
            .field("sensors", &self.sensors.len())
            .field("controllers", &self.controllers.len())
            .field("actuators", &self.actuators.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replica_drops_node_and_group_links() {
        let mut original = GameObject::new("crate", ObjectKind::Mesh)
            .with_property("hp", PropertyValue::Int(3))
            .with_property("clock", PropertyValue::Timer(0.0));
        original.dupli_group_object = Some(ObjectId::next());
        original.instance_objects.push(ObjectId::next());

        let replica = original.replica();
        assert_eq!(replica.name(), "crate");
        assert_eq!(replica.property("hp"), Some(&PropertyValue::Int(3)));
        assert_eq!(replica.timer_properties(), vec!["clock".to_string()]);
        assert!(replica.node().is_none());
        assert!(replica.dupli_group_object().is_none());
        assert!(replica.instance_objects().is_empty());
        assert!(replica.is_culled());
    }

    #[test]
    fn test_property_numeric_view() {
        assert_eq!(PropertyValue::Int(2).as_f64(), Some(2.0));
        assert_eq!(PropertyValue::Timer(1.5).as_f64(), Some(1.5));
        assert_eq!(PropertyValue::Text("x".into()).as_f64(), None);
    }
}
