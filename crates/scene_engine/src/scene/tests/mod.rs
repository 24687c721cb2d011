//! Scene behavior across replication, removal, frame phases and merging

mod dupli;
mod frame;
mod lifecycle;
mod merge;
mod replication;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;
use crate::config::SceneConfig;
use crate::foundation::handles::{AssetId, EnvironmentId, ObjectId};
use crate::foundation::math::{Transform, Vec3};
use crate::logic::{
    Actuator, ActuatorKind, ActuatorRef, Controller, ControllerKind, ControllerRef, Sensor, SensorKind, SensorRef,
};
use crate::physics::{ConstraintParticipant, MotionState, PhysicsController};
use crate::render::Mesh;

fn scene() -> Scene {
    Scene::new("test", SceneConfig::default())
}

fn scene_with(config: SceneConfig) -> Scene {
    Scene::new("test", config)
}

fn at(x: f32, y: f32, z: f32) -> Transform {
    Transform::from_position(Vec3::new(x, y, z))
}

/// Wire `sensor -> controller -> actuator` on one object
fn wire(scene: &mut Scene, object: ObjectId, sensor: SensorKind, actuator: ActuatorKind) -> (SensorRef, ControllerRef, ActuatorRef) {
    let sensor = scene.add_sensor(object, Sensor::new("sensor", sensor)).expect("sensor");
    let controller = scene
        .add_controller(object, Controller::new("and", ControllerKind::And))
        .expect("controller");
    let actuator = scene.add_actuator(object, Actuator::new("actuator", actuator)).expect("actuator");
    assert!(scene.link_sensor(controller, sensor));
    assert!(scene.link_actuator(controller, actuator));
    (sensor, controller, actuator)
}

/// Physics body recording what the scene asks of it
#[derive(Default)]
struct RecordingBody {
    client: Option<ObjectId>,
    environment: Option<EnvironmentId>,
    suspended: bool,
    constraint_passes: Arc<AtomicUsize>,
}

impl RecordingBody {
    fn boxed(constraint_passes: &Arc<AtomicUsize>) -> Box<dyn PhysicsController> {
        Box::new(Self {
            constraint_passes: Arc::clone(constraint_passes),
            ..Self::default()
        })
    }
}

impl PhysicsController for RecordingBody {
    fn replica(&self, _motion: MotionState, _parent: Option<&dyn PhysicsController>) -> Option<Box<dyn PhysicsController>> {
        Some(Self::boxed(&self.constraint_passes))
    }

    fn set_client_object(&mut self, object: ObjectId) {
        self.client = Some(object);
    }

    fn client_object(&self) -> Option<ObjectId> {
        self.client
    }

    fn suspend_dynamics(&mut self, _ghost: bool) {
        self.suspended = true;
    }

    fn restore_dynamics(&mut self) {
        self.suspended = false;
    }

    fn is_dynamics_suspended(&self) -> bool {
        self.suspended
    }

    fn set_environment(&mut self, environment: EnvironmentId) {
        self.environment = Some(environment);
    }

    fn environment(&self) -> Option<EnvironmentId> {
        self.environment
    }

    fn replicate_constraints(&mut self, _owner: ObjectId, _participants: &[ConstraintParticipant]) {
        self.constraint_passes.fetch_add(1, Ordering::SeqCst);
    }

    fn clear_constraints(&mut self) {}

    fn reinstance_shape(&mut self, mesh: Option<&Mesh>) -> bool {
        mesh.is_some()
    }
}

/// Deformer counting its updates in a counter shared with its replicas
struct CountingDeformer {
    updates: Arc<AtomicUsize>,
}

impl CountingDeformer {
    fn boxed(updates: &Arc<AtomicUsize>) -> Box<dyn Deformer> {
        Box::new(Self {
            updates: Arc::clone(updates),
        })
    }
}

impl Deformer for CountingDeformer {
    fn update(&mut self) -> bool {
        self.updates.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn update_buckets(&mut self) {}

    fn replica(&self) -> Box<dyn Deformer> {
        Self::boxed(&self.updates)
    }
}

/// Deformer that panics on its first update and counts the later ones
struct FlakyDeformer {
    updates: Arc<AtomicUsize>,
}

impl Deformer for FlakyDeformer {
    fn update(&mut self) -> bool {
        let seen = self.updates.fetch_add(1, Ordering::SeqCst);
        assert!(seen > 0, "deformer failed");
        true
    }

    fn update_buckets(&mut self) {}

    fn replica(&self) -> Box<dyn Deformer> {
        Box::new(Self {
            updates: Arc::clone(&self.updates),
        })
    }
}

#[test]
fn test_scene_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<Scene>();
}

#[test]
fn test_replicated_body_joins_scene_environment() {
    let passes = Arc::new(AtomicUsize::new(0));
    let mut scene = scene().with_physics(Box::new(crate::physics::DummyPhysicsEnvironment::new()));
    let env = scene.physics_environment().map(|e| e.id());

    let crate_body = scene.add_object(
        GameObject::new("crate", ObjectKind::Mesh).with_physics(RecordingBody::boxed(&passes)),
        None,
        false,
    );
    scene.add_object(
        GameObject::new("lid", ObjectKind::Mesh).with_physics(RecordingBody::boxed(&passes)),
        Some(crate_body),
        false,
    );

    let replica = scene.add_replica_object(crate_body, None, 0.0).expect("replica");
    let child = scene.children_of(replica)[0];

    let root_body = scene.object(replica).and_then(GameObject::physics_controller).expect("body");
    assert_eq!(root_body.client_object(), Some(replica));
    assert_eq!(root_body.environment(), env);
    assert!(!root_body.is_dynamics_suspended());

    let child_body = scene.object(child).and_then(GameObject::physics_controller).expect("body");
    assert!(child_body.is_dynamics_suspended());
}
