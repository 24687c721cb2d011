use super::*;
use crate::foundation::task_pool::TaskPool;

#[test]
fn test_teardown_releases_every_membership_once() {
    let mut scene = scene();
    let template = scene.add_object(GameObject::new("shot", ObjectKind::Mesh), None, false);
    let shot = scene.add_replica_object(template, None, 10.0).expect("replica");
    assert_eq!(
        scene.list_memberships(shot),
        vec![ListKind::Active, ListKind::Temp, ListKind::RootParents]
    );
    assert_eq!(scene.objects().ref_count(shot), Some(3));

    let reclaimed = scene.objects().reclaimed_count();
    assert!(scene.delayed_remove_object(shot));
    scene.logic_end_frame();

    assert!(scene.object(shot).is_none());
    assert_eq!(scene.objects().reclaimed_count(), reclaimed + 1);
    assert_eq!(scene.zombie_count(), 0);
    assert!(scene.list_memberships(shot).is_empty());
}

#[test]
fn test_deferred_removal_waits_for_logic_end() {
    let mut scene = scene();
    let x = scene.add_object(GameObject::new("x", ObjectKind::Empty), None, true);
    wire(&mut scene, x, SensorKind::Always, ActuatorKind::EndObject);
    let pool = TaskPool::new("animation", 2);

    scene.logic_begin_frame(0.0, 1.0 / 60.0);
    assert_eq!(scene.logic_update_frame(), 1);
    assert!(scene.object_list().contains(x));
    assert!(scene.euthanasia_list().contains(x));

    scene.update_animations(0.0, &pool);
    scene.update_parents(0.0);
    assert!(scene.object_list().iter().any(|id| id == x));

    scene.logic_end_frame();
    assert!(!scene.object_list().contains(x));
    assert!(scene.euthanasia_list().is_empty());
    assert!(scene.object(x).is_none());
}

#[test]
fn test_delayed_remove_is_idempotent() {
    let mut scene = scene();
    let x = scene.add_object(GameObject::new("x", ObjectKind::Empty), None, true);
    assert!(scene.delayed_remove_object(x));
    assert!(!scene.delayed_remove_object(x));
    assert_eq!(scene.euthanasia_list().len(), 1);
    assert!(!scene.delayed_remove_object(ObjectId::next()));
}

#[test]
fn test_remove_object_destroys_subtree() {
    let mut scene = scene();
    let root = scene.add_object(GameObject::new("root", ObjectKind::Empty), None, true);
    let child = scene.add_object(GameObject::new("child", ObjectKind::Empty), Some(root), true);
    let grandchild = scene.add_object(GameObject::new("grandchild", ObjectKind::Light), Some(child), true);
    let nodes = scene.graph().len();

    assert!(scene.remove_object(root));
    for id in [root, child, grandchild] {
        assert!(scene.object(id).is_none());
    }
    assert_eq!(scene.graph().len(), nodes - 3);
    assert!(scene.light_list().is_empty());
    assert!(!scene.remove_object(root));
}

#[test]
fn test_retained_object_becomes_zombie() {
    let mut scene = scene();
    let x = scene.add_object(GameObject::new("x", ObjectKind::Empty), None, true);
    scene.retain_object(x);

    scene.delayed_remove_object(x);
    scene.logic_end_frame();

    assert_eq!(scene.zombie_count(), 1);
    let zombie = scene.object(x).expect("still referenced");
    assert!(zombie.node().is_none());
    assert!(!scene.object_list().contains(x));

    assert_eq!(scene.release_object(x), Some(0));
    assert!(scene.object(x).is_none());
}

#[test]
fn test_zombie_cannot_be_scheduled_again() {
    let mut scene = scene();
    let x = scene.add_object(GameObject::new("x", ObjectKind::Empty), None, true);
    scene.retain_object(x);
    scene.delayed_remove_object(x);
    scene.logic_end_frame();
    assert_eq!(scene.zombie_count(), 1);

    assert!(!scene.delayed_remove_object(x));
    assert!(scene.euthanasia_list().is_empty());
    scene.logic_end_frame();
    assert_eq!(scene.zombie_count(), 1);
    assert_eq!(scene.objects().ref_count(x), Some(1));
}

#[test]
fn test_removed_bricks_are_unlinked_from_survivors() {
    let mut scene = scene();
    let survivor = scene.add_object(GameObject::new("survivor", ObjectKind::Empty), None, true);
    let victim = scene.add_object(GameObject::new("victim", ObjectKind::Empty), None, true);
    let tracker = scene
        .add_actuator(survivor, Actuator::new("track", ActuatorKind::TrackTo { target: Some(victim) }))
        .expect("actuator");
    let controller = scene
        .add_controller(survivor, Controller::new("and", ControllerKind::And))
        .expect("controller");
    let (sensor, _, actuator) = wire(&mut scene, victim, SensorKind::Always, ActuatorKind::EndObject);
    assert!(scene.link_sensor(controller, sensor));
    assert!(scene.link_actuator(controller, actuator));

    scene.delayed_remove_object(victim);
    scene.logic_end_frame();

    let brick = &scene.object(survivor).expect("survivor").controllers()[0];
    assert!(brick.linked_sensors().is_empty());
    assert!(brick.linked_actuators().is_empty());
    assert!(!scene.logic().is_sensor_registered(sensor));
    assert!(scene.logic().actuator_drivers(actuator).is_empty());
    assert_eq!(
        scene.object(survivor).expect("survivor").actuators()[tracker.index].kind(),
        &ActuatorKind::TrackTo { target: None }
    );
}

#[test]
fn test_removed_camera_is_no_longer_active() {
    let mut scene = scene();
    let camera = scene.add_object(
        GameObject::new("camera", ObjectKind::Camera(CameraData::perspective(1.0, 1.0, 0.1, 100.0))),
        None,
        true,
    );
    assert_eq!(scene.active_camera(), Some(camera));
    scene.delayed_remove_object(camera);
    scene.logic_end_frame();
    assert_eq!(scene.active_camera(), None);
    assert!(scene.camera_list().is_empty());
}

#[test]
fn test_removing_a_replica_tears_down_its_children() {
    let mut scene = scene();
    let a = scene.add_object(GameObject::new("a", ObjectKind::Empty), None, false);
    let b = scene.add_object(GameObject::new("b", ObjectKind::Empty), Some(a), false);
    wire(&mut scene, a, SensorKind::Always, ActuatorKind::TrackTo { target: Some(b) });

    let a_replica = scene.add_replica_object(a, None, 0.0).expect("replica");
    let b_replica = scene.children_of(a_replica)[0];
    let actuator = &scene.object(a_replica).expect("replica").actuators()[0];
    assert_eq!(actuator.kind(), &ActuatorKind::TrackTo { target: Some(b_replica) });

    let reclaimed = scene.objects().reclaimed_count();
    assert!(scene.delayed_remove_object(b_replica));
    assert!(scene.remove_object(a_replica));
    assert!(scene.object(a_replica).is_none());
    assert!(scene.object(b_replica).is_none());
    assert_eq!(scene.objects().reclaimed_count(), reclaimed + 2);

    scene.logic_end_frame();
    assert!(!scene.euthanasia_list().contains(b_replica));
    assert!(scene.euthanasia_list().is_empty());
    assert_eq!(scene.zombie_count(), 0);
    assert!(scene.object(a).is_some());
    assert!(scene.object(b).is_some());
}
