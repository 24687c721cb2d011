use super::*;
use crate::foundation::handles::ConverterId;
use crate::physics::DummyPhysicsEnvironment;
use crate::render::Material;

fn physics_scene(name: &str) -> Scene {
    Scene::new(name, SceneConfig::default()).with_physics(Box::new(DummyPhysicsEnvironment::new()))
}

#[test]
fn test_merge_moves_objects_logic_and_lookups() {
    let mut level = scene();
    level.add_object(GameObject::new("floor", ObjectKind::Mesh), None, true);

    let mut library = Scene::new("library", SceneConfig::default());
    let material = library.add_material(Material::new("rust"));
    let mesh = library.add_mesh(Mesh::new("girder", vec![material]));
    let girder = library.add_object(
        GameObject::new("girder", ObjectKind::Mesh)
            .with_asset(AssetId(70))
            .with_mesh(mesh),
        None,
        true,
    );
    let (sensor, controller, _) = wire(&mut library, girder, SensorKind::Always, ActuatorKind::EndObject);
    let template = library.add_object(GameObject::new("rivet", ObjectKind::Mesh), None, false);

    level.merge_scene(library).expect("merge");

    assert!(level.object_list().contains(girder));
    assert!(level.inactive_list().contains(template));
    assert!(level.root_parent_list().contains(girder));
    assert_eq!(level.find_object(AssetId(70)), Some(girder));
    assert_eq!(level.find_object_by_name("rivet"), Some(template));
    assert!(level.registry().find_mesh("girder").is_some());
    assert_eq!(level.assets().material(material).and_then(|m| m.scene), Some(level.id()));
    assert_eq!(level.buckets().slots_of(girder), 1);

    let obj = level.object(girder).expect("girder");
    assert_eq!(obj.scene(), Some(level.id()));
    assert_eq!(obj.sensors()[0].scene(), Some(level.id()));
    assert!(level.graph().get(obj.node().expect("node")).is_some_and(|n| n.scene() == level.id()));
    assert!(level.logic().is_sensor_registered(sensor));
    assert_eq!(level.logic().sensor_listeners(sensor), &[controller]);

    // Merged objects take part in the recipient's frames
    level.logic_begin_frame(0.0, 1.0 / 60.0);
    assert_eq!(level.logic_update_frame(), 1);
    level.logic_end_frame();
    assert!(level.object(girder).is_none());
}

#[test]
fn test_merged_template_can_be_replicated() {
    let mut level = scene();
    let mut library = Scene::new("library", SceneConfig::default());
    let template = library.add_object(GameObject::new("rivet", ObjectKind::Mesh), None, false);
    level.merge_scene(library).expect("merge");

    let replica = level.add_replica_object(template, None, 0.0).expect("replica");
    assert!(level.object_list().contains(replica));
    assert_eq!(level.object(replica).and_then(GameObject::scene), Some(level.id()));
}

#[test]
fn test_physics_mismatch_is_refused() {
    let mut level = physics_scene("level");
    let library = Scene::new("library", SceneConfig::default());
    let err = level.merge_scene(library).expect_err("mismatch");
    assert!(matches!(err, MergeError::PhysicsMismatch { .. }));
}

#[test]
fn test_converter_mismatch_is_refused() {
    let mut level = scene();
    level.set_converter(Some(ConverterId::next()));
    let mut library = Scene::new("library", SceneConfig::default());
    library.set_converter(Some(ConverterId::next()));
    let object = library.add_object(GameObject::new("crate", ObjectKind::Empty), None, true);

    let err = level.merge_scene(library).expect_err("mismatch");
    assert!(matches!(err, MergeError::ConverterMismatch { .. }));
    assert!(level.object(object).is_none());
}

#[test]
fn test_bodies_move_to_recipient_environment() {
    let passes = Arc::new(AtomicUsize::new(0));
    let mut level = physics_scene("level");
    let env = level.physics_environment().map(|e| e.id());

    let mut library = physics_scene("library");
    let body = library.add_object(
        GameObject::new("crate", ObjectKind::Mesh).with_physics(RecordingBody::boxed(&passes)),
        None,
        true,
    );
    assert_ne!(
        library.object(body).and_then(GameObject::physics_controller).and_then(|p| p.environment()),
        env
    );

    level.merge_scene(library).expect("merge");
    let controller = level.object(body).and_then(GameObject::physics_controller).expect("body");
    assert_eq!(controller.environment(), env);
    assert_eq!(passes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_pending_removals_travel_with_the_donor() {
    let mut level = scene();
    let mut library = Scene::new("library", SceneConfig::default());
    let doomed = library.add_object(GameObject::new("doomed", ObjectKind::Empty), None, true);
    library.delayed_remove_object(doomed);

    level.merge_scene(library).expect("merge");
    assert!(level.euthanasia_list().contains(doomed));
    level.logic_end_frame();
    assert!(level.object(doomed).is_none());
}
