use super::*;
use approx::assert_relative_eq;
use crate::foundation::task_pool::TaskPool;
use crate::logic::{CollisionEventManager, EventManagerKind};
use crate::physics::CollisionData;
use crate::render::{Material, NullRasterizer};

fn camera(scene: &mut Scene, transform: Transform) -> ObjectId {
    scene.add_object(
        GameObject::new(
            "camera",
            ObjectKind::Camera(CameraData::perspective(1.0, std::f32::consts::FRAC_PI_2, 0.1, 100.0)),
        )
        .with_transform(transform),
        None,
        true,
    )
}

fn cube(scene: &mut Scene) -> Arc<Mesh> {
    let material = scene.add_material(Material::new("stone"));
    scene.add_mesh(Mesh::new("cube", vec![material]))
}

#[test]
fn test_action_drives_node_location() {
    let mut scene = scene();
    let pool = TaskPool::new("animation", 2);
    scene.add_action(Action::new(
        "slide",
        vec![
            LocationKey { time: 0.0, position: Vec3::zeros() },
            LocationKey { time: 1.0, position: Vec3::new(10.0, 0.0, 0.0) },
        ],
    ));
    let updates = Arc::new(AtomicUsize::new(0));
    let slider = scene.add_object(
        GameObject::new("slider", ObjectKind::Mesh).with_deformer(CountingDeformer::boxed(&updates)),
        None,
        true,
    );
    assert!(scene.play_action(slider, "slide", 1.0, false));
    assert!(!scene.play_action(slider, "missing", 1.0, false));
    assert!(scene.list(ListKind::Animated).contains(slider));

    scene.update_animations(0.0, &pool);
    scene.update_animations(0.5, &pool);
    scene.update_parents(0.5);

    assert_relative_eq!(
        scene.world_transform(slider).expect("world").position,
        Vec3::new(5.0, 0.0, 0.0)
    );
    assert_eq!(updates.load(Ordering::SeqCst), 2);
    assert!(scene.object(slider).is_some_and(GameObject::has_deformer));
}

#[test]
fn test_failing_deformer_keeps_its_object_state() {
    let mut scene = scene();
    let pool = TaskPool::new("animation", 2);
    scene.add_action(Action::new(
        "slide",
        vec![
            LocationKey { time: 0.0, position: Vec3::zeros() },
            LocationKey { time: 1.0, position: Vec3::new(10.0, 0.0, 0.0) },
        ],
    ));
    let updates = Arc::new(AtomicUsize::new(0));
    let slider = scene.add_object(
        GameObject::new("slider", ObjectKind::Mesh).with_deformer(Box::new(FlakyDeformer {
            updates: Arc::clone(&updates),
        })),
        None,
        true,
    );
    assert!(scene.play_action(slider, "slide", 1.0, false));

    scene.update_animations(0.0, &pool);
    let obj = scene.object(slider).expect("slider");
    assert!(obj.has_deformer());
    assert!(obj.actions().is_some_and(ActionManager::is_playing));

    scene.update_animations(0.5, &pool);
    assert_eq!(updates.load(Ordering::SeqCst), 2);
    assert!(scene.object(slider).is_some_and(GameObject::has_deformer));
}

#[test]
fn test_culled_armature_skips_deformers() {
    let mut scene = scene();
    let pool = TaskPool::new("animation", 2);
    let mesh = cube(&mut scene);
    scene.add_action(Action::new(
        "idle",
        vec![LocationKey { time: 0.0, position: Vec3::zeros() }],
    ));
    let updates = Arc::new(AtomicUsize::new(0));
    let rig = scene.add_object(GameObject::new("rig", ObjectKind::Armature), None, true);
    let body = scene.add_object(
        GameObject::new("body", ObjectKind::Mesh)
            .with_mesh(mesh)
            .with_deformer(CountingDeformer::boxed(&updates)),
        Some(rig),
        true,
    );
    assert!(scene.list(ListKind::Animated).contains(rig));
    assert!(scene.play_action(rig, "idle", 1.0, true));

    scene.update_animations(0.0, &pool);
    assert_eq!(updates.load(Ordering::SeqCst), 0);

    if let Some(obj) = scene.object_mut(body) {
        obj.culled = false;
    }
    scene.update_animations(0.1, &pool);
    assert_eq!(updates.load(Ordering::SeqCst), 1);
    assert!(scene.object(body).is_some_and(GameObject::has_deformer));
}

#[test]
fn test_render_submits_only_objects_in_view() {
    let mut scene = scene();
    let mesh = cube(&mut scene);
    camera(&mut scene, Transform::identity());
    let ahead = scene.add_object(
        GameObject::new("ahead", ObjectKind::Mesh)
            .with_mesh(Arc::clone(&mesh))
            .with_transform(at(0.0, 0.0, -10.0)),
        None,
        true,
    );
    let behind = scene.add_object(
        GameObject::new("behind", ObjectKind::Mesh)
            .with_mesh(mesh)
            .with_transform(at(0.0, 0.0, 10.0)),
        None,
        true,
    );
    scene.update_parents(0.0);

    let drawn = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&drawn);
    scene.add_post_draw_callback(Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let mut rasterizer = NullRasterizer::default();
    assert!(scene.render(&mut rasterizer));
    assert_eq!(rasterizer.submissions, 1);
    assert_eq!(rasterizer.last_instance_count, 1);
    assert_eq!(drawn.load(Ordering::SeqCst), 1);
    assert!(!scene.object(ahead).expect("ahead").is_culled());
    assert!(scene.object(behind).expect("behind").is_culled());
}

#[test]
fn test_hidden_objects_are_not_drawn() {
    let mut scene = scene();
    let mesh = cube(&mut scene);
    camera(&mut scene, Transform::identity());
    let ghost = scene.add_object(
        GameObject::new("ghost", ObjectKind::Mesh)
            .with_mesh(mesh)
            .with_transform(at(0.0, 0.0, -10.0)),
        None,
        true,
    );
    scene.apply_actuator_command(crate::logic::ActuatorCommand::SetVisible {
        object: ghost,
        visible: false,
        recursive: false,
    });
    scene.update_parents(0.0);

    let mut rasterizer = NullRasterizer::default();
    assert!(scene.render(&mut rasterizer));
    assert_eq!(rasterizer.last_instance_count, 0);
}

#[test]
fn test_render_without_camera_does_nothing() {
    let mut scene = scene();
    let mut rasterizer = NullRasterizer::default();
    assert!(!scene.render(&mut rasterizer));
    assert_eq!(rasterizer.submissions, 0);
}

#[test]
fn test_activity_culling_suspends_distant_objects() {
    let mut config = SceneConfig::default();
    config.activity_culling = true;
    let mut scene = scene_with(config);
    camera(&mut scene, Transform::identity());
    let near = scene.add_object(GameObject::new("near", ObjectKind::Empty).with_transform(at(3.0, 0.0, 0.0)), None, true);
    let far = scene.add_object(GameObject::new("far", ObjectKind::Empty).with_transform(at(50.0, 0.0, 0.0)), None, true);
    let pinned = scene.add_object(
        GameObject::new("pinned", ObjectKind::Empty)
            .with_transform(at(0.0, 50.0, 0.0))
            .with_ignore_activity_culling(true),
        None,
        true,
    );
    scene.update_parents(0.0);

    scene.update_object_activity();
    assert!(!scene.object(near).expect("near").is_suspended());
    assert!(scene.object(far).expect("far").is_suspended());
    assert!(!scene.object(pinned).expect("pinned").is_suspended());

    scene.set_local_position(far, Vec3::new(5.0, 0.0, 0.0));
    scene.update_parents(0.0);
    scene.update_object_activity();
    assert!(!scene.object(far).expect("far").is_suspended());
}

#[test]
fn test_add_object_actuator_spawns_at_owner() {
    let mut scene = scene();
    let bullet = scene.add_object(GameObject::new("bullet", ObjectKind::Mesh), None, false);
    let gun = scene.add_object(GameObject::new("gun", ObjectKind::Empty).with_transform(at(0.0, 7.0, 0.0)), None, true);
    wire(
        &mut scene,
        gun,
        SensorKind::Always,
        ActuatorKind::AddObject { template: bullet, lifespan: 0.0 },
    );
    scene.update_parents(0.0);

    scene.logic_begin_frame(0.0, 1.0 / 60.0);
    assert_eq!(scene.logic_update_frame(), 1);
    scene.logic_end_frame();

    assert_eq!(scene.object_list().len(), 2);
    let spawned = scene.object_list().iter().find(|id| *id != gun).expect("spawned");
    assert_relative_eq!(
        scene.world_transform(spawned).expect("world").position,
        Vec3::new(0.0, 7.0, 0.0)
    );
}

#[test]
fn test_collision_sensor_fires_property_actuator() {
    let mut scene = scene();
    let wall = scene.add_object(GameObject::new("wall", ObjectKind::Empty), None, true);
    let ball = scene.add_object(
        GameObject::new("ball", ObjectKind::Empty).with_property("bouncy", PropertyValue::Bool(true)),
        None,
        true,
    );
    wire(
        &mut scene,
        wall,
        SensorKind::Collision { property: Some("bouncy".to_string()), hits: Vec::new() },
        ActuatorKind::Property { name: "hit".to_string(), value: PropertyValue::Bool(true) },
    );
    assert_eq!(scene.logic().registered_sensor_count(EventManagerKind::Collision), 1);

    let mut report = CollisionEventManager::callback(scene.logic().collision_manager());
    assert!(report(&CollisionData::new(ball, wall)));

    scene.logic_begin_frame(0.0, 1.0 / 60.0);
    scene.logic_update_frame();
    assert_eq!(
        scene.object(wall).and_then(|o| o.property("hit")),
        Some(&PropertyValue::Bool(true))
    );
}

#[test]
fn test_timer_property_advances_each_logic_frame() {
    let mut scene = scene();
    let clock = scene.add_object(
        GameObject::new("clock", ObjectKind::Empty).with_property("age", PropertyValue::Timer(0.0)),
        None,
        true,
    );
    for frame in 1..=4 {
        scene.logic_begin_frame(f64::from(frame) * 0.25, 0.25);
        scene.logic_update_frame();
    }
    let age = scene.object(clock).and_then(|o| o.property("age")).and_then(PropertyValue::as_f64);
    assert_relative_eq!(age.expect("timer"), 1.0);
}

#[test]
fn test_track_to_faces_target() {
    let mut scene = scene();
    let target = scene.add_object(GameObject::new("target", ObjectKind::Empty).with_transform(at(5.0, 0.0, 0.0)), None, true);
    let turret = scene.add_object(GameObject::new("turret", ObjectKind::Empty), None, true);
    scene.update_parents(0.0);

    scene.apply_actuator_command(crate::logic::ActuatorCommand::TrackTo { object: turret, target });
    scene.update_parents(0.0);

    let facing = scene.world_transform(turret).expect("world").rotation * Vec3::y();
    assert_relative_eq!(facing, Vec3::new(1.0, 0.0, 0.0), epsilon = 1.0e-5);
}
