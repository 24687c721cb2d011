use super::*;
use approx::assert_relative_eq;

/// Inactive `ship` with child `turret`. The ship's controller listens to the
/// ship's sensor and drives a track-to actuator aimed at the turret plus the
/// turret's visibility actuator.
fn ship_template(scene: &mut Scene) -> (ObjectId, ObjectId) {
    let ship = scene.add_object(
        GameObject::new("ship", ObjectKind::Mesh).with_asset(AssetId(1)),
        None,
        false,
    );
    let turret = scene.add_object(
        GameObject::new("turret", ObjectKind::Mesh)
            .with_asset(AssetId(2))
            .with_transform(at(0.0, 0.0, 1.0)),
        Some(ship),
        false,
    );
    let (_, controller, _) = wire(
        scene,
        ship,
        SensorKind::Always,
        ActuatorKind::TrackTo { target: Some(turret) },
    );
    let hide = scene
        .add_actuator(
            turret,
            Actuator::new("hide", ActuatorKind::Visibility { visible: false, recursive: false }),
        )
        .expect("actuator");
    assert!(scene.link_actuator(controller, hide));
    (ship, turret)
}

#[test]
fn test_internal_links_follow_the_replicas() {
    let mut scene = scene();
    let (ship, turret) = ship_template(&mut scene);

    let replica = scene.add_replica_object(ship, None, 0.0).expect("replica");
    let children = scene.children_of(replica);
    assert_eq!(children.len(), 1);
    let turret_replica = children[0];
    assert_ne!(turret_replica, turret);
    assert_eq!(scene.graph().len(), 4);

    let obj = scene.object(replica).expect("replica");
    let controller = &obj.controllers()[0];
    assert_eq!(controller.linked_sensors(), &[SensorRef::new(replica, 0)]);
    assert_eq!(
        controller.linked_actuators(),
        &[ActuatorRef::new(replica, 0), ActuatorRef::new(turret_replica, 0)]
    );
    assert_eq!(
        obj.actuators()[0].kind(),
        &ActuatorKind::TrackTo { target: Some(turret_replica) }
    );
    assert_eq!(obj.actuators()[0].owner(), Some(replica));

    // The template keeps its own wiring
    let template = scene.object(ship).expect("template");
    assert_eq!(
        template.controllers()[0].linked_actuators(),
        &[ActuatorRef::new(ship, 0), ActuatorRef::new(turret, 0)]
    );
}

#[test]
fn test_replica_sensors_are_registered_with_their_listeners() {
    let mut scene = scene();
    let (ship, _) = ship_template(&mut scene);
    let replica = scene.add_replica_object(ship, None, 0.0).expect("replica");

    let sensor = SensorRef::new(replica, 0);
    assert!(scene.logic().is_sensor_registered(sensor));
    assert_eq!(scene.logic().sensor_listeners(sensor), &[ControllerRef::new(replica, 0)]);
    assert!(!scene.logic().is_sensor_registered(SensorRef::new(ship, 0)));
}

#[test]
fn test_external_links_survive_only_to_active_objects() {
    let mut scene = scene();
    let target = scene.add_object(GameObject::new("target", ObjectKind::Empty), None, true);
    let lamp = scene
        .add_actuator(target, Actuator::new("hide", ActuatorKind::Visibility { visible: false, recursive: false }))
        .expect("actuator");
    let ghost = scene.add_object(GameObject::new("ghost", ObjectKind::Empty), None, false);
    let haunt = scene.add_actuator(ghost, Actuator::new("end", ActuatorKind::EndObject)).expect("actuator");

    let gun = scene.add_object(GameObject::new("gun", ObjectKind::Mesh), None, false);
    let controller = scene
        .add_controller(gun, Controller::new("or", ControllerKind::Or))
        .expect("controller");
    assert!(scene.link_actuator(controller, lamp));
    assert!(scene.link_actuator(controller, haunt));

    let replica = scene.add_replica_object(gun, None, 0.0).expect("replica");
    let linked = scene.object(replica).expect("replica").controllers()[0].linked_actuators().to_vec();
    assert_eq!(linked, vec![lamp]);
    assert!(scene
        .logic()
        .actuator_drivers(lamp)
        .contains(&ControllerRef::new(replica, 0)));
}

#[test]
fn test_replica_is_placed_at_reference() {
    let mut scene = scene();
    let (ship, _) = ship_template(&mut scene);
    let spawner = scene.add_object(
        GameObject::new("spawner", ObjectKind::Empty)
            .with_layer(4)
            .with_transform(Transform {
                scale: Vec3::new(2.0, 2.0, 2.0),
                ..at(5.0, 0.0, 0.0)
            }),
        None,
        true,
    );
    scene.update_parents(0.0);

    let replica = scene.add_replica_object(ship, Some(spawner), 0.0).expect("replica");
    let turret = scene.children_of(replica)[0];

    let world = scene.world_transform(replica).expect("world");
    assert_relative_eq!(world.position, Vec3::new(5.0, 0.0, 0.0));
    assert_relative_eq!(world.scale, Vec3::new(2.0, 2.0, 2.0));
    let turret_world = scene.world_transform(turret).expect("world");
    assert_relative_eq!(turret_world.position, Vec3::new(5.0, 0.0, 2.0));

    assert_eq!(scene.object(replica).map(GameObject::layer), Some(4));
    assert_eq!(scene.object(turret).map(GameObject::layer), Some(4));
}

#[test]
fn test_replica_without_reference_takes_scene_layers() {
    let mut scene = scene();
    scene.set_layer(0b110);
    let (ship, _) = ship_template(&mut scene);
    let replica = scene.add_replica_object(ship, None, 0.0).expect("replica");
    assert_eq!(scene.object(replica).map(GameObject::layer), Some(0b110));
}

#[test]
fn test_replica_lists() {
    let mut scene = scene();
    let (ship, turret) = ship_template(&mut scene);
    let replica = scene.add_replica_object(ship, None, 0.0).expect("replica");
    let turret_replica = scene.children_of(replica)[0];

    assert!(scene.object_list().contains(replica));
    assert!(scene.object_list().contains(turret_replica));
    assert!(scene.root_parent_list().contains(replica));
    assert!(!scene.root_parent_list().contains(turret_replica));
    assert!(!scene.object_list().contains(turret));
    assert!(scene.temp_list().is_empty());
    assert_eq!(scene.objects().ref_count(replica), Some(2));
}

#[test]
fn test_lifespan_counts_down_to_removal() {
    let mut scene = scene();
    let (ship, _) = ship_template(&mut scene);
    let replica = scene.add_replica_object(ship, None, 3.0).expect("replica");

    assert!(scene.temp_list().contains(replica));
    assert!(matches!(
        scene.object(replica).and_then(|o| o.property(TIMEBOMB_PROPERTY)),
        Some(PropertyValue::Float(_))
    ));

    // 3 frames of 0.02s each, stepped at 0.025s
    scene.logic_begin_frame(0.025, 0.025);
    scene.logic_begin_frame(0.05, 0.025);
    assert!(!scene.euthanasia_list().contains(replica));
    scene.logic_begin_frame(0.075, 0.025);
    assert!(scene.euthanasia_list().contains(replica));

    scene.logic_end_frame();
    assert!(scene.object(replica).is_none());
    assert!(scene.temp_list().is_empty());
}

#[test]
fn test_unknown_original_is_rejected() {
    let mut scene = scene();
    assert!(scene.add_replica_object(ObjectId::next(), None, 0.0).is_none());
    assert!(scene.object_list().is_empty());
}

#[test]
fn test_add_object_template_inside_hierarchy_is_relinked() {
    let mut scene = scene();
    let launcher = scene.add_object(GameObject::new("launcher", ObjectKind::Empty), None, false);
    let flare = scene.add_object(GameObject::new("flare", ObjectKind::Empty), Some(launcher), false);
    let outside = scene.add_object(GameObject::new("shell", ObjectKind::Empty), None, false);
    wire(&mut scene, launcher, SensorKind::Always, ActuatorKind::AddObject { template: flare, lifespan: 5.0 });
    scene
        .add_actuator(launcher, Actuator::new("shell", ActuatorKind::AddObject { template: outside, lifespan: 5.0 }))
        .expect("actuator");

    let replica = scene.add_replica_object(launcher, None, 0.0).expect("replica");
    let flare_replica = scene.children_of(replica)[0];
    let actuators = scene.object(replica).expect("replica").actuators();
    assert_eq!(
        actuators[0].kind(),
        &ActuatorKind::AddObject { template: flare_replica, lifespan: 5.0 }
    );
    assert_eq!(
        actuators[1].kind(),
        &ActuatorKind::AddObject { template: outside, lifespan: 5.0 }
    );
}
