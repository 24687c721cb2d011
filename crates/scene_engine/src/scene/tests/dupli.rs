use super::*;
use approx::assert_relative_eq;
use crate::foundation::math::Quat;

fn host(scene: &mut Scene, group: Arc<GroupDef>, transform: Transform) -> ObjectId {
    let host = scene.add_object(
        GameObject::new("host", ObjectKind::Empty)
            .with_asset(AssetId(50))
            .with_transform(transform)
            .with_dupli_group(group),
        None,
        true,
    );
    scene.update_parents(0.0);
    host
}

#[test]
fn test_mutually_nested_groups_stop_at_depth_bound() {
    let mut config = SceneConfig::default();
    config.max_dupli_recursion = 3;
    let mut scene = scene_with(config);

    let group_a = Arc::new(GroupDef::new("a").with_member(AssetId(10)));
    let group_b = Arc::new(GroupDef::new("b").with_member(AssetId(20)));
    scene.add_object(
        GameObject::new("in_a", ObjectKind::Empty)
            .with_asset(AssetId(10))
            .with_dupli_group(Arc::clone(&group_b)),
        None,
        false,
    );
    scene.add_object(
        GameObject::new("in_b", ObjectKind::Empty)
            .with_asset(AssetId(20))
            .with_dupli_group(Arc::clone(&group_a)),
        None,
        false,
    );
    let host = host(&mut scene, group_a, Transform::identity());

    scene.dupli_group_recurse(host, 0);

    // Levels 0 through 3 each add one member; level 4 is refused
    assert_eq!(scene.object_list().len(), 1 + 4);
}

#[test]
fn test_member_placement_composes_group_transform() {
    let mut scene = scene();
    let group = Arc::new(
        GroupDef::new("tower")
            .with_member(AssetId(30))
            .with_offset(Vec3::new(1.0, 0.0, 0.0)),
    );
    scene.add_object(
        GameObject::new("block", ObjectKind::Mesh)
            .with_asset(AssetId(30))
            .with_transform(at(3.0, 0.0, 0.0)),
        None,
        false,
    );
    let host = host(
        &mut scene,
        group,
        Transform {
            position: Vec3::new(10.0, 0.0, 0.0),
            rotation: Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_2),
            scale: Vec3::new(2.0, 2.0, 2.0),
        },
    );

    scene.dupli_group_recurse(host, 0);

    let instances = scene.object(host).expect("host").instance_objects().to_vec();
    assert_eq!(instances.len(), 1);
    let world = scene.world_transform(instances[0]).expect("world");
    assert_relative_eq!(world.position, Vec3::new(10.0, 4.0, 0.0), epsilon = 1.0e-5);
    assert_relative_eq!(world.scale, Vec3::new(2.0, 2.0, 2.0));
}

#[test]
fn test_instances_link_back_and_die_with_the_group_object() {
    let mut scene = scene();
    let group = Arc::new(GroupDef::new("props").with_member(AssetId(30)).with_member(AssetId(31)));
    scene.add_object(GameObject::new("barrel", ObjectKind::Mesh).with_asset(AssetId(30)), None, false);
    scene.add_object(GameObject::new("crate", ObjectKind::Mesh).with_asset(AssetId(31)), None, false);
    let host = host(&mut scene, group, Transform::identity());

    scene.dupli_group_recurse(host, 0);
    let instances = scene.object(host).expect("host").instance_objects().to_vec();
    assert_eq!(instances.len(), 2);
    for instance in &instances {
        assert_eq!(scene.object(*instance).and_then(GameObject::dupli_group_object), Some(host));
    }

    scene.delayed_remove_object(host);
    assert_eq!(scene.euthanasia_list().len(), 3);
    scene.logic_end_frame();
    assert!(scene.object_list().is_empty());
}

#[test]
fn test_removing_an_instance_unlinks_it_from_the_group_object() {
    let mut scene = scene();
    let group = Arc::new(GroupDef::new("props").with_member(AssetId(30)));
    scene.add_object(GameObject::new("barrel", ObjectKind::Mesh).with_asset(AssetId(30)), None, false);
    let host = host(&mut scene, group, Transform::identity());
    scene.dupli_group_recurse(host, 0);
    let instance = scene.object(host).expect("host").instance_objects()[0];

    scene.delayed_remove_object(instance);
    scene.logic_end_frame();
    assert!(scene.object(host).expect("host").instance_objects().is_empty());
}

#[test]
fn test_members_outside_group_layers_are_skipped() {
    let mut scene = scene();
    let group = Arc::new(
        GroupDef::new("hidden")
            .with_layered_member(AssetId(30), 0b01)
            .with_layered_member(AssetId(31), 0b10)
            .with_layer_mask(0b10),
    );
    scene.add_object(GameObject::new("skipped", ObjectKind::Mesh).with_asset(AssetId(30)), None, false);
    let kept = scene.add_object(GameObject::new("kept", ObjectKind::Mesh).with_asset(AssetId(31)), None, false);
    let host = host(&mut scene, group, Transform::identity());

    scene.dupli_group_recurse(host, 0);
    let instances = scene.object(host).expect("host").instance_objects().to_vec();
    assert_eq!(instances.len(), 1);
    assert_eq!(scene.object(instances[0]).map(GameObject::name), Some("kept"));
    assert_ne!(instances[0], kept);
}

#[test]
fn test_member_children_come_along_with_their_parent() {
    let mut scene = scene();
    let group = Arc::new(GroupDef::new("lamp_post").with_member(AssetId(30)).with_member(AssetId(31)));
    let post = scene.add_object(GameObject::new("post", ObjectKind::Mesh).with_asset(AssetId(30)), None, false);
    scene.add_object(
        GameObject::new("bulb", ObjectKind::Light)
            .with_asset(AssetId(31))
            .with_transform(at(0.0, 0.0, 3.0)),
        Some(post),
        false,
    );
    let host = host(&mut scene, group, at(0.0, 5.0, 0.0));

    scene.dupli_group_recurse(host, 0);

    // One post replica carrying one bulb replica, not a second loose bulb
    assert_eq!(scene.object_list().len(), 3);
    assert_eq!(scene.light_list().len(), 1);
    let bulb = scene.light_list().get(0).expect("bulb");
    let world = scene.world_transform(bulb).expect("world");
    assert_relative_eq!(world.position, Vec3::new(0.0, 5.0, 3.0), epsilon = 1.0e-5);
}

#[test]
fn test_replicating_a_group_template_instantiates_its_group() {
    let mut scene = scene();
    let group = Arc::new(GroupDef::new("props").with_member(AssetId(30)));
    scene.add_object(GameObject::new("barrel", ObjectKind::Mesh).with_asset(AssetId(30)), None, false);
    let template = scene.add_object(
        GameObject::new("spawn_point", ObjectKind::Empty).with_dupli_group(group),
        None,
        false,
    );

    let replica = scene.add_replica_object(template, None, 0.0).expect("replica");
    assert_eq!(scene.object_list().len(), 2);
    assert!(scene.object_list().contains(replica));
}
