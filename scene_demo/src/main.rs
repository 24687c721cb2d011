//! Spawner demo
//!
//! Runs a headless scene: a turret fires timed bullets from an inactive
//! template while an asteroid belt library loads in the background and is
//! merged into the running scene.

use std::sync::Arc;

use rand::Rng;
use scene_engine::foundation::logging;
use scene_engine::prelude::*;
use scene_engine::scene::CameraData;
use thiserror::Error;

const FRAME_STEP: f64 = 1.0 / 60.0;
const FRAMES: u32 = 240;
const FIRE_INTERVAL: u32 = 15;
const BULLET_LIFESPAN: f32 = 45.0;
const BELT_LIBRARY: &str = "libraries/asteroid_belt.lib";

#[derive(Error, Debug)]
enum DemoError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("scene '{0}' is missing")]
    MissingScene(&'static str),
}

/// Asteroid belt generated on request instead of read from disk
struct BeltSource {
    rocks: usize,
}

impl AssetSource for BeltSource {
    fn can_open(&self, path: &str) -> bool {
        path == BELT_LIBRARY
    }

    fn scene_names(&self, _path: &str) -> Vec<String> {
        vec!["inner_belt".to_string(), "outer_belt".to_string()]
    }

    fn convert_scene(&self, _path: &str, name: &str, config: &SceneConfig, _options: LoadOptions) -> Option<Scene> {
        let mut rng = rand::thread_rng();
        let radius = if name == "inner_belt" { 20.0 } else { 40.0 };
        let mut scene = Scene::new(name, config.clone());
        let rock = scene.add_material(Material::new("rock"));
        let mesh = scene.add_mesh(Mesh::new(format!("{name}_asteroid"), vec![rock]).with_asset(AssetId(1000)));

        for index in 0..self.rocks {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let position = Vec3::new(angle.cos() * radius, angle.sin() * radius, rng.gen_range(-2.0..2.0));
            let asset = AssetId(1001 + u32::try_from(index).unwrap_or(u32::MAX - 1001));
            scene.add_object(
                GameObject::new(format!("{name}_{index}"), ObjectKind::Mesh)
                    .with_asset(asset)
                    .with_mesh(Arc::clone(&mesh))
                    .with_transform(Transform {
                        position,
                        ..Transform::identity()
                    }),
                None,
                true,
            );
        }
        Some(scene)
    }

    fn meshes(&self, _path: &str) -> Vec<Mesh> {
        Vec::new()
    }

    fn actions(&self, _path: &str) -> Vec<Action> {
        Vec::new()
    }
}

/// Build the camera, the turret and the bullet template
fn populate(scene: &mut Scene) -> (ObjectId, ObjectId) {
    let metal = scene.add_material(Material::new("metal"));
    let bullet_mesh = scene.add_mesh(Mesh::new("bullet", vec![metal]));

    scene.add_object(
        GameObject::new(
            "camera",
            ObjectKind::Camera(CameraData::perspective(16.0 / 9.0, std::f32::consts::FRAC_PI_3, 0.1, 200.0)),
        )
        .with_transform(Transform {
            position: Vec3::new(0.0, 0.0, 60.0),
            ..Transform::identity()
        }),
        None,
        true,
    );
    let turret = scene.add_object(GameObject::new("turret", ObjectKind::Empty), None, true);
    let bullet = scene.add_object(GameObject::new("bullet", ObjectKind::Mesh).with_mesh(bullet_mesh), None, false);
    (turret, bullet)
}

fn run() -> Result<(), DemoError> {
    let config = EngineConfig::default();
    logging::init_with_config(&config.logging);
    log::info!("Starting spawner demo");

    let mut engine = Engine::new(config, Arc::new(BeltSource { rocks: 24 }), Box::new(NullRasterizer::default()))?;
    engine.create_scene("space");
    let (turret, bullet) = {
        let scene = engine.scene_mut("space").ok_or(DemoError::MissingScene("space"))?;
        populate(scene)
    };

    let status = engine.link_library(BELT_LIBRARY, "Scene", "space", LoadOptions::ASYNC | LoadOptions::VERBOSE)?;

    for frame in 0..FRAMES {
        if frame % FIRE_INTERVAL == 0 {
            let scene = engine.scene_mut("space").ok_or(DemoError::MissingScene("space"))?;
            let heading = Quat::from_axis_angle(&Vec3::z_axis(), f64::from(frame).to_radians() as f32);
            scene.set_local_orientation(turret, heading);
            if scene.add_replica_object(bullet, Some(turret), BULLET_LIFESPAN).is_none() {
                log::warn!("Bullet template is gone");
            }
        }

        let stats = engine.next_frame(FRAME_STEP);
        if frame % 60 == 0 {
            let scene = engine.scene("space").ok_or(DemoError::MissingScene("space"))?;
            log::info!(
                "Frame {}: {} objects, {} bullets in flight, belt {:.0}%, {} nodes updated",
                frame,
                scene.object_list().len(),
                scene.temp_list().len(),
                status.progress() * 100.0,
                stats.nodes_updated
            );
        }
    }

    engine.finalize_async_loads();
    let scene = engine.scene("space").ok_or(DemoError::MissingScene("space"))?;
    log::info!(
        "Belt loaded in {:.3}s, scene holds {} objects ({} zombies)",
        status.time_taken().as_secs_f64(),
        scene.object_list().len(),
        scene.zombie_count()
    );

    engine.free_library(BELT_LIBRARY)?;
    let scene = engine.scene("space").ok_or(DemoError::MissingScene("space"))?;
    log::info!("Belt freed, {} objects left", scene.object_list().len());
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        log::error!("Spawner demo failed: {}", err);
        std::process::exit(1);
    }
}
