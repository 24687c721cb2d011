//! Visibility culling and render submission

use super::bounds::{Frustum, Intersection};
use super::game_scene::Scene;
use super::store::ListKind;
use crate::foundation::handles::ObjectId;
use crate::foundation::math::{Transform, Vec3};
use crate::render::{CameraView, Rasterizer};

impl Scene {
    /// View of `camera` as of the last scenegraph update
    pub fn camera_view(&self, camera: ObjectId) -> Option<CameraView> {
        let data = self.objects.get(camera)?.camera()?;
        let world = self.world_transform(camera)?;
        // Camera scale never distorts the view
        let placement = Transform::from_position_rotation(world.position, world.rotation);
        Some(CameraView {
            camera,
            view: placement.inverse_matrix(),
            projection: data.projection,
            position: world.position,
        })
    }

    /// Flag `object` culled or not for one camera.
    ///
    /// Invisible objects and objects without a node are left alone. With a
    /// non-zero `layer`, objects outside it are culled. Otherwise the object
    /// is visible if frustum culling is off, if the camera is inside its
    /// box, or if its bounding sphere (refined by the box on ambiguous
    /// results) is not outside the frustum.
    pub fn mark_visible(
        &mut self,
        object: ObjectId,
        frustum: &Frustum,
        camera_position: &Vec3,
        frustum_culling: bool,
        layer: u32,
    ) {
        let Some(obj) = self.objects.get(object) else {
            return;
        };
        let Some(node) = obj.node().and_then(|n| self.graph.get(n)) else {
            return;
        };
        if !obj.is_visible() {
            return;
        }
        let visible = if layer != 0 && obj.layer() & layer == 0 {
            false
        } else if !frustum_culling {
            true
        } else {
            let (world, bbox) = (node.world(), node.bbox());
            if bbox.contains_world_point(world, camera_position) {
                true
            } else {
                let (center, radius) = bbox.world_sphere(world);
                match frustum.sphere_inside(&center, radius) {
                    Intersection::Inside => true,
                    Intersection::Outside => false,
                    Intersection::Intersect => frustum.box_inside(&bbox.world_corners(world)) != Intersection::Outside,
                }
            }
        };
        if let Some(obj) = self.objects.get_mut(object) {
            obj.culled = !visible;
        }
    }

    /// Cull every active object against `camera`.
    ///
    /// Deformers refresh their bucket data first. With broad-phase culling
    /// enabled the physics environment reports visible objects; when it
    /// cannot, or culling is off, each object is tested on its own. Returns
    /// `false` without touching anything if `camera` is not a usable camera.
    pub fn calculate_visible_meshes(&mut self, camera: ObjectId, layer: u32) -> bool {
        let active: Vec<ObjectId> = self.lists.list(ListKind::Active).iter().collect();
        for object in &active {
            if let Some(deformer) = self.objects.get_mut(*object).and_then(|o| o.deformer.as_mut()) {
                deformer.update_buckets();
            }
        }

        let Some(view) = self.camera_view(camera) else {
            log::debug!("Object {} is not a camera, culling skipped", camera);
            return false;
        };
        let frustum = Frustum::from_matrix(&(view.projection * view.view));
        let frustum_culling = self
            .objects
            .get(camera)
            .and_then(|c| c.camera())
            .is_some_and(|c| c.frustum_culling)
            && !frustum.is_empty();

        let mut culled_by_broadphase = false;
        if self.config.broadphase_culling && frustum_culling {
            if let Some(environment) = self.physics.as_mut() {
                for object in &active {
                    if let Some(obj) = self.objects.get_mut(*object) {
                        obj.culled = true;
                    }
                }
                let mut reported = Vec::new();
                culled_by_broadphase = environment.cull(&frustum, &mut |object| reported.push(object));
                for object in reported {
                    if let Some(obj) = self.objects.get_mut(object) {
                        if obj.is_visible() && (layer == 0 || obj.layer() & layer != 0) {
                            obj.culled = false;
                        }
                    }
                }
            }
        }

        if !culled_by_broadphase {
            for object in active {
                self.mark_visible(object, &frustum, &view.position, frustum_culling, layer);
            }
        }
        true
    }

    /// Copy object state into the mesh slots and submit the buckets,
    /// running the draw callbacks around the submission
    pub fn render_buckets(&mut self, view: &CameraView, rasterizer: &mut dyn Rasterizer) {
        for object in self.lists.list(ListKind::Active).iter() {
            let Some(obj) = self.objects.get(object) else {
                continue;
            };
            let Some(world) = obj.node().and_then(|n| self.graph.world(n)) else {
                continue;
            };
            self.buckets
                .update_object(object, &world.to_matrix(), obj.is_culled(), obj.is_visible());
        }

        let queue = self.buckets.build_queue();
        for callback in &mut self.pre_draw {
            callback(view);
        }
        rasterizer.submit(view, &queue);
        for callback in &mut self.post_draw {
            callback(view);
        }
    }

    /// Flag every active object visible or culled for the active camera.
    ///
    /// Returns the camera's view, or `None` when the scene has no usable
    /// active camera, in which case nothing is culled.
    pub fn cull_active_camera(&mut self) -> Option<CameraView> {
        let Some(camera) = self.active_camera else {
            log::trace!("Scene '{}' has no active camera", self.name());
            return None;
        };
        if !self.calculate_visible_meshes(camera, 0) {
            return None;
        }
        self.camera_view(camera)
    }

    /// Cull against the active camera and submit; `false` when the scene
    /// has no usable active camera
    pub fn render(&mut self, rasterizer: &mut dyn Rasterizer) -> bool {
        let Some(view) = self.cull_active_camera() else {
            return false;
        };
        self.render_buckets(&view, rasterizer);
        true
    }
}
