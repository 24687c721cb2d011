//! Render submission boundary
//!
//! The scene core never issues draw calls. Each frame it updates the mesh
//! slots of every visible object inside per-material buckets and hands the
//! resulting [`RenderQueue`] to an external [`Rasterizer`].
//!
//! ```text
//! GameObject ──(mesh users)──▶ BucketManager ──(unculled slots)──▶ RenderQueue ──▶ Rasterizer
//! ```

mod assets;
mod bucket;
mod queue;

pub use assets::{Material, Mesh};
pub use bucket::{BucketManager, MaterialBucket, MeshSlot};
pub use queue::{RenderBatch, RenderQueue, SlotInstance};

use crate::foundation::handles::ObjectId;
use crate::foundation::math::{Mat4, Vec3};

/// Camera state for one submission
#[derive(Debug, Clone, PartialEq)]
pub struct CameraView {
    /// Camera object
    pub camera: ObjectId,
    /// World-to-view matrix
    pub view: Mat4,
    /// View-to-clip matrix
    pub projection: Mat4,
    /// Camera world position
    pub position: Vec3,
}

/// External render backend
pub trait Rasterizer {
    /// Draw the finalized buckets for one camera
    fn submit(&mut self, view: &CameraView, queue: &RenderQueue);
}

/// Rasterizer that draws nothing and remembers what it was given
#[derive(Debug, Default)]
pub struct NullRasterizer {
    /// Submissions received so far
    pub submissions: usize,
    /// Instance count of the most recent submission
    pub last_instance_count: usize,
}

impl Rasterizer for NullRasterizer {
    fn submit(&mut self, _view: &CameraView, queue: &RenderQueue) {
        self.submissions += 1;
        self.last_instance_count = queue.total_instance_count();
        log::trace!(
            "Null rasterizer: {} batches, {} instances",
            queue.batch_count(),
            self.last_instance_count
        );
    }
}
