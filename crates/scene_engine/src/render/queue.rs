//! Render queue handed to the rasterizer
//!
//! Collects the drawable mesh slots of one frame, batched by material and
//! separated into opaque and transparent passes.

use super::MaterialBucket;
use crate::foundation::handles::{MaterialId, MeshId, ObjectId};
use crate::foundation::math::Mat4;

/// One drawable slot
#[derive(Debug, Clone, PartialEq)]
pub struct SlotInstance {
    /// Object drawing the mesh
    pub object: ObjectId,
    /// Mesh to draw
    pub mesh: MeshId,
    /// World matrix
    pub world: Mat4,
}

/// A batch of instances sharing the same material
#[derive(Debug, Clone)]
pub struct RenderBatch {
    /// Material used by all instances in this batch
    pub material: MaterialId,

    /// Instances in this batch
    pub instances: Vec<SlotInstance>,
}

impl RenderBatch {
    /// Create a new empty batch for a material
    pub fn new(material: MaterialId) -> Self {
        Self {
            material,
            instances: Vec::new(),
        }
    }

    /// Get the number of instances in this batch
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

/// Render queue for a frame
#[derive(Debug, Default)]
pub struct RenderQueue {
    /// Opaque batches
    opaque_batches: Vec<RenderBatch>,

    /// Transparent batches
    transparent_batches: Vec<RenderBatch>,
}

impl RenderQueue {
    /// Create an empty render queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a queue from buckets, keeping only unculled visible slots.
    ///
    /// Buckets without a drawable slot produce no batch.
    pub fn from_buckets<'a>(buckets: impl Iterator<Item = &'a MaterialBucket>) -> Self {
        let mut queue = Self::new();

        for bucket in buckets {
            let mut batch = RenderBatch::new(bucket.material());
            batch.instances.extend(
                bucket
                    .slots()
                    .iter()
                    .filter(|slot| slot.visible && !slot.culled)
                    .map(|slot| SlotInstance {
                        object: slot.object,
                        mesh: slot.mesh,
                        world: slot.world,
                    }),
            );

            if batch.instances.is_empty() {
                continue;
            }
            if bucket.is_transparent() {
                queue.transparent_batches.push(batch);
            } else {
                queue.opaque_batches.push(batch);
            }
        }

        queue
    }

    /// Get opaque batches
    pub fn opaque_batches(&self) -> &[RenderBatch] {
        &self.opaque_batches
    }

    /// Get transparent batches
    pub fn transparent_batches(&self) -> &[RenderBatch] {
        &self.transparent_batches
    }

    /// Get total number of instances in the queue
    pub fn total_instance_count(&self) -> usize {
        self.opaque_batches
            .iter()
            .chain(self.transparent_batches.iter())
            .map(RenderBatch::instance_count)
            .sum()
    }

    /// Get total number of batches
    pub fn batch_count(&self) -> usize {
        self.opaque_batches.len() + self.transparent_batches.len()
    }

    /// Whether any instance in the queue belongs to `object`
    pub fn contains_object(&self, object: ObjectId) -> bool {
        self.opaque_batches
            .iter()
            .chain(self.transparent_batches.iter())
            .any(|batch| batch.instances.iter().any(|i| i.object == object))
    }
}
