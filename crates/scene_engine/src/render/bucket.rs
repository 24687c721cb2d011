//! Per-material render buckets

use std::collections::BTreeMap;

use super::{Material, Mesh, RenderQueue};
use crate::foundation::handles::{MaterialId, MeshId, ObjectId};
use crate::foundation::math::Mat4;

/// One object's use of one mesh/material pair
#[derive(Debug, Clone, PartialEq)]
pub struct MeshSlot {
    /// Object drawing the mesh
    pub object: ObjectId,
    /// Mesh being drawn
    pub mesh: MeshId,
    /// World matrix captured at the last bucket update
    pub world: Mat4,
    /// Culled for the current camera
    pub culled: bool,
    /// Object visibility flag
    pub visible: bool,
}

/// All slots drawn with one material
#[derive(Debug, Clone)]
pub struct MaterialBucket {
    material: MaterialId,
    transparent: bool,
    slots: Vec<MeshSlot>,
}

impl MaterialBucket {
    fn new(material: MaterialId, transparent: bool) -> Self {
        Self {
            material,
            transparent,
            slots: Vec::new(),
        }
    }

    /// Material of this bucket
    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Whether the bucket belongs to the transparent pass
    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    /// Slots in insertion order
    pub fn slots(&self) -> &[MeshSlot] {
        &self.slots
    }
}

/// Buckets of mesh slots keyed by material
#[derive(Debug, Default)]
pub struct BucketManager {
    buckets: BTreeMap<MaterialId, MaterialBucket>,
}

impl BucketManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the bucket for `material` if it does not exist yet
    pub fn register_material(&mut self, material: &Material) {
        self.buckets
            .entry(material.id)
            .or_insert_with(|| MaterialBucket::new(material.id, material.transparent));
    }

    /// Add one slot per material of `mesh` for `object`
    pub fn add_mesh_user(&mut self, object: ObjectId, mesh: &Mesh) {
        for material in &mesh.materials {
            let bucket = self
                .buckets
                .entry(*material)
                .or_insert_with(|| MaterialBucket::new(*material, false));
            bucket.slots.push(MeshSlot {
                object,
                mesh: mesh.id,
                world: Mat4::identity(),
                culled: true,
                visible: true,
            });
        }
    }

    /// Remove every slot of `object`, returning how many were removed
    pub fn remove_mesh_user(&mut self, object: ObjectId) -> usize {
        let mut removed = 0;
        for bucket in self.buckets.values_mut() {
            let before = bucket.slots.len();
            bucket.slots.retain(|slot| slot.object != object);
            removed += before - bucket.slots.len();
        }
        removed
    }

    /// Drop the bucket of `material` with all its slots
    pub fn remove_material(&mut self, material: MaterialId) -> bool {
        self.buckets.remove(&material).is_some()
    }

    /// Refresh the render state of every slot owned by `object`
    pub fn update_object(&mut self, object: ObjectId, world: &Mat4, culled: bool, visible: bool) {
        for bucket in self.buckets.values_mut() {
            for slot in bucket.slots.iter_mut().filter(|slot| slot.object == object) {
                slot.world = *world;
                slot.culled = culled;
                slot.visible = visible;
            }
        }
    }

    /// Move every bucket and slot of `other` into this manager
    pub fn merge(&mut self, other: BucketManager) {
        for (material, bucket) in other.buckets {
            match self.buckets.get_mut(&material) {
                Some(existing) => existing.slots.extend(bucket.slots),
                None => {
                    self.buckets.insert(material, bucket);
                }
            }
        }
    }

    /// Build the submission for this frame from the drawable slots
    pub fn build_queue(&self) -> RenderQueue {
        RenderQueue::from_buckets(self.buckets.values())
    }

    /// Iterate over all buckets
    pub fn buckets(&self) -> impl Iterator<Item = &MaterialBucket> {
        self.buckets.values()
    }

    /// Number of buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of slots across all buckets
    pub fn slot_count(&self) -> usize {
        self.buckets.values().map(|b| b.slots.len()).sum()
    }

    /// Slots belonging to `object`
    pub fn slots_of(&self, object: ObjectId) -> usize {
        self.buckets
            .values()
            .flat_map(|b| b.slots.iter())
            .filter(|slot| slot.object == object)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_user_creates_slot_per_material() {
        let glass = Material::new("glass").with_transparency(true);
        let steel = Material::new("steel");
        let mesh = Mesh::new("window", vec![glass.id, steel.id]);

        let mut manager = BucketManager::new();
        manager.register_material(&glass);
        manager.register_material(&steel);

        let object = ObjectId::next();
        manager.add_mesh_user(object, &mesh);
        assert_eq!(manager.slot_count(), 2);

        // Slots start culled until the first visibility pass
        assert_eq!(manager.build_queue().total_instance_count(), 0);

        manager.update_object(object, &Mat4::identity(), false, true);
        let queue = manager.build_queue();
        assert_eq!(queue.opaque_batches().len(), 1);
        assert_eq!(queue.transparent_batches().len(), 1);

        assert_eq!(manager.remove_mesh_user(object), 2);
        assert_eq!(manager.slot_count(), 0);
    }

    #[test]
    fn test_merge_appends_slots_into_shared_bucket() {
        let material = Material::new("shared");
        let mesh = Mesh::new("cube", vec![material.id]);

        let mut recipient = BucketManager::new();
        recipient.add_mesh_user(ObjectId::next(), &mesh);

        let mut donor = BucketManager::new();
        donor.add_mesh_user(ObjectId::next(), &mesh);
        donor.register_material(&Material::new("other"));

        recipient.merge(donor);
        assert_eq!(recipient.bucket_count(), 2);
        assert_eq!(recipient.slot_count(), 2);
    }
}
