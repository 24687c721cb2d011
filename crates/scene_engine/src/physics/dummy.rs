//! Physics environment for scenes without a physics engine

use super::{CollisionCallback, CollisionData, CollisionResponse, PhysicsEnvironment};
use crate::foundation::handles::{EnvironmentId, ObjectId};
use crate::foundation::math::Vec3;
use crate::scene::bounds::Frustum;

/// Environment that simulates nothing.
///
/// It keeps gravity and callbacks so scenes behave the same with or without a
/// real engine, and lets a host report collisions by hand.
pub struct DummyPhysicsEnvironment {
    id: EnvironmentId,
    gravity: Vec3,
    callbacks: Vec<(CollisionResponse, CollisionCallback)>,
}

impl Default for DummyPhysicsEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyPhysicsEnvironment {
    /// Create an environment with standard gravity
    pub fn new() -> Self {
        Self {
            id: EnvironmentId::next(),
            gravity: Vec3::new(0.0, 0.0, -9.81),
            callbacks: Vec::new(),
        }
    }

    /// Number of registered callbacks
    pub fn callback_count(&self) -> usize {
        self.callbacks.len()
    }

    /// Deliver a collision to the registered callbacks.
    ///
    /// Broad-phase filters run first; if any rejects the pair the object and
    /// sensor callbacks are skipped. Returns whether the pair was delivered.
    pub fn report_collision(&mut self, data: &CollisionData) -> bool {
        let accepted = self
            .callbacks
            .iter_mut()
            .filter(|(response, _)| *response == CollisionResponse::Broadphase)
            .all(|(_, callback)| callback(data));
        if !accepted {
            return false;
        }

        for (response, callback) in &mut self.callbacks {
            if *response != CollisionResponse::Broadphase {
                callback(data);
            }
        }
        true
    }
}

impl PhysicsEnvironment for DummyPhysicsEnvironment {
    fn id(&self) -> EnvironmentId {
        self.id
    }

    fn add_collision_callback(&mut self, response: CollisionResponse, callback: CollisionCallback) {
        self.callbacks.push((response, callback));
    }

    fn gravity(&self) -> Vec3 {
        self.gravity
    }

    fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    fn cull(&mut self, _frustum: &Frustum, _visitor: &mut dyn FnMut(ObjectId)) -> bool {
        false
    }

    fn merge_environment(&mut self, _other: Box<dyn PhysicsEnvironment>) {
        // No bodies to absorb; the donor's callbacks are dropped with it
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_broadphase_filter_blocks_delivery() {
        let mut env = DummyPhysicsEnvironment::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        env.add_collision_callback(
            CollisionResponse::Object,
            Box::new(move |_| {
                h.fetch_add(1, Ordering::SeqCst);
                true
            }),
        );
        env.add_collision_callback(CollisionResponse::Broadphase, Box::new(|data| data.first != data.second));

        let a = ObjectId::next();
        let b = ObjectId::next();
        assert!(env.report_collision(&CollisionData::new(a, b)));
        assert!(!env.report_collision(&CollisionData::new(a, a)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
