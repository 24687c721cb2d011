//! Collision event manager
//!
//! The physics engine reports contacts through callbacks registered for the
//! object, sensor and broad-phase responses. The callbacks only push a
//! [`CollisionPair`] onto a channel; pairs are de-duplicated and dispatched to
//! collision sensors in [`CollisionEventManager::next_frame`], then cleared.

use std::collections::BTreeSet;

use crossbeam::channel::{unbounded, Receiver, Sender};

use super::brick::{SensorKind, SensorRef};
use super::events::SensorRegistry;
use crate::foundation::handles::ObjectId;
use crate::physics::{CollisionCallback, CollisionResponse, PhysicsEnvironment};
use crate::scene::store::ObjectStore;

/// Two objects in contact (always stores the smaller handle first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionPair {
    /// Smaller handle
    pub first: ObjectId,
    /// Larger handle
    pub second: ObjectId,
}

impl CollisionPair {
    /// Create a new collision pair in canonical order
    pub fn new(a: ObjectId, b: ObjectId) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// The other member of the pair, if `object` is one of them
    pub fn other(&self, object: ObjectId) -> Option<ObjectId> {
        if self.first == object {
            Some(self.second)
        } else if self.second == object {
            Some(self.first)
        } else {
            None
        }
    }
}

/// Records collision pairs and feeds them to collision sensors
pub struct CollisionEventManager {
    sender: Sender<CollisionPair>,
    receiver: Receiver<CollisionPair>,
    sensors: SensorRegistry,
    pairs: BTreeSet<CollisionPair>,
}

impl Default for CollisionEventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionEventManager {
    /// Create a manager with an empty pair set
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            sensors: SensorRegistry::default(),
            pairs: BTreeSet::new(),
        }
    }

    /// Callback recording every reported pair
    pub fn callback(&self) -> CollisionCallback {
        let sender = self.sender.clone();
        Box::new(move |data| {
            sender.send(CollisionPair::new(data.first, data.second)).is_ok()
        })
    }

    /// Register the object, sensor and broad-phase callbacks with `env`
    pub fn register_with(&self, env: &mut dyn PhysicsEnvironment) {
        env.add_collision_callback(CollisionResponse::Object, self.callback());
        env.add_collision_callback(CollisionResponse::Sensor, self.callback());
        env.add_collision_callback(
            CollisionResponse::Broadphase,
            Box::new(|data| data.first != data.second),
        );
    }

    /// Register a collision sensor
    pub fn register_sensor(&mut self, sensor: SensorRef) {
        self.sensors.register(sensor);
    }

    /// Unregister a collision sensor
    pub fn remove_sensor(&mut self, sensor: SensorRef) -> bool {
        self.sensors.remove(sensor)
    }

    /// Registered collision sensors
    pub fn sensors(&self) -> &SensorRegistry {
        &self.sensors
    }

    /// Pull reported pairs off the channel; returns the pending count
    pub fn collect(&mut self) -> usize {
        self.pairs.extend(self.receiver.try_iter());
        self.pairs.len()
    }

    /// Pairs waiting for dispatch
    pub fn pending_pairs(&self) -> &BTreeSet<CollisionPair> {
        &self.pairs
    }

    /// Dispatch pending pairs to every collision sensor, then clear them
    pub fn next_frame(&mut self, objects: &mut ObjectStore) {
        self.collect();

        for sensor in self.sensors.sensors() {
            let hits: Vec<ObjectId> = self
                .pairs
                .iter()
                .filter_map(|pair| pair.other(sensor.object))
                .collect();

            let Some(owner) = objects.get(sensor.object) else {
                continue;
            };
            let filter = match owner.sensors.get(sensor.index).map(|s| &s.kind) {
                Some(SensorKind::Collision { property, .. }) => property.clone(),
                _ => continue,
            };
            let hits: Vec<ObjectId> = hits
                .into_iter()
                .filter(|hit| match &filter {
                    Some(name) => objects.get(*hit).is_some_and(|o| o.property(name).is_some()),
                    None => true,
                })
                .collect();

            if let Some(SensorKind::Collision { hits: slot, .. }) = objects
                .get_mut(sensor.object)
                .and_then(|o| o.sensors.get_mut(sensor.index))
                .map(|s| &mut s.kind)
            {
                *slot = hits;
            }
        }

        self.pairs.clear();
    }

    /// Take over the pairs a donor manager recorded but never dispatched
    pub fn merge(&mut self, mut other: CollisionEventManager) {
        other.collect();
        self.pairs.append(&mut other.pairs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{CollisionData, DummyPhysicsEnvironment};

    #[test]
    fn test_pair_is_canonical() {
        let a = ObjectId::next();
        let b = ObjectId::next();
        assert_eq!(CollisionPair::new(a, b), CollisionPair::new(b, a));
        assert_eq!(CollisionPair::new(a, b).other(b), Some(a));
        assert_eq!(CollisionPair::new(a, b).other(ObjectId::next()), None);
    }

    #[test]
    fn test_reported_pairs_are_deduplicated() {
        let mut env = DummyPhysicsEnvironment::new();
        let mut manager = CollisionEventManager::new();
        manager.register_with(&mut env);

        let a = ObjectId::next();
        let b = ObjectId::next();
        env.report_collision(&CollisionData::new(a, b));
        env.report_collision(&CollisionData::new(b, a));
        env.report_collision(&CollisionData::new(a, a));

        assert_eq!(manager.collect(), 1);
    }
}
