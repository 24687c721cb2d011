//! Event managers
//!
//! Each sensor kind is served by one event manager. The basic, keyboard and
//! mouse managers only keep the set of registered sensors; the keyboard and
//! mouse sensors read an [`InputState`] snapshot injected by the input layer.
//! The timer manager advances timer properties by the frame step.

use std::collections::HashSet;

use super::brick::{KeyCode, MouseButton, SensorRef};
use crate::foundation::handles::ObjectId;
use crate::scene::object::PropertyValue;
use crate::scene::store::ObjectStore;

/// Event manager families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventManagerKind {
    /// Always and property sensors
    Basic,
    /// Keyboard sensors
    Keyboard,
    /// Mouse sensors
    Mouse,
    /// Timer properties
    Timer,
    /// Collision sensors
    Collision,
}

/// Input snapshot produced by the external input layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputState {
    keys: HashSet<KeyCode>,
    buttons: HashSet<MouseButton>,
}

impl InputState {
    /// Mark a key as held
    pub fn press_key(&mut self, key: KeyCode) {
        self.keys.insert(key);
    }

    /// Mark a key as released
    pub fn release_key(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    /// Whether a key is held
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    /// Mark a mouse button as held
    pub fn press_button(&mut self, button: MouseButton) {
        self.buttons.insert(button);
    }

    /// Mark a mouse button as released
    pub fn release_button(&mut self, button: MouseButton) {
        self.buttons.remove(&button);
    }

    /// Whether a mouse button is held
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }
}

/// Sensors registered with one event manager, in registration order
#[derive(Debug, Default, Clone)]
pub struct SensorRegistry {
    sensors: Vec<SensorRef>,
}

impl SensorRegistry {
    /// Register a sensor; duplicates are ignored
    pub fn register(&mut self, sensor: SensorRef) {
        if !self.sensors.contains(&sensor) {
            self.sensors.push(sensor);
        }
    }

    /// Unregister a sensor
    pub fn remove(&mut self, sensor: SensorRef) -> bool {
        let before = self.sensors.len();
        self.sensors.retain(|s| *s != sensor);
        before != self.sensors.len()
    }

    /// Whether `sensor` is registered
    pub fn contains(&self, sensor: SensorRef) -> bool {
        self.sensors.contains(&sensor)
    }

    /// Registered sensors
    pub fn sensors(&self) -> &[SensorRef] {
        &self.sensors
    }

    /// Number of registered sensors
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    /// Whether no sensor is registered
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

/// Advances timer properties once per logic frame
#[derive(Debug, Default, Clone)]
pub struct TimeEventManager {
    properties: Vec<(ObjectId, String)>,
}

impl TimeEventManager {
    /// Track a timer property
    pub fn add_time_property(&mut self, object: ObjectId, name: impl Into<String>) {
        let name = name.into();
        if !self.properties.iter().any(|(o, n)| *o == object && *n == name) {
            self.properties.push((object, name));
        }
    }

    /// Stop tracking one timer property
    pub fn remove_time_property(&mut self, object: ObjectId, name: &str) {
        self.properties.retain(|(o, n)| !(*o == object && n == name));
    }

    /// Stop tracking every timer property of `object`
    pub fn remove_object(&mut self, object: ObjectId) -> usize {
        let before = self.properties.len();
        self.properties.retain(|(o, _)| *o != object);
        before - self.properties.len()
    }

    /// Number of tracked properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Add `step` seconds to every tracked timer
    pub fn next_frame(&self, objects: &mut ObjectStore, step: f64) {
        for (object, name) in &self.properties {
            if let Some(PropertyValue::Timer(value)) =
                objects.get_mut(*object).and_then(|o| o.property_mut(name))
            {
                *value += step;
            }
        }
    }

    /// Take over every timer tracked by `other`
    pub fn merge(&mut self, other: TimeEventManager) {
        for (object, name) in other.properties {
            self.add_time_property(object, name);
        }
    }
}
