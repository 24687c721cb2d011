//! Logic bricks and their dispatch
//!
//! Every game object carries ordered lists of sensors, controllers and
//! actuators. Controllers link to sensors and actuators by [`SensorRef`] /
//! [`ActuatorRef`] (owner object + position in the owner's list), which is
//! what lets replication rewire links by position instead of by name.
//!
//! Per frame the [`LogicManager`] asks each event manager which sensors
//! changed, runs the controllers listening to them, and turns the fired
//! actuators into [`ActuatorCommand`]s the scene applies afterwards.

mod brick;
mod collision;
mod events;
mod manager;

pub use brick::{
    Actuator, ActuatorCommand, ActuatorKind, ActuatorRef, Controller, ControllerKind, ControllerRef,
    KeyCode, MouseButton, Sensor, SensorKind, SensorRef,
};
pub use collision::{CollisionEventManager, CollisionPair};
pub use events::{EventManagerKind, InputState, SensorRegistry, TimeEventManager};
pub use manager::LogicManager;
