//! Per-scene logic manager

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::brick::{ActuatorCommand, ActuatorRef, ControllerRef, SensorRef};
use super::collision::CollisionEventManager;
use super::events::{EventManagerKind, InputState, SensorRegistry, TimeEventManager};
use crate::foundation::handles::ObjectId;
use crate::scene::store::ObjectStore;

/// Owns the event managers and the sensor/actuator link registries of one scene
#[derive(Default)]
pub struct LogicManager {
    sensor_links: HashMap<SensorRef, Vec<ControllerRef>>,
    actuator_links: HashMap<ActuatorRef, Vec<ControllerRef>>,
    basic: SensorRegistry,
    keyboard: SensorRegistry,
    mouse: SensorRegistry,
    time: TimeEventManager,
    collision: CollisionEventManager,
    input: InputState,
    current_time: f64,
    frame_step: f64,
}

impl LogicManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sensor with the event manager serving `kind`
    pub fn register_sensor(&mut self, sensor: SensorRef, kind: EventManagerKind) {
        match kind {
            EventManagerKind::Basic => self.basic.register(sensor),
            EventManagerKind::Keyboard => self.keyboard.register(sensor),
            EventManagerKind::Mouse => self.mouse.register(sensor),
            EventManagerKind::Collision => self.collision.register_sensor(sensor),
            EventManagerKind::Timer => {
                log::error!("Sensor {:?} cannot be registered with the timer manager", sensor);
            }
        }
    }

    /// Whether `sensor` is registered with any event manager
    pub fn is_sensor_registered(&self, sensor: SensorRef) -> bool {
        self.basic.contains(sensor)
            || self.keyboard.contains(sensor)
            || self.mouse.contains(sensor)
            || self.collision.sensors().contains(sensor)
    }

    /// Record that `controller` listens to `sensor`
    pub fn register_to_sensor(&mut self, controller: ControllerRef, sensor: SensorRef) {
        let listeners = self.sensor_links.entry(sensor).or_default();
        if !listeners.contains(&controller) {
            listeners.push(controller);
        }
    }

    /// Record that `controller` drives `actuator`
    pub fn register_to_actuator(&mut self, controller: ControllerRef, actuator: ActuatorRef) {
        let drivers = self.actuator_links.entry(actuator).or_default();
        if !drivers.contains(&controller) {
            drivers.push(controller);
        }
    }

    /// Controllers listening to `sensor`
    pub fn sensor_listeners(&self, sensor: SensorRef) -> &[ControllerRef] {
        self.sensor_links.get(&sensor).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Controllers driving `actuator`
    pub fn actuator_drivers(&self, actuator: ActuatorRef) -> &[ControllerRef] {
        self.actuator_links.get(&actuator).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Unregister a sensor everywhere; returns the controllers that listened to it
    pub fn remove_sensor(&mut self, sensor: SensorRef) -> Vec<ControllerRef> {
        self.basic.remove(sensor);
        self.keyboard.remove(sensor);
        self.mouse.remove(sensor);
        self.collision.remove_sensor(sensor);
        self.sensor_links.remove(&sensor).unwrap_or_default()
    }

    /// Unregister an actuator; returns the controllers that drove it
    pub fn remove_actuator(&mut self, actuator: ActuatorRef) -> Vec<ControllerRef> {
        self.actuator_links.remove(&actuator).unwrap_or_default()
    }

    /// Drop `controller` from every link list
    pub fn remove_controller(&mut self, controller: ControllerRef) {
        for listeners in self.sensor_links.values_mut() {
            listeners.retain(|c| *c != controller);
        }
        for drivers in self.actuator_links.values_mut() {
            drivers.retain(|c| *c != controller);
        }
    }

    /// Timer manager
    pub fn time_manager(&mut self) -> &mut TimeEventManager {
        &mut self.time
    }

    /// Collision event manager
    pub fn collision_manager(&self) -> &CollisionEventManager {
        &self.collision
    }

    /// Mutable collision event manager
    pub fn collision_manager_mut(&mut self) -> &mut CollisionEventManager {
        &mut self.collision
    }

    /// Replace the input snapshot read by keyboard and mouse sensors
    pub fn set_input(&mut self, input: InputState) {
        self.input = input;
    }

    /// Mutable input snapshot
    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// Number of sensors registered with `kind`
    pub fn registered_sensor_count(&self, kind: EventManagerKind) -> usize {
        match kind {
            EventManagerKind::Basic => self.basic.len(),
            EventManagerKind::Keyboard => self.keyboard.len(),
            EventManagerKind::Mouse => self.mouse.len(),
            EventManagerKind::Collision => self.collision.sensors().len(),
            EventManagerKind::Timer => self.time.len(),
        }
    }

    /// Start a logic frame
    pub fn begin_frame(&mut self, current_time: f64, frame_step: f64) {
        self.current_time = current_time;
        self.frame_step = frame_step;
    }

    /// Time passed to the last [`LogicManager::begin_frame`]
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Run every event manager, fire the triggered controllers and collect
    /// the commands of the actuators they activated
    pub fn update_frame(&mut self, objects: &mut ObjectStore) -> Vec<ActuatorCommand> {
        self.time.next_frame(objects, self.frame_step);
        self.collision.next_frame(objects);

        let mut triggered: Vec<ControllerRef> = Vec::new();
        let registries = [&self.basic, &self.keyboard, &self.mouse, self.collision.sensors()];
        for sensor in registries.iter().flat_map(|r| r.sensors()) {
            let Some(owner) = objects.get_mut(sensor.object) else {
                continue;
            };
            if owner.is_suspended() {
                continue;
            }
            let (sensors, properties) = owner.sensors_and_properties_mut();
            let Some(brick) = sensors.get_mut(sensor.index) else {
                log::error!("Registered sensor {:?} does not exist", sensor);
                continue;
            };
            if brick.evaluate(&self.input, properties) {
                triggered.extend(self.sensor_listeners(*sensor).iter().copied());
            }
        }

        // Controllers of older replication generations run first
        let mut ordered: BTreeSet<(u32, i32, ControllerRef)> = BTreeSet::new();
        for controller in triggered {
            if let Some(brick) = objects.get(controller.object).and_then(|o| o.controllers.get(controller.index)) {
                let (generation, priority) = brick.execution_order();
                ordered.insert((generation, priority, controller));
            }
        }

        let mut activations: BTreeMap<ActuatorRef, bool> = BTreeMap::new();
        for (_, _, controller) in ordered {
            let Some(brick) = objects.get(controller.object).and_then(|o| o.controllers.get(controller.index)) else {
                continue;
            };
            let inputs: Vec<bool> = brick
                .linked_sensors()
                .iter()
                .map(|s| {
                    objects
                        .get(s.object)
                        .and_then(|o| o.sensors.get(s.index))
                        .is_some_and(|sensor| sensor.is_positive())
                })
                .collect();
            let fire = brick.kind().evaluate(&inputs);
            for actuator in brick.linked_actuators() {
                *activations.entry(*actuator).or_insert(false) |= fire;
            }
        }

        activations
            .into_iter()
            .filter(|(_, positive)| *positive)
            .filter_map(|(actuator, _)| {
                objects
                    .get(actuator.object)
                    .and_then(|o| o.actuators.get(actuator.index))
                    .and_then(|a| a.command())
            })
            .collect()
    }

    /// End a logic frame
    pub fn end_frame(&mut self) {
        log::trace!("Logic frame at {:.3}s finished", self.current_time);
    }

    /// Take over the link registries, timer list and pending collisions of
    /// a donor scene.
    ///
    /// Sensors are not carried over wholesale; the merger re-registers each
    /// donor sensor by kind.
    pub fn merge(&mut self, other: LogicManager) {
        for (sensor, listeners) in other.sensor_links {
            for controller in listeners {
                self.register_to_sensor(controller, sensor);
            }
        }
        for (actuator, drivers) in other.actuator_links {
            for controller in drivers {
                self.register_to_actuator(controller, actuator);
            }
        }
        self.time.merge(other.time);
        self.collision.merge(other.collision);
    }
}
