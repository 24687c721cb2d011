//! Sensor, controller and actuator definitions

use std::collections::{BTreeMap, HashMap};

use super::events::{EventManagerKind, InputState};
use crate::foundation::handles::{ObjectId, SceneId};
use crate::scene::object::PropertyValue;

macro_rules! brick_ref {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            /// Object owning the brick
            pub object: ObjectId,
            /// Position in the owner's brick list
            pub index: usize,
        }

        impl $name {
            /// Reference the `index`-th brick of `object`
            pub const fn new(object: ObjectId, index: usize) -> Self {
                Self { object, index }
            }

            /// Same position on another object
            pub const fn with_object(self, object: ObjectId) -> Self {
                Self { object, index: self.index }
            }
        }
    };
}

brick_ref!(
    /// Sensor addressed by owner and position
    SensorRef
);
brick_ref!(
    /// Controller addressed by owner and position
    ControllerRef
);
brick_ref!(
    /// Actuator addressed by owner and position
    ActuatorRef
);

/// Keyboard key code as delivered by the input layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u32);

/// Mouse button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left button
    Left,
    /// Middle button
    Middle,
    /// Right button
    Right,
}

/// What a sensor detects
#[derive(Debug, Clone, PartialEq)]
pub enum SensorKind {
    /// Positive every frame
    Always,
    /// Positive while the key is held
    Keyboard {
        /// Watched key
        key: KeyCode,
    },
    /// Positive while the button is held
    Mouse {
        /// Watched button
        button: MouseButton,
    },
    /// Positive while the owner touches an object (optionally carrying `property`)
    Collision {
        /// Only count objects that carry this property
        property: Option<String>,
        /// Objects touched this frame
        hits: Vec<ObjectId>,
    },
    /// Positive while the owner's property equals `value`
    Property {
        /// Property name
        name: String,
        /// Expected value
        value: PropertyValue,
    },
}

impl SensorKind {
    /// Event manager responsible for sensors of this kind
    pub fn event_manager(&self) -> EventManagerKind {
        match self {
            Self::Always | Self::Property { .. } => EventManagerKind::Basic,
            Self::Keyboard { .. } => EventManagerKind::Keyboard,
            Self::Mouse { .. } => EventManagerKind::Mouse,
            Self::Collision { .. } => EventManagerKind::Collision,
        }
    }
}

/// Sensor brick
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    name: String,
    pub(crate) owner: Option<ObjectId>,
    pub(crate) scene: Option<SceneId>,
    pub(crate) kind: SensorKind,
    invert: bool,
    pulse: bool,
    positive: bool,
}

impl Sensor {
    /// Create a sensor; it is attached to an object by the scene
    pub fn new(name: impl Into<String>, kind: SensorKind) -> Self {
        Self {
            name: name.into(),
            owner: None,
            scene: None,
            kind,
            invert: false,
            pulse: false,
            positive: false,
        }
    }

    /// Retrigger controllers every frame while positive
    pub fn with_pulse(mut self, pulse: bool) -> Self {
        self.pulse = pulse;
        self
    }

    /// Invert the detected state
    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Brick name (not unique)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning object
    pub fn owner(&self) -> Option<ObjectId> {
        self.owner
    }

    /// Scene the brick belongs to
    pub fn scene(&self) -> Option<SceneId> {
        self.scene
    }

    /// Sensor kind
    pub fn kind(&self) -> &SensorKind {
        &self.kind
    }

    /// State after the last evaluation
    pub fn is_positive(&self) -> bool {
        self.positive
    }

    /// Evaluate the sensor; returns whether linked controllers must run
    pub(crate) fn evaluate(&mut self, input: &InputState, properties: &BTreeMap<String, PropertyValue>) -> bool {
        let detected = match &self.kind {
            SensorKind::Always => true,
            SensorKind::Keyboard { key } => input.is_key_pressed(*key),
            SensorKind::Mouse { button } => input.is_button_pressed(*button),
            SensorKind::Collision { hits, .. } => !hits.is_empty(),
            SensorKind::Property { name, value } => properties.get(name) == Some(value),
        };
        let state = detected != self.invert;
        let changed = state != self.positive;
        self.positive = state;
        changed || (self.pulse && state)
    }
}

/// Boolean function a controller applies to its sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    /// All sensors positive
    And,
    /// Any sensor positive
    Or,
    /// Not all sensors positive
    Nand,
    /// No sensor positive
    Nor,
    /// Exactly one sensor positive
    Xor,
}

impl ControllerKind {
    /// Apply the controller function to sensor states
    pub fn evaluate(self, inputs: &[bool]) -> bool {
        let positives = inputs.iter().filter(|s| **s).count();
        match self {
            Self::And => positives == inputs.len(),
            Self::Or => positives > 0,
            Self::Nand => positives != inputs.len(),
            Self::Nor => positives == 0,
            Self::Xor => positives == 1,
        }
    }
}

/// Controller brick
#[derive(Debug, Clone, PartialEq)]
pub struct Controller {
    name: String,
    pub(crate) owner: Option<ObjectId>,
    pub(crate) scene: Option<SceneId>,
    kind: ControllerKind,
    pub(crate) sensors: Vec<SensorRef>,
    pub(crate) actuators: Vec<ActuatorRef>,
    priority: i32,
    pub(crate) replication_priority: u32,
}

impl Controller {
    /// Create an unlinked controller
    pub fn new(name: impl Into<String>, kind: ControllerKind) -> Self {
        Self {
            name: name.into(),
            owner: None,
            scene: None,
            kind,
            sensors: Vec::new(),
            actuators: Vec::new(),
            priority: 0,
            replication_priority: 0,
        }
    }

    /// Lower values run first within one replication generation
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Brick name (not unique)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning object
    pub fn owner(&self) -> Option<ObjectId> {
        self.owner
    }

    /// Controller function
    pub fn kind(&self) -> ControllerKind {
        self.kind
    }

    /// Linked sensors in link order
    pub fn linked_sensors(&self) -> &[SensorRef] {
        &self.sensors
    }

    /// Linked actuators in link order
    pub fn linked_actuators(&self) -> &[ActuatorRef] {
        &self.actuators
    }

    /// Execution order key: replication generation first, then priority
    pub fn execution_order(&self) -> (u32, i32) {
        (self.replication_priority, self.priority)
    }
}

/// What an actuator does when fired
#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorKind {
    /// Replicate `template` (usually inactive) at the owner's placement
    AddObject {
        /// Object to replicate
        template: ObjectId,
        /// Lifespan in frames; zero means permanent
        lifespan: f32,
    },
    /// Schedule the owner for deferred removal
    EndObject,
    /// Show or hide the owner
    Visibility {
        /// New visibility
        visible: bool,
        /// Apply to the owner's children as well
        recursive: bool,
    },
    /// Assign a property on the owner
    Property {
        /// Property name
        name: String,
        /// Assigned value
        value: PropertyValue,
    },
    /// Turn the owner to face `target`
    TrackTo {
        /// Tracked object
        target: Option<ObjectId>,
    },
}

/// Effect of a fired actuator, applied by the scene after dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCommand {
    /// Replicate `template` placed at `reference`
    AddObject {
        /// Object to replicate
        template: ObjectId,
        /// Placement reference
        reference: ObjectId,
        /// Lifespan in frames
        lifespan: f32,
    },
    /// Schedule `object` for deferred removal
    EndObject {
        /// Object to end
        object: ObjectId,
    },
    /// Change visibility
    SetVisible {
        /// Target object
        object: ObjectId,
        /// New visibility
        visible: bool,
        /// Include children
        recursive: bool,
    },
    /// Assign a property
    SetProperty {
        /// Target object
        object: ObjectId,
        /// Property name
        name: String,
        /// Assigned value
        value: PropertyValue,
    },
    /// Orient `object` towards `target`
    TrackTo {
        /// Turning object
        object: ObjectId,
        /// Tracked object
        target: ObjectId,
    },
}

/// Actuator brick
#[derive(Debug, Clone, PartialEq)]
pub struct Actuator {
    name: String,
    pub(crate) owner: Option<ObjectId>,
    pub(crate) scene: Option<SceneId>,
    pub(crate) kind: ActuatorKind,
}

impl Actuator {
    /// Create an unattached actuator
    pub fn new(name: impl Into<String>, kind: ActuatorKind) -> Self {
        Self {
            name: name.into(),
            owner: None,
            scene: None,
            kind,
        }
    }

    /// Brick name (not unique)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning object
    pub fn owner(&self) -> Option<ObjectId> {
        self.owner
    }

    /// Actuator kind
    pub fn kind(&self) -> &ActuatorKind {
        &self.kind
    }

    /// Rewrite object pointers that were replicated in the same pass.
    ///
    /// Targets outside the map are left untouched.
    pub fn relink(&mut self, map: &HashMap<ObjectId, ObjectId>) {
        let object = match &mut self.kind {
            ActuatorKind::TrackTo { target: Some(target) } => target,
            ActuatorKind::AddObject { template, .. } => template,
            _ => return,
        };
        if let Some(replica) = map.get(object) {
            *object = *replica;
        }
    }

    /// Forget `object` if this actuator points at it; returns whether it did
    pub fn unlink_object(&mut self, object: ObjectId) -> bool {
        match &mut self.kind {
            ActuatorKind::TrackTo { target } if *target == Some(object) => {
                *target = None;
                true
            }
            _ => false,
        }
    }

    /// Command produced when a controller fires this actuator
    pub fn command(&self) -> Option<ActuatorCommand> {
        let owner = self.owner?;
        match &self.kind {
            ActuatorKind::AddObject { template, lifespan } => Some(ActuatorCommand::AddObject {
                template: *template,
                reference: owner,
                lifespan: *lifespan,
            }),
            ActuatorKind::EndObject => Some(ActuatorCommand::EndObject { object: owner }),
            ActuatorKind::Visibility { visible, recursive } => Some(ActuatorCommand::SetVisible {
                object: owner,
                visible: *visible,
                recursive: *recursive,
            }),
            ActuatorKind::Property { name, value } => Some(ActuatorCommand::SetProperty {
                object: owner,
                name: name.clone(),
                value: value.clone(),
            }),
            ActuatorKind::TrackTo { target } => target.map(|target| ActuatorCommand::TrackTo { object: owner, target }),
        }
    }
}
