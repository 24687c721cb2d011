//! Merging a donor scene into a live one
//!
//! Used when a background library load finishes: the converted scene is
//! folded into its target. Preconditions are checked before anything is
//! touched; once mutation starts the merge always completes.

use thiserror::Error;

use super::game_scene::Scene;
use super::store::ListKind;
use crate::foundation::handles::ObjectId;
use crate::logic::SensorRef;
use crate::physics::ConstraintParticipant;

/// Reasons a merge is refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// Exactly one of the scenes has a physics environment
    #[error("physics mismatch merging '{donor}' into '{recipient}': both scenes need physics or neither")]
    PhysicsMismatch {
        /// Scene receiving the objects
        recipient: String,
        /// Scene being merged
        donor: String,
    },

    /// The scenes were converted by different converters
    #[error("cannot merge '{donor}' into '{recipient}': scenes come from different converters")]
    ConverterMismatch {
        /// Scene receiving the objects
        recipient: String,
        /// Scene being merged
        donor: String,
    },

    /// A scene cannot be merged into itself
    #[error("a scene cannot be merged into itself")]
    SameScene,
}

impl Scene {
    /// Check that `other` can be merged into this scene without touching
    /// either of them
    pub fn can_merge(&self, other: &Scene) -> Result<(), MergeError> {
        let err = if self.id() == other.id() {
            MergeError::SameScene
        } else if self.physics.is_some() != other.physics.is_some() {
            MergeError::PhysicsMismatch {
                recipient: self.name().to_string(),
                donor: other.name().to_string(),
            }
        } else if self.converter() != other.converter() {
            MergeError::ConverterMismatch {
                recipient: self.name().to_string(),
                donor: other.name().to_string(),
            }
        } else {
            return Ok(());
        };
        log::error!("{}", err);
        Err(err)
    }

    /// Fold `other` into this scene.
    ///
    /// In order: render buckets; donor objects retargeted (bricks, sensor
    /// registration, controllers, nodes) and registered by name, asset and
    /// mesh; physics environments and constraints; container lists; assets;
    /// logic links, timers and pending collisions.
    pub fn merge_scene(&mut self, mut other: Scene) -> Result<(), MergeError> {
        self.can_merge(&other)?;

        let scene = self.id();
        let environment = self.physics.as_ref().map(|env| env.id());

        self.buckets.merge(std::mem::take(&mut other.buckets));

        let donor_objects: Vec<ObjectId> = other
            .lists
            .list(ListKind::Active)
            .iter()
            .chain(other.lists.list(ListKind::Inactive).iter())
            .collect();
        for id in &donor_objects {
            let Some(obj) = other.objects.get_mut(*id) else {
                continue;
            };
            obj.scene = Some(scene);
            for (index, sensor) in obj.sensors.iter_mut().enumerate() {
                sensor.scene = Some(scene);
                let sensor_ref = SensorRef::new(*id, index);
                if other.logic.is_sensor_registered(sensor_ref) {
                    self.logic.register_sensor(sensor_ref, sensor.kind().event_manager());
                }
            }
            for controller in &mut obj.controllers {
                controller.scene = Some(scene);
            }
            for actuator in &mut obj.actuators {
                actuator.scene = Some(scene);
            }
            if let Some(environment) = environment {
                if let Some(physics) = obj.physics.as_mut() {
                    physics.set_environment(environment);
                }
                if let Some(graphic) = obj.graphic.as_mut() {
                    graphic.set_environment(environment);
                }
            }
        }
        let mut graph = std::mem::take(&mut other.graph);
        graph.retarget_scene(scene);
        self.graph.merge(graph);
        self.registry.merge(std::mem::take(&mut other.registry));

        if let (Some(recipient), Some(donor)) = (self.physics.as_mut(), other.physics.take()) {
            recipient.merge_environment(donor);
            let participants: Vec<ConstraintParticipant> = other
                .lists
                .list(ListKind::Active)
                .iter()
                .filter_map(|id| other.objects.get(id).map(|o| (id, o)))
                .filter(|(_, o)| o.physics.is_some())
                .map(|(id, o)| ConstraintParticipant {
                    object: id,
                    asset: o.asset(),
                    name: o.name().to_string(),
                })
                .collect();
            for participant in &participants {
                if let Some(physics) = other
                    .objects
                    .get_mut(participant.object)
                    .and_then(|o| o.physics.as_mut())
                {
                    physics.replicate_constraints(participant.object, &participants);
                    physics.clear_constraints();
                }
            }
        }

        let object_count = other.objects.len();
        self.objects.merge(std::mem::take(&mut other.objects));
        for kind in ListKind::MERGED {
            self.lists.concat(kind, &mut other.lists);
        }
        // Memberships carry references, so these travel too
        for kind in [ListKind::Animated, ListKind::Euthanasia] {
            self.lists.concat(kind, &mut other.lists);
        }

        self.assets.merge(std::mem::take(&mut other.assets), scene);
        self.logic.merge(std::mem::take(&mut other.logic));
        self.zombies += other.zombies;

        log::info!(
            "Merged scene '{}' into '{}' ({} objects)",
            other.name(),
            self.name(),
            object_count
        );
        Ok(())
    }
}
