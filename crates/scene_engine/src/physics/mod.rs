//! Physics engine boundary
//!
//! The scene core never detects collisions or solves constraints itself. It
//! talks to a physics engine through the traits in this module: it builds a
//! [`MotionState`] for every replicated node, asks controllers for replicas,
//! retargets them on merge, and records collision pairs reported through
//! registered callbacks.

mod dummy;

pub use dummy::DummyPhysicsEnvironment;

use crate::foundation::handles::{AssetId, EnvironmentId, NodeId, ObjectId};
use crate::foundation::math::{Transform, Vec3};
use crate::render::Mesh;
use crate::scene::bounds::Frustum;

/// Which collision stage a callback is registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionResponse {
    /// Contact between two solid objects
    Object,
    /// Contact involving a sensor volume
    Sensor,
    /// Broad-phase filter; returning `false` rejects the pair early
    Broadphase,
}

/// Collision report delivered to callbacks
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionData {
    /// Client object of the first controller
    pub first: ObjectId,
    /// Client object of the second controller
    pub second: ObjectId,
    /// World-space contact points, if the engine provides them
    pub contact_points: Vec<Vec3>,
}

impl CollisionData {
    /// Pair without contact information
    pub fn new(first: ObjectId, second: ObjectId) -> Self {
        Self {
            first,
            second,
            contact_points: Vec::new(),
        }
    }
}

/// Collision callback; the return value only matters for broad-phase filters
pub type CollisionCallback = Box<dyn FnMut(&CollisionData) -> bool + Send>;

/// Transform bridge between one scene-graph node and the physics engine
#[derive(Debug, Clone)]
pub struct MotionState {
    node: NodeId,
    world: Transform,
}

impl MotionState {
    /// Bind a motion state to `node`, seeded with its current world transform
    pub fn new(node: NodeId, world: Transform) -> Self {
        Self { node, world }
    }

    /// Node this motion state drives
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Last world transform exchanged with the physics engine
    pub fn world(&self) -> &Transform {
        &self.world
    }

    /// Store a world transform produced by the physics engine
    pub fn set_world(&mut self, world: Transform) {
        self.world = world;
    }
}

/// Object taking part in a constraint replication pass
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintParticipant {
    /// Live object
    pub object: ObjectId,
    /// Template it was created from
    pub asset: Option<AssetId>,
    /// Object name, used by engines that resolve constraint targets by name
    pub name: String,
}

/// Per-object physics body
pub trait PhysicsController: Send {
    /// Clone this body for a replicated object driven by `motion`.
    ///
    /// `parent` is the physics controller of the replica's parent object, if
    /// any. Returns `None` when the engine cannot produce a replica.
    fn replica(
        &self,
        motion: MotionState,
        parent: Option<&dyn PhysicsController>,
    ) -> Option<Box<dyn PhysicsController>>;

    /// Record the game object this body reports collisions for
    fn set_client_object(&mut self, object: ObjectId);

    /// Game object this body reports collisions for
    fn client_object(&self) -> Option<ObjectId>;

    /// Stop simulating; the body follows its node kinematically
    fn suspend_dynamics(&mut self, ghost: bool);

    /// Resume simulation after [`PhysicsController::suspend_dynamics`]
    fn restore_dynamics(&mut self);

    /// Whether dynamics are currently suspended
    fn is_dynamics_suspended(&self) -> bool;

    /// Move the body to another physics environment
    fn set_environment(&mut self, environment: EnvironmentId);

    /// Environment the body belongs to
    fn environment(&self) -> Option<EnvironmentId>;

    /// Rebuild this body's constraints against `participants`
    fn replicate_constraints(&mut self, owner: ObjectId, participants: &[ConstraintParticipant]);

    /// Drop constraint data that was only needed for replication
    fn clear_constraints(&mut self);

    /// Rebuild the collision shape from `mesh`; `false` if unsupported
    fn reinstance_shape(&mut self, mesh: Option<&Mesh>) -> bool;
}

/// Per-object broad-phase proxy used for physics-based culling
pub trait GraphicController: Send {
    /// Clone this proxy for a replicated object driven by `motion`
    fn replica(&self, motion: MotionState) -> Option<Box<dyn GraphicController>>;

    /// Record the game object this proxy stands for
    fn set_client_object(&mut self, object: ObjectId);

    /// Move the proxy to another physics environment
    fn set_environment(&mut self, environment: EnvironmentId);

    /// Insert into or remove from the broad-phase
    fn activate(&mut self, active: bool);
}

/// One physics world, owned by a scene
pub trait PhysicsEnvironment: Send {
    /// Identity used by controllers to name their environment
    fn id(&self) -> EnvironmentId;

    /// Register a collision callback for `response`
    fn add_collision_callback(&mut self, response: CollisionResponse, callback: CollisionCallback);

    /// Gravity vector
    fn gravity(&self) -> Vec3;

    /// Set the gravity vector
    fn set_gravity(&mut self, gravity: Vec3);

    /// Visit every object whose broad-phase proxy intersects `frustum`.
    ///
    /// Returns `false` when the environment has no culling structure, in
    /// which case the caller falls back to per-object tests.
    fn cull(&mut self, frustum: &Frustum, visitor: &mut dyn FnMut(ObjectId)) -> bool;

    /// Absorb every body of `other` into this environment
    fn merge_environment(&mut self, other: Box<dyn PhysicsEnvironment>);
}

/// Obstacle-avoidance simulation attached to a scene
pub trait ObstacleSimulation: Send {
    /// Start tracking `object` as an obstacle
    fn add_obstacle(&mut self, object: ObjectId);

    /// Stop tracking `object`
    fn destroy_obstacle(&mut self, object: ObjectId);

    /// Prepare obstacle state for the next frame
    fn update_obstacles(&mut self);
}
