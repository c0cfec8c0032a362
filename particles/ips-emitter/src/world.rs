//! Collaborator interfaces consumed by the emitter
//!
//! The emitter never owns scene, physics or scripting state. Everything it
//! needs from the outside is passed in through these types on each call.

use glam::{Affine3A, Vec3};

use crate::data::EjectionParams;

/// Standard gravity, pointing down the Z axis
pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, 0.0, -9.81);

/// Environment-wide forces shared by all emitters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Environment {
    /// Wind velocity, scaled by each template's wind coefficient
    pub wind_velocity: Vec3,
    /// Gravity acceleration, scaled by each template's gravity coefficient
    pub gravity: Vec3,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            wind_velocity: Vec3::ZERO,
            gravity: DEFAULT_GRAVITY,
        }
    }
}

/// Result of a successful ray cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Point of contact
    pub point: Vec3,
    /// Surface normal at the contact, not necessarily unit length
    pub normal: Vec3,
}

/// Identifier of an external object that particles may be attracted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectId(pub u32);

/// Read-only queries against the collision world
pub trait World {
    /// Cast a ray from `start` to `end` against world geometry
    fn cast_ray(&self, start: Vec3, end: Vec3) -> Option<RayHit>;

    /// Look up the world transform of a named object
    fn object_transform(&self, id: ObjectId) -> Option<Affine3A>;
}

/// A world with no geometry and no objects
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyWorld;

impl World for EmptyWorld {
    fn cast_ray(&self, _start: Vec3, _end: Vec3) -> Option<RayHit> {
        None
    }

    fn object_transform(&self, _id: ObjectId) -> Option<Affine3A> {
        None
    }
}

/// Identity of an emitter towards the scene host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmitterId(pub u64);

/// Scene and tick-list membership owned by the host
pub trait SceneHost {
    /// Make the emitter renderable and ticked
    fn add_to_scene(&mut self, id: EmitterId);

    /// Remove the emitter from the scene and tick list
    fn remove_from_scene(&mut self, id: EmitterId);
}

/// Per-call simulation inputs
#[derive(Clone, Copy)]
pub struct SimContext<'a> {
    pub environment: &'a Environment,
    pub world: &'a dyn World,
}

impl<'a> SimContext<'a> {
    pub fn new(environment: &'a Environment, world: &'a dyn World) -> Self {
        Self { environment, world }
    }
}

impl std::fmt::Debug for SimContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimContext")
            .field("environment", self.environment)
            .finish_non_exhaustive()
    }
}

/// Path node driving an emitter with per-spawn offsets
///
/// Stands in for externally evaluated position expressions: the node decides
/// where, relative to the spawn point, each new particle appears.
pub trait SpawnOffsetSource {
    /// Ejection parameters replacing the emitter template's, if any
    fn ejection_override(&self) -> Option<&EjectionParams> {
        None
    }

    /// A node that is shutting down suppresses spawning
    fn is_shutting_down(&self) -> bool {
        false
    }

    /// World-space offset from `spawn_pos` for the next particle
    ///
    /// Called once per spawn with the emitter's internal clock. Returning
    /// `None` falls back to the regular ejection offset.
    fn spawn_offset(&mut self, spawn_pos: Vec3, clock_ms: u64) -> Option<Vec3>;
}
