//! Attraction and repulsion towards external objects

use glam::Vec3;

use crate::world::{ObjectId, World};

/// Maximum number of attractors per emitter
pub const MAX_ATTRACTORS: usize = 2;

/// Default distance scale of the attraction falloff
pub const DEFAULT_ATTRACTION_RANGE: f32 = 50.0;

/// Direction of the attraction force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum AttractionMode {
    #[default]
    Off,
    /// Pull particles towards the target
    Attract,
    /// Push particles away from the target
    Repel,
}

/// A single attraction target
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Attractor {
    /// Object providing the target transform
    pub target: Option<ObjectId>,
    /// Offset in the target's local space
    pub offset: Vec3,
    pub mode: AttractionMode,
    /// Scale applied to the force
    pub strength: f32,
}

impl Attractor {
    pub fn new(target: ObjectId, offset: Vec3, mode: AttractionMode, strength: f32) -> Self {
        Self {
            target: Some(target),
            offset,
            mode,
            strength,
        }
    }

    /// Check if this attractor contributes any force
    pub fn is_active(&self) -> bool {
        self.mode != AttractionMode::Off && self.target.is_some()
    }

    /// Resolve the world-space target point, if the object still exists
    pub fn resolve(&self, world: &dyn World) -> Option<Vec3> {
        if self.mode == AttractionMode::Off {
            return None;
        }
        let transform = world.object_transform(self.target?)?;
        Some(transform.transform_point3(self.offset))
    }

    /// Force exerted on a particle at `position` by a target at `target`
    ///
    /// Magnitude is `range / distance - 1`, clamped at zero. Distances below 1
    /// are treated as 1.
    pub fn force(&self, target: Vec3, position: Vec3, range: f32) -> Vec3 {
        let mut diff = target - position;
        if diff.length() < 1.0 {
            diff = diff.normalize_or_zero();
        }
        let distance = diff.length();
        if distance == 0.0 {
            return Vec3::ZERO;
        }

        let magnitude = (range / distance - 1.0).max(0.0);
        let pull = diff / distance * magnitude * self.strength;
        match self.mode {
            AttractionMode::Attract => pull,
            AttractionMode::Repel => -pull,
            AttractionMode::Off => Vec3::ZERO,
        }
    }
}
