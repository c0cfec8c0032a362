//! Individual particle representation

use glam::{Vec3, Vec4};

/// Stable reference to a slot in a [`ParticlePool`](crate::pool::ParticlePool)
///
/// Handles stay valid for the lifetime of the pool; growth appends chunks and
/// never moves existing slots. A handle only addresses the pool that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleHandle(pub(crate) u32);

impl ParticleHandle {
    /// Flat slot index across all pool chunks
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single pooled particle record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Index of the particle template in the owning emitter's template list
    pub template: usize,
    /// World-space position
    pub position: Vec3,
    /// Velocity in units per second
    pub velocity: Vec3,
    /// Constant acceleration, or the attraction sum when attractors are active
    pub acceleration: Vec3,
    /// Ejection direction, used by oriented rendering when not following velocity
    pub orient_dir: Vec3,
    /// Offset from the parent anchor for sticky emitters
    pub relative_position: Vec3,
    /// Current age in milliseconds
    pub current_age: u32,
    /// Total lifetime in milliseconds
    pub total_lifetime: u32,
    /// Interpolated size
    pub size: f32,
    /// Interpolated color (RGBA, 0.0-1.0)
    pub color: Vec4,
    /// Spin speed in degrees per second
    pub spin_speed: f32,
    pub(crate) next: Option<ParticleHandle>,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            template: 0,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            orient_dir: Vec3::Z,
            relative_position: Vec3::ZERO,
            current_age: 0,
            total_lifetime: 1,
            size: 1.0,
            color: Vec4::ONE,
            spin_speed: 0.0,
            next: None,
        }
    }
}

impl Particle {
    /// Reset all simulation state, keeping the slot's list link
    pub(crate) fn reset(&mut self) {
        let next = self.next;
        *self = Self {
            next,
            ..Self::default()
        };
    }

    /// Check if the particle has outlived its lifetime
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.current_age > self.total_lifetime
    }

    /// Get the age as a fraction of the lifetime
    ///
    /// Not clamped: a value above 1.0 means the particle should already have
    /// been evicted.
    #[inline]
    pub fn age_fraction(&self) -> f32 {
        self.current_age as f32 / self.total_lifetime.max(1) as f32
    }

    /// Next particle in whichever pool list this slot is currently on
    #[inline]
    pub fn next(&self) -> Option<ParticleHandle> {
        self.next
    }
}
