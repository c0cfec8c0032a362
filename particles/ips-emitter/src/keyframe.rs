//! Keyframe lookup for size and color over a particle's normalized age

use glam::Vec4;

/// Number of keys in every size/color table
pub const KEYFRAME_COUNT: usize = 4;

/// Trait for values that can be blended between two keys
pub trait Lerp: Copy {
    /// Linear interpolation between self and other
    fn lerp_to(self, other: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp_to(self, other: Self, t: f32) -> Self {
        self * (1.0 - t) + other * t
    }
}

impl Lerp for Vec4 {
    fn lerp_to(self, other: Self, t: f32) -> Self {
        self.lerp(other, t)
    }
}

/// Position within a keyframe table: blend from `index - 1` to `index`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyCursor {
    /// Upper key of the bracketing pair, always >= 1
    pub index: usize,
    /// Blend factor between the two keys
    pub factor: f32,
}

impl KeyCursor {
    /// Locate the bracketing pair for normalized time `t`
    ///
    /// Picks the first key (from index 1) whose time is at or after `t`.
    /// Returns `None` when `t` lies beyond the last key, in which case the
    /// previous interpolated values stay in effect.
    pub fn locate(times: &[f32; KEYFRAME_COUNT], t: f32) -> Option<Self> {
        (1..KEYFRAME_COUNT).find(|&i| times[i] >= t).map(|index| {
            let span = times[index] - times[index - 1];
            let factor = if span > 0.0 {
                (t - times[index - 1]) / span
            } else {
                1.0
            };
            Self { index, factor }
        })
    }

    /// Blend a value table at this cursor
    pub fn sample<T: Lerp>(&self, values: &[T; KEYFRAME_COUNT]) -> T {
        values[self.index - 1].lerp_to(values[self.index], self.factor)
    }
}
