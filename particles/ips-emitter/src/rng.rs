//! Seedable random source shared by spawning and template initialization

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random number generator owned by a single emitter
#[derive(Debug, Clone)]
pub struct EmitterRng {
    inner: StdRng,
}

impl EmitterRng {
    /// Create a generator with a fixed seed for reproducible emission
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Create a generator seeded from the operating system
    pub fn from_entropy() -> Self {
        Self {
            inner: StdRng::from_os_rng(),
        }
    }

    /// Uniform f32 in [0, 1)
    #[inline]
    pub fn rand_f(&mut self) -> f32 {
        self.inner.random::<f32>()
    }

    /// Uniform u32
    #[inline]
    pub fn rand_i(&mut self) -> u32 {
        self.inner.random::<u32>()
    }

    /// Uniform f32 in [lo, hi)
    ///
    /// Tolerates `lo > hi` (the range is simply reversed).
    #[inline]
    pub fn between(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.rand_f()
    }

    /// Integer offset uniformly drawn from [-variance, variance]
    #[inline]
    pub fn variance_ms(&mut self, variance: u32) -> i64 {
        if variance == 0 {
            return 0;
        }
        let span = 2 * u64::from(variance) + 1;
        (u64::from(self.rand_i()) % span) as i64 - i64::from(variance)
    }

    /// Uniform index into a non-empty collection of `len` items
    #[inline]
    pub fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "index into empty collection");
        self.rand_i() as usize % len.max(1)
    }
}
