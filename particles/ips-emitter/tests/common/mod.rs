//! Common test utilities and fixtures

#![allow(dead_code)]

use std::sync::Arc;

use glam::Vec3;
use ips_emitter::{
    EmissionSegment, EmitterData, EmitterId, EmptyWorld, Environment, GraphEmitter, ParticleData,
    SceneHost, SimContext,
};

/// Scene host recording every registration change
#[derive(Debug, Default)]
pub struct CountingHost {
    pub added: Vec<EmitterId>,
    pub removed: Vec<EmitterId>,
}

impl CountingHost {
    /// Emitters currently registered
    pub fn registered(&self) -> usize {
        self.added.len() - self.removed.len()
    }
}

impl SceneHost for CountingHost {
    fn add_to_scene(&mut self, id: EmitterId) {
        self.added.push(id);
    }

    fn remove_from_scene(&mut self, id: EmitterId) {
        self.removed.push(id);
    }
}

/// Single-template emitter data with a fixed period and particle lifetime
pub fn emitter_data(period_ms: u32, lifetime_ms: u32) -> EmitterData {
    let mut data = EmitterData::with_particles(vec![ParticleData {
        lifetime_ms,
        ..Default::default()
    }]);
    data.ejection.period_ms = period_ms;
    data.ejection.period_variance_ms = 0;
    data
}

/// Route emitter logging through the test harness, `RUST_LOG` selects the level
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Seeded emitter bound to `data`
pub fn emitter(data: EmitterData) -> GraphEmitter {
    init_logging();
    GraphEmitter::with_seed(EmitterId(1), Arc::new(data), 0x5eed)
}

/// Stationary segment at the origin
pub fn still(duration_ms: u32) -> EmissionSegment {
    EmissionSegment::new(Vec3::ZERO, Vec3::ZERO, Vec3::Z, Vec3::ZERO, duration_ms)
}

/// Run `f` with a calm environment and an empty world
pub fn with_ctx<R>(f: impl FnOnce(&SimContext<'_>) -> R) -> R {
    let env = Environment {
        gravity: Vec3::ZERO,
        ..Default::default()
    };
    f(&SimContext::new(&env, &EmptyWorld))
}

/// Advance in steps no longer than the tick clamp
pub fn advance_ms(emitter: &mut GraphEmitter, ctx: &SimContext<'_>, mut ms: u32) {
    while ms > 0 {
        let step = ms.min(500);
        emitter.advance_time(step as f32 / 1000.0, ctx);
        ms -= step;
    }
}
