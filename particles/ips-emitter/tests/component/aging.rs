//! Aging, eviction and integration through the public tick

use glam::{Affine3A, Vec3, Vec4};
use ips_emitter::{
    AttractionMode, Attractor, EmitterData, EmptyWorld, Environment, ObjectId, RayHit, SimContext,
    World,
};
use pretty_assertions::assert_eq;

use crate::common::{CountingHost, advance_ms, emitter, emitter_data, still, with_ctx};

#[test]
fn test_expired_particle_is_evicted() {
    let mut emitter = emitter(emitter_data(100, 1000));
    let mut host = CountingHost::default();

    with_ctx(|ctx| {
        assert_eq!(emitter.emit_along_segment(&still(100), ctx, &mut host, None), 1);
        let free_before = emitter.stats().free;

        // age == lifetime survives
        advance_ms(&mut emitter, ctx, 1000);
        assert_eq!(emitter.len(), 1);

        advance_ms(&mut emitter, ctx, 200);
        assert_eq!(emitter.len(), 0);
        assert_eq!(emitter.stats().free, free_before + 1);
    });
}

#[test]
fn test_survivors_never_outlive_lifetime() {
    let mut data = emitter_data(20, 600);
    data.particles = vec![std::sync::Arc::new(ips_emitter::ParticleData {
        lifetime_ms: 600,
        lifetime_variance_ms: 300,
        ..Default::default()
    })];
    let mut emitter = emitter(data);
    let mut host = CountingHost::default();

    with_ctx(|ctx| {
        for _ in 0..40 {
            emitter.emit_along_segment(&still(50), ctx, &mut host, None);
            emitter.advance_time(0.05, ctx);
            assert!(emitter.particles().all(|p| p.current_age <= p.total_lifetime));
        }
    });
}

#[test]
fn test_gravity_pulls_particles_down() {
    let mut data = emitter_data(100, 5000);
    data.particles = vec![std::sync::Arc::new(ips_emitter::ParticleData {
        gravity: 1.0,
        ..Default::default()
    })];
    data.ejection.velocity = 0.0;
    data.ejection.velocity_variance = 0.0;
    let mut emitter = emitter(data);

    let env = Environment::default();
    let ctx = SimContext::new(&env, &EmptyWorld);
    emitter.emit_along_segment(&still(100), &ctx, &mut CountingHost::default(), None);
    emitter.advance_time(0.5, &ctx);

    let particle = emitter.particles().next().unwrap();
    assert!(particle.velocity.z < -4.0);
    assert!(particle.position.z < 0.0);
    assert_eq!(particle.position.x, 0.0);
}

#[test]
fn test_emitter_color_keys_override_template() {
    let mut data = emitter_data(100, 1000);
    data.use_emitter_colors = true;
    let mut emitter = emitter(data);
    let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
    emitter.set_colors([red; 4]);

    with_ctx(|ctx| {
        emitter.emit_along_segment(&still(100), ctx, &mut CountingHost::default(), None);
        emitter.advance_time(0.2, ctx);
    });

    assert_eq!(emitter.collective_color(), red);
}

#[test]
fn test_sticky_particles_follow_anchor() {
    let mut emitter = emitter(emitter_data(100, 1000));
    emitter.set_sticky(true);

    with_ctx(|ctx| {
        emitter.emit_along_segment(&still(300), ctx, &mut CountingHost::default(), None);
        emitter.set_parent_anchor(Vec3::new(0.0, 0.0, 7.0));
        emitter.advance_time(0.1, ctx);
    });

    // no node supplied offsets, so every particle sits on the anchor
    assert!(emitter.particles().all(|p| p.position == Vec3::new(0.0, 0.0, 7.0)));
}

const BEACON: ObjectId = ObjectId(3);

/// World with no geometry and a single object ten units along +X
struct Beacon;

impl World for Beacon {
    fn cast_ray(&self, _start: Vec3, _end: Vec3) -> Option<RayHit> {
        None
    }

    fn object_transform(&self, id: ObjectId) -> Option<Affine3A> {
        (id == BEACON).then(|| Affine3A::from_translation(Vec3::new(10.0, 0.0, 0.0)))
    }
}

/// Template ejecting straight up along +Z at `speed`
fn upward_data(speed: f32, constant_acceleration: f32) -> EmitterData {
    let mut data = emitter_data(100, 1000);
    data.particles = vec![std::sync::Arc::new(ips_emitter::ParticleData {
        constant_acceleration,
        ..Default::default()
    })];
    data.ejection.velocity = speed;
    data.ejection.velocity_variance = 0.0;
    data.ejection.theta_min = 0.0;
    data.ejection.theta_max = 0.0;
    data
}

/// Spawn one particle at the origin and return its velocity after a 100 ms tick
fn velocity_after_tick(data: EmitterData, attractor: Option<Attractor>) -> Vec3 {
    let mut emitter = emitter(data);
    if let Some(attractor) = attractor {
        emitter.set_attractor(0, attractor).unwrap();
    }
    let env = Environment {
        gravity: Vec3::ZERO,
        ..Default::default()
    };
    let ctx = SimContext::new(&env, &Beacon);

    assert_eq!(
        emitter.emit_along_segment(&still(100), &ctx, &mut CountingHost::default(), None),
        1
    );
    emitter.advance_time(0.1, &ctx);
    emitter.particles().next().unwrap().velocity
}

fn assert_close(actual: Vec3, expected: Vec3) {
    assert!(actual.abs_diff_eq(expected, 1e-4), "{actual} != {expected}");
}

#[test]
fn test_attractor_pulls_and_repels() {
    // range 50 at distance 10: magnitude 4, over 0.1 s
    let attract = Attractor::new(BEACON, Vec3::ZERO, AttractionMode::Attract, 1.0);
    let pulled = velocity_after_tick(upward_data(0.0, 0.0), Some(attract));
    assert_close(pulled, Vec3::new(0.4, 0.0, 0.0));

    let repel = Attractor::new(BEACON, Vec3::ZERO, AttractionMode::Repel, 1.0);
    let pushed = velocity_after_tick(upward_data(0.0, 0.0), Some(repel));
    assert_close(pushed, Vec3::new(-0.4, 0.0, 0.0));
}

#[test]
fn test_attractor_replaces_constant_acceleration() {
    // constant acceleration equals the ejection velocity: 1 unit/s^2 upward
    let free = velocity_after_tick(upward_data(1.0, 1.0), None);
    assert_close(free, Vec3::new(0.0, 0.0, 1.1));

    let attract = Attractor::new(BEACON, Vec3::ZERO, AttractionMode::Attract, 1.0);
    let attracted = velocity_after_tick(upward_data(1.0, 1.0), Some(attract));
    assert_close(attracted, Vec3::new(0.4, 0.0, 1.0));
}

#[test]
fn test_unresolved_attractor_contributes_nothing() {
    let lost = Attractor::new(ObjectId(99), Vec3::ZERO, AttractionMode::Attract, 1.0);
    let velocity = velocity_after_tick(upward_data(0.0, 0.0), Some(lost));
    assert_eq!(velocity, Vec3::ZERO);
}
