//! Spawn scheduling across emission calls

use glam::Vec3;
use ips_emitter::{EmissionSegment, EmitterStats};
use test_case::test_case;

use crate::common::{CountingHost, emitter, emitter_data, still, with_ctx};

#[test_case(250, 100 => 2 ; "partial period left over")]
#[test_case(100, 100 => 1 ; "exact period")]
#[test_case(99, 100 => 0 ; "shorter than one period")]
#[test_case(1000, 100 => 10 ; "ten periods")]
#[test_case(1000, 33 => 30 ; "uneven period")]
fn spawns_floor_of_duration_over_period(duration_ms: u32, period_ms: u32) -> usize {
    let mut emitter = emitter(emitter_data(period_ms, 60_000));
    with_ctx(|ctx| emitter.emit_along_segment(&still(duration_ms), ctx, &mut CountingHost::default(), None))
}

#[test]
fn test_pending_remainder_carries_between_calls() {
    let mut emitter = emitter(emitter_data(100, 1000));
    let mut host = CountingHost::default();

    with_ctx(|ctx| {
        pretty_assertions::assert_eq!(emitter.emit_along_segment(&still(250), ctx, &mut host, None), 2);
        pretty_assertions::assert_eq!(emitter.pending_spawn_ms(), 50);

        // the carried 50 ms fire first, the remaining 50 ms are pending again
        pretty_assertions::assert_eq!(emitter.emit_along_segment(&still(100), ctx, &mut host, None), 1);
        pretty_assertions::assert_eq!(emitter.pending_spawn_ms(), 50);
        pretty_assertions::assert_eq!(emitter.internal_clock_ms(), 350);

        // a call shorter than the pending time only counts it down
        pretty_assertions::assert_eq!(emitter.emit_along_segment(&still(20), ctx, &mut host, None), 0);
        pretty_assertions::assert_eq!(emitter.pending_spawn_ms(), 30);
    });

    pretty_assertions::assert_eq!(emitter.len(), 3);
}

#[test]
fn test_spawn_count_independent_of_slicing() {
    let whole = {
        let mut emitter = emitter(emitter_data(40, 60_000));
        with_ctx(|ctx| emitter.emit_along_segment(&still(1000), ctx, &mut CountingHost::default(), None))
    };

    let mut sliced = emitter(emitter_data(40, 60_000));
    let mut host = CountingHost::default();
    let total: usize = with_ctx(|ctx| {
        [17u32, 230, 3, 450, 300]
            .iter()
            .map(|ms| sliced.emit_along_segment(&still(*ms), ctx, &mut host, None))
            .sum()
    });

    pretty_assertions::assert_eq!(whole, 25);
    pretty_assertions::assert_eq!(total, whole);
}

#[test]
fn test_scene_registration_is_idempotent() {
    let mut emitter = emitter(emitter_data(50, 1000));
    let mut host = CountingHost::default();

    with_ctx(|ctx| {
        // nothing spawned yet, nothing to register
        emitter.emit_along_segment(&still(10), ctx, &mut host, None);
        assert!(host.added.is_empty());

        for _ in 0..5 {
            emitter.emit_along_segment(&still(100), ctx, &mut host, None);
        }
    });

    pretty_assertions::assert_eq!(host.added.len(), 1);
    assert!(emitter.is_in_scene());
}

#[test]
fn test_particles_spread_along_motion() {
    let mut data = emitter_data(100, 1000);
    data.ejection.theta_max = 0.0;
    let mut emitter = emitter(data);

    let segment = EmissionSegment::new(Vec3::ZERO, Vec3::new(40.0, 0.0, 0.0), Vec3::Z, Vec3::ZERO, 400);
    with_ctx(|ctx| emitter.emit_along_segment(&segment, ctx, &mut CountingHost::default(), None));

    let mut xs: Vec<f32> = emitter.particles().map(|p| p.position.x).collect();
    xs.sort_by(f32::total_cmp);
    pretty_assertions::assert_eq!(xs, vec![10.0, 20.0, 30.0, 40.0]);
    pretty_assertions::assert_eq!(emitter.last_position(), Some(Vec3::new(40.0, 0.0, 0.0)));
}

#[test]
fn test_time_box_stops_emission() {
    let mut data = emitter_data(100, 1000);
    data.lifetime_ms = 300;
    let mut emitter = emitter(data);
    let mut host = CountingHost::default();

    with_ctx(|ctx| {
        pretty_assertions::assert_eq!(emitter.emit_along_segment(&still(200), ctx, &mut host, None), 2);
        emitter.advance_time(0.3, ctx);
        // elapsed == lifetime still emits
        pretty_assertions::assert_eq!(emitter.emit_along_segment(&still(100), ctx, &mut host, None), 1);

        emitter.advance_time(0.1, ctx);
        pretty_assertions::assert_eq!(emitter.emit_along_segment(&still(500), ctx, &mut host, None), 0);
    });

    let stats: EmitterStats = emitter.stats();
    pretty_assertions::assert_eq!(stats.elapsed_ms, 400);
    pretty_assertions::assert_eq!(stats.live, 3);
}
