//! Emitter lifecycle: registration, deferred deletion and rebinding

use std::sync::Arc;

use ips_emitter::{EmitterId, GraphEmitter};
use pretty_assertions::assert_eq;

use crate::common::{CountingHost, advance_ms, emitter, emitter_data, still, with_ctx};

#[test]
fn test_delete_when_empty_waits_for_last_particle() {
    let mut emitter = emitter(emitter_data(100, 1000));
    let mut host = CountingHost::default();

    with_ctx(|ctx| {
        emitter.emit_along_segment(&still(300), ctx, &mut host, None);
        assert_eq!(host.registered(), 1);

        emitter.delete_when_empty(&mut host);
        assert!(!emitter.is_dead());

        advance_ms(&mut emitter, ctx, 500);
        emitter.process_tick(&mut host);
        assert!(!emitter.is_dead());
        assert!(!emitter.is_deletion_pending());

        // all three were spawned at age 0 and expire together
        advance_ms(&mut emitter, ctx, 800);
        assert!(emitter.is_empty());
        assert!(emitter.is_deletion_pending());
        assert!(!emitter.is_dead());

        emitter.process_tick(&mut host);
        assert!(emitter.is_dead());
    });

    assert_eq!(host.removed, vec![EmitterId(1)]);
    assert_eq!(host.registered(), 0);
}

#[test]
fn test_delete_when_empty_on_idle_emitter_is_immediate() {
    let mut emitter = emitter(emitter_data(100, 1000));
    let mut host = CountingHost::default();

    emitter.delete_when_empty(&mut host);
    assert!(emitter.is_dead());
    // never registered, so nothing to remove
    assert!(host.removed.is_empty());

    // a second request is ignored
    emitter.delete_when_empty(&mut host);
    assert!(host.removed.is_empty());
}

#[test]
fn test_dead_emitter_is_inert() {
    let mut emitter = emitter(emitter_data(100, 1000));
    let mut host = CountingHost::default();
    emitter.delete_when_empty(&mut host);

    with_ctx(|ctx| {
        assert_eq!(emitter.emit_along_segment(&still(1000), ctx, &mut host, None), 0);
        emitter.advance_time(0.2, ctx);
    });

    assert!(emitter.is_empty());
    assert_eq!(emitter.elapsed_time_ms(), 0);
    assert!(host.added.is_empty());
}

#[test]
fn test_rebind_resets_pool() {
    let mut emitter = emitter(emitter_data(100, 1000));
    with_ctx(|ctx| emitter.emit_along_segment(&still(500), ctx, &mut CountingHost::default(), None));
    assert_eq!(emitter.len(), 5);

    emitter.bind_data(Arc::new(emitter_data(10, 1000)));
    assert!(emitter.is_empty());
    assert_eq!(emitter.stats().capacity, 108);
}

#[test]
fn test_growth_is_reported() {
    // 50 ms lifetime over a 100 ms period leaves only the margin of 8 slots
    let mut emitter = GraphEmitter::with_seed(EmitterId(9), Arc::new(emitter_data(100, 50)), 1);
    assert_eq!(emitter.stats().capacity, 8);

    let spawned = emitter.emit_in_hemisphere(
        glam::Vec3::ZERO,
        glam::Vec3::Z,
        1.0,
        glam::Vec3::ZERO,
        9,
        &mut CountingHost::default(),
    );
    assert_eq!(spawned, 9);

    let stats = emitter.stats();
    assert_eq!(stats.capacity, 24);
    assert_eq!(stats.growths, 1);
    assert_eq!(stats.chunks, 2);
    assert_eq!(emitter.index_buffer().quad_capacity(), 24);
}
