//! Pool growth and list conservation

use std::collections::HashSet;

use ips_emitter::pool::{GROWTH_CHUNK_SIZE, ParticlePool};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Every slot is on exactly one of the two lists
fn assert_conserved(pool: &ParticlePool) {
    let live: Vec<_> = pool.handles().collect();
    let free: Vec<_> = pool.free_handles().collect();
    assert_eq!(live.len(), pool.len());
    assert_eq!(live.len() + free.len(), pool.capacity());

    let mut seen = HashSet::new();
    for handle in live.iter().chain(&free) {
        assert!(handle.index() < pool.capacity());
        assert!(seen.insert(*handle), "slot {} linked twice", handle.index());
    }
}

#[test]
fn test_ninth_allocation_grows_once() {
    let mut pool = ParticlePool::with_capacity(8);
    let mut first_eight = Vec::new();
    let mut growths = Vec::new();

    for _ in 0..9 {
        let allocation = pool.allocate();
        if let Some(capacity) = allocation.grown_to {
            growths.push(capacity);
        } else {
            first_eight.push(allocation.handle);
        }
    }

    assert_eq!(growths, vec![8 + GROWTH_CHUNK_SIZE]);
    assert_eq!(pool.capacity(), 24);
    assert_eq!(pool.len(), 9);
    assert_eq!(pool.free_count(), 15);
    assert_eq!(pool.chunk_count(), 2);

    // original slots keep their order behind the new head
    let live: Vec<_> = pool.handles().skip(1).collect();
    first_eight.reverse();
    assert_eq!(live, first_eight);
    assert_conserved(&pool);
}

#[test]
fn test_growth_from_empty_pool() {
    let mut pool = ParticlePool::default();
    let allocation = pool.allocate();
    assert_eq!(allocation.grown_to, Some(GROWTH_CHUNK_SIZE));
    assert_eq!(pool.len(), 1);
    assert_conserved(&pool);
}

#[test]
fn test_handles_survive_growth() {
    let mut pool = ParticlePool::with_capacity(2);
    let first = pool.allocate().handle;
    pool.get_mut(first).current_age = 42;

    for _ in 0..40 {
        pool.allocate();
    }
    assert_eq!(pool.get(first).current_age, 42);
    assert_conserved(&pool);
}

#[derive(Debug, Clone)]
enum Op {
    Allocate,
    ReleaseHead,
    ReleaseNth(usize),
    Age(u32),
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Allocate),
        1 => Just(Op::ReleaseHead),
        1 => (0usize..64).prop_map(Op::ReleaseNth),
        2 => (1u32..400).prop_map(Op::Age),
        1 => Just(Op::Clear),
    ]
}

proptest! {
    #[test]
    fn prop_pool_conserves_slots(initial in 0usize..20, ops in prop::collection::vec(op(), 1..200)) {
        let mut pool = ParticlePool::with_capacity(initial);
        let mut expected_live = 0usize;

        for op in ops {
            match op {
                Op::Allocate => {
                    let allocation = pool.allocate();
                    prop_assert_eq!(pool.head(), Some(allocation.handle));
                    pool.get_mut(allocation.handle).total_lifetime = 500;
                    expected_live += 1;
                }
                Op::ReleaseHead => {
                    if pool.release_head().is_some() {
                        expected_live -= 1;
                    }
                }
                Op::ReleaseNth(n) => {
                    let nth = pool.handles().nth(n);
                    if let Some(handle) = nth {
                        prop_assert!(pool.release(handle));
                        prop_assert!(!pool.release(handle));
                        expected_live -= 1;
                    }
                }
                Op::Age(ms) => {
                    let evicted = pool.retain(|p| {
                        p.current_age += ms;
                        !p.is_expired()
                    });
                    expected_live -= evicted;
                    prop_assert!(pool.iter().all(|p| p.current_age <= p.total_lifetime));
                }
                Op::Clear => {
                    pool.clear();
                    expected_live = 0;
                }
            }

            prop_assert_eq!(pool.len(), expected_live);
            prop_assert_eq!((pool.capacity() - initial) % GROWTH_CHUNK_SIZE, 0);
            assert_conserved(&pool);
        }
    }
}
