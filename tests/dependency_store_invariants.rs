//! Dependency-bookkeeping invariants from the testable-properties section:
//! after `check`/`remove_edge`, every live edge appears exactly once in each
//! endpoint's adjacency chain, and a self-carried (time-dimension) access
//! pair produces a forward edge paired with exactly one reverse-time edge.

mod common;

use cranelift_entity::EntityRef;
use polysched::deps::Dependencies;
use polysched::ir::{ArrayId, Cache};
use polysched::Stats;

/// A load and a store to the same 1-D array at the same loop, both with
/// coefficient 1 on the (shared) loop variable: the canonical
/// accumulator-style self-carried access pair (`s`'s load/store in a
/// reduction), which forces a non-trivial time dimension in the
/// dependence polyhedron.
fn build_self_carried_pair(cache: &mut Cache) -> (polysched::ir::AddrId, polysched::ir::AddrId) {
    let loop_handle = common::push_flat_loop(cache, 32);
    let array = ArrayId::new(0);
    let load = common::push_1d_addr(cache, array, loop_handle, false, 1, 0, 0);
    let store = common::push_1d_addr(cache, array, loop_handle, true, 1, 0, 1);
    (load, store)
}

#[test]
fn self_carried_access_produces_forward_and_one_reverse_edge() {
    let mut cache = Cache::new();
    let mut deps = Dependencies::new();
    let mut stats = Stats::new();

    let (load, store) = build_self_carried_pair(&mut cache);
    let ids = deps.check(&mut cache, store, load, &mut stats);

    assert_eq!(ids.len(), 2, "one forward edge plus exactly one reverse-time edge");
    let (a, b) = (ids[0], ids[1]);

    let a_meta = deps.get_meta(a);
    let b_meta = deps.get_meta(b);
    assert!(a_meta.contains(polysched::deps::DepMeta::FORWARD));
    assert!(b_meta.contains(polysched::deps::DepMeta::REVERSE_TIME));

    // The two are paired symmetrically via `rev_time_edge`.
    assert_eq!(deps.get(a).rev_time_edge, b.index() as i32);
    assert_eq!(deps.get(b).rev_time_edge, a.index() as i32);

    // Forward edge: input -> output per `check_direction`'s lexicographic
    // comparison of `fusion_omega` (load precedes store within an
    // iteration), so `load`'s out-chain and `store`'s in-chain both carry
    // the forward edge exactly once.
    let forward_input = deps.get(a).input;
    let forward_output = deps.get(a).output;
    assert_eq!(deps.output_edges(&cache, forward_input).filter(|&id| id == a).count(), 1);
    assert_eq!(deps.input_edges(&cache, forward_output).filter(|&id| id == a).count(), 1);

    // Reverse-time edge has endpoints swapped.
    assert_eq!(deps.get(b).input, forward_output);
    assert_eq!(deps.get(b).output, forward_input);
    assert_eq!(deps.output_edges(&cache, forward_output).filter(|&id| id == b).count(), 1);
    assert_eq!(deps.input_edges(&cache, forward_input).filter(|&id| id == b).count(), 1);
}

#[test]
fn remove_edge_unlinks_from_both_chains() {
    let mut cache = Cache::new();
    let mut deps = Dependencies::new();
    let mut stats = Stats::new();

    let (load, store) = build_self_carried_pair(&mut cache);
    let ids = deps.check(&mut cache, store, load, &mut stats);
    let forward = ids[0];
    let forward_input = deps.get(forward).input;
    let forward_output = deps.get(forward).output;

    deps.remove_edge(&mut cache, forward, true, true);

    assert_eq!(
        deps.output_edges(&cache, forward_input).filter(|&id| id == forward).count(),
        0
    );
    assert_eq!(
        deps.input_edges(&cache, forward_output).filter(|&id| id == forward).count(),
        0
    );

    // The reverse-time edge was not touched by unlinking the forward edge:
    // its own chain membership is independent bookkeeping.
    let reverse = ids[1];
    assert_eq!(
        deps.output_edges(&cache, forward_output).filter(|&id| id == reverse).count(),
        1
    );
}

#[test]
fn independent_arrays_never_produce_an_edge() {
    let mut cache = Cache::new();
    let mut deps = Dependencies::new();
    let mut stats = Stats::new();

    let loop_handle = common::push_flat_loop(&mut cache, 32);
    let a = common::push_1d_addr(&mut cache, ArrayId::new(0), loop_handle, false, 1, 0, 0);
    let b = common::push_1d_addr(&mut cache, ArrayId::new(1), loop_handle, true, 1, 0, 1);

    assert!(deps.check(&mut cache, a, b, &mut stats).is_empty());
}

#[test]
fn determine_peel_depth_none_when_both_sides_share_the_target_loop() {
    let mut cache = Cache::new();
    let mut deps = Dependencies::new();
    let mut stats = Stats::new();

    let (load, store) = build_self_carried_pair(&mut cache);
    let ids = deps.check(&mut cache, store, load, &mut stats);
    let forward = ids[0];

    // Both endpoints depend on loop 0 (the only loop in this fixture), so
    // `determine_peel_depth` must report `None` rather than inventing a
    // peel axis neither side actually needs.
    assert_eq!(deps.determine_peel_depth(&cache, forward, 0), None);
    assert_eq!(deps.get(forward).peel, polysched::deps::PEEL_NONE);
}
