//! Coverage for the two multi-level-nest mechanisms the triangular-solve
//! scenario exercises — `AffineLoop::rotate` and `determine_peel_depth`'s
//! multi-level branch — without reconstructing that scenario's full
//! dynamic-bound, three-deep recurrence (which needs a `BackedgeCount`
//! host fixture beyond what `tests/common` builds). See
//! `pipeline_reduction.rs`/`scenario_3_matrix_multiply.rs` for full
//! `LoopBlock::optimize` pipeline runs.

mod common;

use cranelift_entity::EntityRef;
use polysched::deps::Dependencies;
use polysched::ir::{ArrayId, Cache};
use polysched::linalg::Matrix;
use polysched::Stats;

/// "Rotation round-trip" (testable property from the end-to-end
/// properties list): rotating a two-level nest by a permutation and then
/// by its own inverse must recover the original constraint matrix exactly.
/// A transposition is its own inverse, so a single swap matrix serves as
/// both `R` and `R^-1` with a zero offset on both legs.
#[test]
fn rotate_by_a_transposition_twice_is_the_identity() {
    let loop_ = {
        let mut cache = Cache::new();
        let handle = common::push_nested_loop(&mut cache, &[8, 5]);
        cache.loops[handle].clone()
    };

    let swap = Matrix::from_rows(&[vec![0, 1], vec![1, 0]]);
    let rotated = loop_.rotate(&swap, &[0, 0]);

    // After one swap, the original "i < 8" bound now constrains the inner
    // variable and "j < 5" constrains the outer one.
    assert_eq!(rotated.constraints().row(0), &[7, 0, -1]);
    assert_eq!(rotated.constraints().row(1), &[4, -1, 0]);

    let back = rotated.rotate(&swap, &[0, 0]);
    assert_eq!(back.constraints().row(0), loop_.constraints().row(0));
    assert_eq!(back.constraints().row(1), loop_.constraints().row(1));
    assert_eq!(back.is_non_negative(), loop_.is_non_negative());
}

/// `determine_peel_depth`'s multi-level branch: the input access depends
/// on the outer loop (0) but not the inner one (1), the output depends on
/// the inner loop but not the outer one. At target depth 0 the two sides
/// disagree, and the output side (the one that doesn't depend on depth 0)
/// still varies at the deeper level 1, so peeling at depth 0 is still
/// meaningful: `Some(0)`. Contrast with
/// `dependency_store_invariants.rs::determine_peel_depth_none_when_both_sides_share_the_target_loop`,
/// where both sides depend on the one and only loop and the answer is
/// `None`.
#[test]
fn determine_peel_depth_some_when_the_non_depending_side_still_varies_deeper() {
    let mut cache = Cache::new();
    let mut deps = Dependencies::new();
    let mut stats = Stats::new();

    let loop_handle = common::push_nested_loop(&mut cache, &[8, 8]);
    let array = ArrayId::new(0);

    // A[i]: depends on loop 0 only.
    let input = common::push_nd_addr(&mut cache, array, loop_handle, false, vec![vec![1, 0]], vec![0], vec![0, 0]);
    // A[j]: depends on loop 1 only.
    let output = common::push_nd_addr(&mut cache, array, loop_handle, true, vec![vec![0, 1]], vec![0], vec![0, 1]);

    let ids = deps.check(&mut cache, input, output, &mut stats);
    assert!(!ids.is_empty(), "same-array accesses must produce at least one dependence edge");
    let forward = ids[0];

    assert_eq!(deps.determine_peel_depth(&cache, forward, 0), Some(0));
}
