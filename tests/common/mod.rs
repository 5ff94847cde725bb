//! Shared fixture builders for the scenario-level integration tests.
//!
//! No parser sits in front of this crate (host-IR ingestion is out of
//! scope), so every fixture here builds `Addr`/`AffineLoop` values directly,
//! the way a unit test for an egraph-backed compiler crate constructs IR by
//! hand rather than by running a front end.

use polysched::host::AffineExpr;
use polysched::ir::{AccessMatrices, Addr, ArrayId, Cache, ElementType, LoopHandle, NO_DEP};
use polysched::linalg::Matrix;

/// A single-level loop `0 <= i < trip_count`, no dynamic symbols.
pub fn push_flat_loop(cache: &mut Cache, trip_count: i64) -> LoopHandle {
    let a = Matrix::from_rows(&[vec![trip_count - 1, -1]]);
    cache.push_loop(polysched::AffineLoop::from_matrix(1, vec![], a, true))
}

/// A 1-D access `array[i]` (coefficient 1 on the single loop variable, no
/// constant offset) at the given `loop_handle`, placed at `fusion_slot`
/// within its body.
pub fn push_1d_addr(
    cache: &mut Cache,
    array: ArrayId,
    loop_handle: LoopHandle,
    is_store: bool,
    coeff: i64,
    const_offset: i64,
    fusion_slot: i64,
) -> polysched::ir::AddrId {
    let access = AccessMatrices {
        denom: 1,
        offset_omega: vec![const_offset],
        index_matrix: Matrix::from_rows(&[vec![coeff]]),
        offset_symbols: Matrix::zeros(1, 0),
        fusion_omega: vec![0, fusion_slot],
    };
    let addr = Addr {
        array,
        array_dim_sizes: vec![AffineExpr {
            constant: 1024,
            terms: vec![],
        }],
        element_type: ElementType::I64,
        alignment_shift: 3,
        loop_handle,
        access,
        predicate: None,
        is_store,
        stored_value: None,
        load_value: None,
        edge_in: NO_DEP,
        edge_out: NO_DEP,
        hoist_mask: Default::default(),
        orth_axes: 0,
        current_depth: 1,
        natural_depth: 1,
        max_depth: 1,
        loopdeps: polysched::bitset::LoopMask::singleton(0),
        dropped: false,
        is_reload: false,
        reload_source: None,
        prev: None,
        next: None,
        owner: None,
    };
    cache.push_addr(addr)
}

/// A `num_loops`-deep box nest `0 <= i_k < trip_counts[k]` for every `k`, no
/// dynamic symbols — the multi-level analogue of [`push_flat_loop`].
pub fn push_nested_loop(cache: &mut Cache, trip_counts: &[i64]) -> LoopHandle {
    let num_loops = trip_counts.len();
    let cols = 1 + num_loops;
    let mut rows = Vec::with_capacity(num_loops);
    for (k, &trip_count) in trip_counts.iter().enumerate() {
        let mut row = vec![0i64; cols];
        row[0] = trip_count - 1;
        row[1 + k] = -1;
        rows.push(row);
    }
    let a = Matrix::from_rows(&rows);
    cache.push_loop(polysched::AffineLoop::from_matrix(num_loops, vec![], a, true))
}

/// A general-purpose access into `loop_handle`'s `num_loops`-deep nest:
/// `index_rows[d]` gives one coefficient per loop variable for array
/// dimension `d`, `offset_omega[d]` its constant term.
pub fn push_nd_addr(
    cache: &mut Cache,
    array: ArrayId,
    loop_handle: LoopHandle,
    is_store: bool,
    index_rows: Vec<Vec<i64>>,
    offset_omega: Vec<i64>,
    fusion_omega: Vec<i64>,
) -> polysched::ir::AddrId {
    let num_loops = index_rows.first().map_or(0, |r| r.len());
    let mut mask = polysched::bitset::LoopMask::EMPTY;
    for row in &index_rows {
        for (k, &c) in row.iter().enumerate() {
            if c != 0 {
                mask.insert(k as u8);
            }
        }
    }
    let natural_depth = (0..num_loops).rev().find(|&k| mask.contains(k as u8)).map_or(0, |k| k + 1);
    let access = AccessMatrices {
        denom: 1,
        offset_omega,
        index_matrix: Matrix::from_rows(&index_rows),
        offset_symbols: Matrix::zeros(index_rows.len(), 0),
        fusion_omega,
    };
    let addr = Addr {
        array,
        array_dim_sizes: (0..index_rows.len()).map(|_| AffineExpr { constant: 1024, terms: vec![] }).collect(),
        element_type: ElementType::I64,
        alignment_shift: 3,
        loop_handle,
        access,
        predicate: None,
        is_store,
        stored_value: None,
        load_value: None,
        edge_in: NO_DEP,
        edge_out: NO_DEP,
        hoist_mask: Default::default(),
        orth_axes: 0,
        current_depth: num_loops,
        natural_depth,
        max_depth: num_loops,
        loopdeps: mask,
        dropped: false,
        is_reload: false,
        reload_source: None,
        prev: None,
        next: None,
        owner: None,
    };
    cache.push_addr(addr)
}

/// An access to a size-1 array that doesn't vary with `loop_handle`'s
/// induction variable at all (coefficient 0, empty `loopdeps`) — the
/// register-resident accumulator shape the dot-product/reduction scenarios
/// read and write each iteration.
pub fn push_scalar_addr(cache: &mut Cache, array: ArrayId, loop_handle: LoopHandle, is_store: bool, fusion_slot: i64) -> polysched::ir::AddrId {
    let access = AccessMatrices {
        denom: 1,
        offset_omega: vec![0],
        index_matrix: Matrix::from_rows(&[vec![0]]),
        offset_symbols: Matrix::zeros(1, 0),
        fusion_omega: vec![0, fusion_slot],
    };
    let addr = Addr {
        array,
        array_dim_sizes: vec![AffineExpr { constant: 1, terms: vec![] }],
        element_type: ElementType::I64,
        alignment_shift: 3,
        loop_handle,
        access,
        predicate: None,
        is_store,
        stored_value: None,
        load_value: None,
        edge_in: NO_DEP,
        edge_out: NO_DEP,
        hoist_mask: Default::default(),
        orth_axes: 0,
        current_depth: 1,
        natural_depth: 0,
        max_depth: 1,
        loopdeps: polysched::bitset::LoopMask::EMPTY,
        dropped: false,
        is_reload: false,
        reload_source: None,
        prev: None,
        next: None,
        owner: None,
    };
    cache.push_addr(addr)
}
