//! Narrow interfaces to the collaborators this engine never implements
//! itself — target cost, symbolic trip counts, alias facts, diagnostics.
//!
//! This crate never links against a particular host compiler. Everywhere
//! the algorithm needs a fact only the host can supply — a target-dependent
//! cost, a symbolic trip count, an alias-analysis fact — it asks through one
//! of these traits instead. Each has a no-op default implementation so
//! tests (and embedders that don't care about a given axis) aren't forced
//! to wire up real answers.

use crate::affine_loop::AffineLoop;
use crate::ir::Opcode;

/// A loop trip count that could not be computed affinely. Mirrors the
/// `CouldNotCompute` sentinel from SCEV-like analyses: the engine proceeds
/// on the affinely-representable subset rather than treating this as fatal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CouldNotCompute;

/// Query interface for the host's symbolic backedge-count evaluator.
///
/// Out of scope: the actual SCEV-like simplifier. This crate only calls
/// `backedge_count` while walking a source loop handle in
/// `AffineLoop::construct`.
pub trait BackedgeCount<SourceLoop> {
    /// Either an affine expression (already decomposed into
    /// constant + per-symbol coefficients by the caller) or
    /// [`CouldNotCompute`].
    fn backedge_count(&self, loop_handle: &SourceLoop) -> Result<AffineExpr, CouldNotCompute>;
}

/// A minimal affine expression over dynamic symbols: `constant + sum(coeff * symbol)`.
#[derive(Clone, Debug, Default)]
pub struct AffineExpr {
    pub constant: i64,
    pub terms: Vec<(crate::symbol::Symbol, i64)>,
}

/// Target-cost query, consumed only by `Compute::calc_cost` (cost modeling
/// itself is out of scope; this crate just forwards to whatever the host
/// provides when comparing two legal schedules of otherwise-equal rank).
pub trait CostModel {
    fn memory_op_cost(&self, bytes: u32) -> u32;
    fn arithmetic_op_cost(&self, opcode: Opcode) -> u32;
    fn cmp_sel_cost(&self) -> u32;
    fn cast_cost(&self) -> u32;
    fn intrinsic_cost(&self, opcode: Opcode) -> u32;
    fn has_fma(&self) -> bool;
    fn vector_register_bit_width(&self) -> u32;
}

/// A cost model that treats every operation as unit cost. Useful for tests
/// and for embedders that haven't wired up a real target yet.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCostModel;

impl CostModel for NoopCostModel {
    fn memory_op_cost(&self, _bytes: u32) -> u32 {
        1
    }
    fn arithmetic_op_cost(&self, _opcode: Opcode) -> u32 {
        1
    }
    fn cmp_sel_cost(&self) -> u32 {
        1
    }
    fn cast_cost(&self) -> u32 {
        1
    }
    fn intrinsic_cost(&self, _opcode: Opcode) -> u32 {
        1
    }
    fn has_fma(&self) -> bool {
        false
    }
    fn vector_register_bit_width(&self) -> u32 {
        128
    }
}

/// Pointer-aliasing facts needed by `eliminate_temporaries`.
pub trait AliasQuery<ArrayId> {
    /// Is this array a stack/heap allocation that provably does not escape
    /// the current region?
    fn is_non_escaping_local_object(&self, array: ArrayId) -> bool;
    /// Is the allocation itself removable if every access to it is dropped?
    fn is_removable_alloc(&self, array: ArrayId) -> bool;
}

/// A conservative alias oracle that answers "no" to everything, i.e. never
/// allows temporary elimination. Safe default for embedders without a real
/// alias analysis wired up yet.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConservativeAliasQuery;

impl<ArrayId> AliasQuery<ArrayId> for ConservativeAliasQuery {
    fn is_non_escaping_local_object(&self, _array: ArrayId) -> bool {
        false
    }
    fn is_removable_alloc(&self, _array: ArrayId) -> bool {
        false
    }
}

/// Optimization-remark emission, entirely out of scope functionally but
/// still a call site the core invokes so a host compiler can surface why a
/// region was left untransformed.
pub trait Remarks {
    fn reject(&mut self, loop_: &AffineLoop, reason: &str);
}

/// A `Remarks` implementation that drops everything on the floor. The
/// default for tests and for embedders without a diagnostics pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRemarks;

impl Remarks for NoopRemarks {
    fn reject(&mut self, _loop_: &AffineLoop, _reason: &str) {}
}
