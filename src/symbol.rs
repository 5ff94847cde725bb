//! Symbolic scalars: opaque, loop-invariant integer-valued quantities used
//! as column indices in symbolic matrices.
//!
//! "Pointer identity" from the data model becomes index identity: a
//! `Symbol` is an `EntityRef` into the `Cache`'s symbol table, exactly the
//! way `cranelift-codegen::ir::entities::Value` is an index into a
//! function's `DataFlowGraph` rather than a real pointer.

use cranelift_entity::entity_impl;

/// An opaque reference to a loop-invariant symbolic value appearing in a
/// loop bound or an access offset.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);
entity_impl!(Symbol, "sym");

/// Per-symbol bookkeeping the engine keeps; the symbolic value itself (the
/// host IR value it denotes) is opaque to this crate and stored by the
/// embedder out-of-band, keyed by `Symbol`.
#[derive(Clone, Debug, Default)]
pub struct SymbolData {
    /// True if this symbol was synthesized by peeling an outer loop into a
    /// dynamic symbol (`AffineLoop::remove_outer_most`), as opposed to
    /// being present in the original source bounds.
    pub synthesized_from_peel: bool,
}
