//! Entity references into the per-kind `PrimaryMap`s owned by [`super::Cache`].
//!
//! Every "pointer" field in the data model (`Addr*`, `Compute*`, the
//! doubly-linked chain fields) becomes one of these small `Copy` index
//! types, exactly the way `cranelift-codegen::ir::entities` turns every CLIF
//! reference (`Value`, `Block`, `Inst`, ...) into a `u32`-backed index rather
//! than a pointer.

use cranelift_entity::{entity_impl, EntityRef};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddrId(u32);
entity_impl!(AddrId, "addr");

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputeId(u32);
entity_impl!(ComputeId, "compute");

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhiId(u32);
entity_impl!(PhiId, "phi");

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoopIrId(u32);
entity_impl!(LoopIrId, "loopir");

/// A reference to an [`crate::affine_loop::AffineLoop`] value owned by the
/// `Cache`. Several `Addr`s in the same nest share the loop they're enclosed
/// by; rotating or peeling produces a new `AffineLoop` value and thus a new
/// handle, rather than mutating shared state other accesses still reference.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoopHandle(u32);
entity_impl!(LoopHandle, "loophandle");

impl std::fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "loophandle{}", self.index())
    }
}

/// A reference to any of the four node kinds above, tagged so a single
/// `match` dispatches without a vtable.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum NodeId {
    Addr(AddrId),
    Compute(ComputeId),
    Phi(PhiId),
    LoopIr(LoopIrId),
}

impl NodeId {
    pub fn as_addr(self) -> Option<AddrId> {
        match self {
            NodeId::Addr(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_compute(self) -> Option<ComputeId> {
        match self {
            NodeId::Compute(c) => Some(c),
            _ => None,
        }
    }
}

/// A reference to a value-producing node: either a `Compute` op or a `Phi`
/// merge. `Compute::operands`, `Addr::stored_value`, and `Phi::incoming`/
/// `Phi::latch` all need this rather than plain `ComputeId`, since a
/// reduction's accumulator value may itself be the output of another `Phi`
/// (an inner accum feeding an outer join, or a join feeding the store it
/// closes) rather than always a fresh arithmetic op.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ValueId {
    Compute(ComputeId),
    Phi(PhiId),
}

impl ValueId {
    pub fn as_compute(self) -> Option<ComputeId> {
        match self {
            ValueId::Compute(c) => Some(c),
            ValueId::Phi(_) => None,
        }
    }

    pub fn as_phi(self) -> Option<PhiId> {
        match self {
            ValueId::Phi(p) => Some(p),
            ValueId::Compute(_) => None,
        }
    }
}

impl From<ComputeId> for ValueId {
    fn from(c: ComputeId) -> Self {
        ValueId::Compute(c)
    }
}

impl From<PhiId> for ValueId {
    fn from(p: PhiId) -> Self {
        ValueId::Phi(p)
    }
}

impl std::fmt::Debug for AddrId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "addr{}", self.index())
    }
}

impl std::fmt::Debug for ComputeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "compute{}", self.index())
    }
}

impl std::fmt::Debug for PhiId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "phi{}", self.index())
    }
}

impl std::fmt::Debug for LoopIrId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "loopir{}", self.index())
    }
}

/// Identity of a backing array (out-of-scope allocation details; this crate
/// only needs a stable handle to compare accesses against and to forward to
/// the `AliasQuery` host trait).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrayId(u32);
entity_impl!(ArrayId, "array");

impl std::fmt::Debug for ArrayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "array{}", self.index())
    }
}

/// The operation an opaque [`crate::ir::compute::Compute`] node performs.
/// This crate never interprets an opcode's semantics itself (arithmetic
/// simplification, constant folding are out of scope) — it only forwards
/// the tag to the host's [`crate::host::CostModel`] and to the
/// reassociable-reduction classifier, which only needs to know whether an
/// opcode is associative/commutative.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
    And,
    Or,
    Xor,
    Cmp,
    Select,
    Cast,
    Call(u32),
    Intrinsic(u32),
    Opaque,
}

impl Opcode {
    /// Associative and commutative opcodes are the only ones a reduction
    /// chain may reassociate across.
    pub fn is_associative_commutative(self) -> bool {
        matches!(
            self,
            Opcode::Add | Opcode::Mul | Opcode::Min | Opcode::Max | Opcode::And | Opcode::Or | Opcode::Xor
        )
    }
}
