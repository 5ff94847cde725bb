//! `Compute`: an arithmetic/call/opaque operation node.

use smallvec::SmallVec;

use crate::ir::entities::{ComputeId, NodeId, Opcode, ValueId};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ComputeKind {
    Func,
    Call,
    Op,
}

/// IEEE fast-math relaxations this node's users are allowed to assume,
/// mirrored straight through from the host IR (interpreting them is out of
/// scope; the reassociable-reduction classifier only checks `allow_reassoc`).
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub struct FastMathFlags {
    pub allow_reassoc: bool,
    pub no_nans: bool,
    pub no_signed_zeros: bool,
}

#[derive(Clone, Debug)]
pub struct Compute {
    pub opcode: Opcode,
    pub kind: ComputeKind,
    /// Operands; a node with incomplete operand wiring (still under
    /// construction) reports a negative `num_operands` in the original
    /// design. Here that's modeled as operands simply not all being filled
    /// in yet, tracked by `complete`. An operand may itself be a `Phi`
    /// rather than another `Compute` (e.g. a divide consuming a reduction's
    /// join value), hence `ValueId` rather than `ComputeId`.
    pub operands: SmallVec<[ValueId; 4]>,
    pub complete: bool,
    pub fast_math_flags: FastMathFlags,
    pub users: SmallVec<[ComputeId; 4]>,

    /// Set when this node has been identified as the head of a reassociable
    /// reduction chain; points at the `Phi` that closes the loop.
    pub reduction_dst: Option<crate::ir::entities::PhiId>,

    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    /// The `LoopIr` this node was appended into, if any. Unset for the
    /// common case of a `Compute` reachable only via operand pointers from
    /// an `Addr`, never itself a body child.
    pub owner: Option<crate::ir::entities::LoopIrId>,
}

impl Compute {
    pub fn new(opcode: Opcode, kind: ComputeKind) -> Self {
        Compute {
            opcode,
            kind,
            operands: SmallVec::new(),
            complete: false,
            fast_math_flags: FastMathFlags::default(),
            users: SmallVec::new(),
            reduction_dst: None,
            prev: None,
            next: None,
            owner: None,
        }
    }

    pub fn push_operand(&mut self, operand: impl Into<ValueId>) {
        self.operands.push(operand.into());
    }
}
