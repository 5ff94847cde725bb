//! `Phi`: a two-input merge node placed at a loop, modeling a hoisted
//! accumulator or the join of a reduction.

use crate::ir::entities::{LoopIrId, NodeId, ValueId};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PhiKind {
    /// Same depth as its second (loop-carried) operand: a true accumulator,
    /// updated once per iteration.
    Accum,
    /// One shallower than its second operand: joins a value computed inside
    /// the loop back out to the enclosing level.
    Join,
}

#[derive(Clone, Debug)]
pub struct Phi {
    pub loop_ir: LoopIrId,
    pub kind: PhiKind,
    /// The value flowing in from outside the loop (or from the previous
    /// level, for a join). May itself be another `Phi` (a join chained
    /// directly off an inner accum).
    pub incoming: ValueId,
    /// The value flowing in from the latch (the loop-carried operand):
    /// the per-iteration recomputation for an accum, or the inner accum's
    /// final value for a join.
    pub latch: ValueId,

    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    pub owner: Option<LoopIrId>,
}

impl Phi {
    pub fn depth_matches_latch(&self) -> bool {
        matches!(self.kind, PhiKind::Accum)
    }
}
