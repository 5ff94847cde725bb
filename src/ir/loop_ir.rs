//! `LoopIr`: a node in the reconstructed loop-nest tree, plus its
//! `Legality` record.

use crate::bitset::LoopMask;
use crate::ir::entities::{LoopHandle, LoopIrId, NodeId};

/// Per-loop legality summary produced by `IROptimizer`'s position & legality
/// pass.
#[derive(Clone, Debug, Default)]
pub struct Legality {
    /// False only when some dependency at this level has
    /// `determine_peel_depth` return `None`. A non-zero `peel_flag` does
    /// *not* imply `reorderable = false`; peeling is a separate rewrite.
    pub reorderable: bool,
    pub ordered_reduction_count: u32,
    pub unordered_reduction_count: u32,
    /// Loops that must be peeled when equal to this one, keyed by depth.
    pub peel_flag: LoopMask,
}

impl Legality {
    pub fn new() -> Self {
        Legality {
            reorderable: true,
            ordered_reduction_count: 0,
            unordered_reduction_count: 0,
            peel_flag: LoopMask::EMPTY,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoopIr {
    pub loop_handle: LoopHandle,
    /// First body node, or `None` for an empty loop.
    pub child: Option<NodeId>,
    /// Tail pointer for reverse-order walks while building the body.
    pub last: Option<NodeId>,
    /// Ids of the dependency edges satisfied at this loop level.
    pub edges: Vec<crate::deps::edge::DepId>,
    pub legality: Legality,

    /// Topological position, assigned by `IROptimizer`'s position pass.
    pub top_idx: u32,
    /// Index of the enclosing basic block in the final nest.
    pub blk_idx: u32,

    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    /// The enclosing `LoopIr`, or `None` at the root. Mirrors `owner` on the
    /// other three node kinds so `crate::ir::node` can dispatch uniformly.
    pub owner: Option<LoopIrId>,
}

impl LoopIr {
    pub fn new(loop_handle: LoopHandle) -> Self {
        LoopIr {
            loop_handle,
            child: None,
            last: None,
            edges: Vec::new(),
            legality: Legality::new(),
            top_idx: 0,
            blk_idx: 0,
            prev: None,
            next: None,
            owner: None,
        }
    }
}
