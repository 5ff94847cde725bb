//! `LoopTree`: a scratch prefix tree over solved `ScheduledNode`s, keyed by
//! their `fusion_omega` tuple.
//!
//! For each node, the outer-to-inner `fusion_omega` entries are walked one
//! level at a time; each level either reuses an existing child of the
//! current tree position or creates a new one. `AffineLoop::rotate` is
//! applied once per node, using the node's solved Φ matrix as the unimodular
//! rotation, so every `LoopIr` on that node's path holds the schedule the LP
//! block decided rather than the pre-schedule source order.
//!
//! Simplification (recorded in `DESIGN.md`): every `LoopIr` on a node's path
//! shares the same post-rotation `AffineLoop` (the full `num_loops`-deep
//! polytope) rather than a level-specific Fourier–Motzkin projection onto
//! just that level's bounds. The legality and scheduling contracts this
//! crate guarantees (the Φ matrix and the `Legality` record) don't depend on
//! per-level projected bounds, only on which loop induces which tree level,
//! so this avoids doing FM-elimination work with no observable payoff.

use crate::fx::FxHashMap;
use crate::ir::{Cache, LoopHandle, LoopIr, LoopIrId, NodeId};
use crate::schedule::{ScheduledNode, ScheduledNodeId};

pub struct LoopTree {
    roots: FxHashMap<i64, LoopIrId>,
}

impl LoopTree {
    /// Build the tree from the solved node list, attaching each node's
    /// store (and its loads, immediately preceding the store) at the leaf
    /// `LoopIr` its `fusion_omega` addresses.
    pub fn build(
        cache: &mut Cache,
        nodes: &cranelift_entity::PrimaryMap<ScheduledNodeId, ScheduledNode>,
    ) -> LoopTree {
        let mut tree = LoopTree {
            roots: FxHashMap::default(),
        };
        let mut children_of: FxHashMap<(LoopIrId, i64), LoopIrId> = FxHashMap::default();

        for node in nodes.values() {
            tree.insert(cache, node, &mut children_of);
        }

        tree
    }

    fn insert(
        &mut self,
        cache: &mut Cache,
        node: &ScheduledNode,
        children_of: &mut FxHashMap<(LoopIrId, i64), LoopIrId>,
    ) {
        let rotated = Self::rotated_loop_handle(cache, node);
        let mut parent: Option<LoopIrId> = None;

        for depth in 0..node.num_loops {
            let key = node.fusion_omega.get(depth).copied().unwrap_or(0);
            let loop_ir = match parent {
                None => *self
                    .roots
                    .entry(key)
                    .or_insert_with(|| cache.push_loop_ir(LoopIr::new(rotated))),
                Some(p) => *children_of.entry((p, key)).or_insert_with(|| {
                    let child = cache.push_loop_ir(LoopIr::new(rotated));
                    crate::ir::node::append_child(cache, p, NodeId::LoopIr(child));
                    child
                }),
            };
            parent = Some(loop_ir);
        }

        if let Some(leaf) = parent {
            for &load in &node.loads {
                crate::ir::node::append_child(cache, leaf, NodeId::Addr(load));
            }
            crate::ir::node::append_child(cache, leaf, NodeId::Addr(node.store));
        }
    }

    /// Rotate the node's full loop nest by its solved Φ matrix, applying the
    /// canonical shift `offsets` computed by `shift_omega`. One rotation per
    /// node, reused across every tree level on that node's path.
    fn rotated_loop_handle(cache: &mut Cache, node: &ScheduledNode) -> LoopHandle {
        let base = cache.loops[node.loop_nest].clone();
        let n = base.num_loops();
        if n == 0 || node.phi.rows() != n || node.phi.cols() != n {
            return node.loop_nest;
        }
        let rotated = base.rotate(&node.phi, &node.offsets);
        cache.push_loop(rotated)
    }

    pub fn root_ids(&self) -> Vec<LoopIrId> {
        self.roots.values().copied().collect()
    }
}
