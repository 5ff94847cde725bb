//! Stash/pop: save and restore LP recursion state at depth boundaries.
//!
//! Grounded on `cranelift-codegen::regalloc::context::Context`'s pattern of
//! persistent, reused-across-calls scratch storage: a `Stash` is built once
//! per `LoopBlock::optimize` invocation and its two scratch vectors are
//! pushed/popped at each recursion boundary rather than reallocated.

use crate::deps::{DepId, SatLevel};
use crate::linalg::Matrix;
use crate::schedule::scheduled_node::ScheduledNodeId;

struct PhiSnapshot {
    node: ScheduledNodeId,
    phi: Matrix,
    fusion_omega: Vec<i64>,
}

struct SatSnapshot {
    edge: DepId,
    sat_level: SatLevel,
}

/// A LIFO checkpoint stack: `push_mark`/`pop_to_mark` bracket one recursion
/// level so `LoopBlock::optimize` can try a depth speculatively and restore
/// cleanly on failure.
#[derive(Default)]
pub struct Stash {
    phis: Vec<PhiSnapshot>,
    sats: Vec<SatSnapshot>,
    marks: Vec<(usize, usize)>,
}

impl Stash {
    pub fn new() -> Self {
        Stash::default()
    }

    pub fn push_mark(&mut self) {
        self.marks.push((self.phis.len(), self.sats.len()));
    }

    pub fn save_phi(&mut self, node: ScheduledNodeId, phi: Matrix, fusion_omega: Vec<i64>) {
        self.phis.push(PhiSnapshot { node, phi, fusion_omega });
    }

    pub fn save_sat(&mut self, edge: DepId, sat_level: SatLevel) {
        self.sats.push(SatSnapshot { edge, sat_level });
    }

    /// Discard everything saved since the last `push_mark` (the speculative
    /// attempt succeeded, nothing to restore).
    pub fn commit_mark(&mut self) {
        self.marks.pop();
    }

    /// Restore every `phi`/`sat_level` saved since the last `push_mark`, in
    /// reverse order, and drop the mark.
    pub fn pop_to_mark(
        &mut self,
        nodes: &mut cranelift_entity::PrimaryMap<ScheduledNodeId, crate::schedule::ScheduledNode>,
        deps: &mut crate::deps::Dependencies,
    ) {
        let Some((phi_mark, sat_mark)) = self.marks.pop() else {
            return;
        };
        while self.sats.len() > sat_mark {
            let s = self.sats.pop().unwrap();
            deps.get_mut(s.edge).sat_level = s.sat_level;
        }
        while self.phis.len() > phi_mark {
            let p = self.phis.pop().unwrap();
            let n = &mut nodes[p.node];
            n.phi = p.phi;
            n.fusion_omega = p.fusion_omega;
        }
    }
}
