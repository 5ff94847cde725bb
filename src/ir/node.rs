//! Generic `NodeId` dispatch.
//!
//! A single `kind` discriminant plus per-kind payload, dispatched via a
//! small `match` rather than a trait object: [`NodeId`] (defined in
//! [`super::entities`]) is that discriminant, and the functions here are
//! the `match` dispatch table for the handful of operations that
//! need to cross all four node kinds uniformly (sibling-link traversal in
//! particular, used by [`crate::cursor`]).

use crate::ir::entities::{LoopIrId, NodeId};
use crate::ir::Cache;

/// Get the sibling-list `prev` link for any node kind.
pub fn prev(cache: &Cache, node: NodeId) -> Option<NodeId> {
    match node {
        NodeId::Addr(id) => cache.addrs[id].prev,
        NodeId::Compute(id) => cache.computes[id].prev,
        NodeId::Phi(id) => cache.phis[id].prev,
        NodeId::LoopIr(id) => cache.loop_irs[id].prev,
    }
}

pub fn next(cache: &Cache, node: NodeId) -> Option<NodeId> {
    match node {
        NodeId::Addr(id) => cache.addrs[id].next,
        NodeId::Compute(id) => cache.computes[id].next,
        NodeId::Phi(id) => cache.phis[id].next,
        NodeId::LoopIr(id) => cache.loop_irs[id].next,
    }
}

pub fn set_prev(cache: &mut Cache, node: NodeId, value: Option<NodeId>) {
    match node {
        NodeId::Addr(id) => cache.addrs[id].prev = value,
        NodeId::Compute(id) => cache.computes[id].prev = value,
        NodeId::Phi(id) => cache.phis[id].prev = value,
        NodeId::LoopIr(id) => cache.loop_irs[id].prev = value,
    }
}

pub fn set_next(cache: &mut Cache, node: NodeId, value: Option<NodeId>) {
    match node {
        NodeId::Addr(id) => cache.addrs[id].next = value,
        NodeId::Compute(id) => cache.computes[id].next = value,
        NodeId::Phi(id) => cache.phis[id].next = value,
        NodeId::LoopIr(id) => cache.loop_irs[id].next = value,
    }
}

/// Get the `LoopIr` a node is currently attached under, if any.
pub fn owner(cache: &Cache, node: NodeId) -> Option<LoopIrId> {
    match node {
        NodeId::Addr(id) => cache.addrs[id].owner,
        NodeId::Compute(id) => cache.computes[id].owner,
        NodeId::Phi(id) => cache.phis[id].owner,
        NodeId::LoopIr(id) => cache.loop_irs[id].owner,
    }
}

pub fn set_owner(cache: &mut Cache, node: NodeId, value: Option<LoopIrId>) {
    match node {
        NodeId::Addr(id) => cache.addrs[id].owner = value,
        NodeId::Compute(id) => cache.computes[id].owner = value,
        NodeId::Phi(id) => cache.phis[id].owner = value,
        NodeId::LoopIr(id) => cache.loop_irs[id].owner = value,
    }
}

/// Unlink `node` from whatever sibling chain it currently sits in, patching
/// its neighbors' links (and the owning `LoopIr`'s `child`/`last` if `node`
/// was the head or tail). O(1).
pub fn unlink(cache: &mut Cache, node: NodeId) {
    let p = prev(cache, node);
    let n = next(cache, node);
    match p {
        Some(p) => set_next(cache, p, n),
        None => {
            if let Some(loop_ir) = owner(cache, node) {
                cache.loop_irs[loop_ir].child = n;
            }
        }
    }
    match n {
        Some(n) => set_prev(cache, n, p),
        None => {
            if let Some(loop_ir) = owner(cache, node) {
                cache.loop_irs[loop_ir].last = p;
            }
        }
    }
    set_prev(cache, node, None);
    set_next(cache, node, None);
    set_owner(cache, node, None);
}

/// Insert `node` immediately before `at` in `at`'s sibling chain, inheriting
/// `at`'s owner (and updating the owning `LoopIr.child` link if `at` was the
/// head of the chain).
pub fn insert_before(cache: &mut Cache, at: NodeId, node: NodeId) {
    let p = prev(cache, at);
    set_next(cache, node, Some(at));
    set_prev(cache, node, p);
    set_owner(cache, node, owner(cache, at));
    match p {
        Some(p) => set_next(cache, p, Some(node)),
        None => {
            if let Some(loop_ir) = owner(cache, at) {
                cache.loop_irs[loop_ir].child = Some(node);
            }
        }
    }
    set_prev(cache, at, Some(node));
}

/// Append `node` to the end of `loop_ir`'s body chain, patching the former
/// tail's `next` link (or setting `child` when the body was empty), and
/// recording `loop_ir` as `node`'s owner.
pub fn append_child(cache: &mut Cache, loop_ir: LoopIrId, node: NodeId) {
    let last = cache.loop_irs[loop_ir].last;
    set_prev(cache, node, last);
    set_next(cache, node, None);
    set_owner(cache, node, Some(loop_ir));
    match last {
        Some(last) => set_next(cache, last, Some(node)),
        None => cache.loop_irs[loop_ir].child = Some(node),
    }
    cache.loop_irs[loop_ir].last = Some(node);
}
