//! Per-loop-body hoist classification and dependency-respecting ordering.

use crate::deps::Dependencies;
use crate::fx::FxHashSet;
use crate::ir::{AddrId, Cache, LoopIrId, NodeId};

/// Walk the tree rooted at `root` depth-first, innermost first, classifying
/// loop-independent addresses as hoist candidates and reordering each
/// all-`Addr` body into an order that respects every dependency edge
/// between addresses in that same body.
pub fn sort_tree(cache: &mut Cache, deps: &Dependencies, root: LoopIrId) {
    sort_subtree(cache, deps, root, 0);
}

fn sort_subtree(cache: &mut Cache, deps: &Dependencies, loop_ir: LoopIrId, depth: usize) {
    let mut children = Vec::new();
    let mut cur = cache.loop_irs[loop_ir].child;
    while let Some(n) = cur {
        children.push(n);
        cur = crate::ir::node::next(cache, n);
    }

    for &n in &children {
        if let NodeId::LoopIr(child) = n {
            sort_subtree(cache, deps, child, depth + 1);
        }
    }

    classify_hoist(cache, &children, depth);
    reorder_body(cache, deps, loop_ir, &children);
}

/// An `Addr` whose access matrix has no component at this level's loop
/// variable is loop-independent here: a load can be computed once ahead of
/// the loop (the pre-header), a store's final value can be written once
/// after it (the post-exit).
fn classify_hoist(cache: &mut Cache, children: &[NodeId], depth: usize) {
    for &n in children {
        if let NodeId::Addr(id) = n {
            let loop_independent = !cache.addrs[id].loopdeps.contains(depth as u8);
            if loop_independent {
                if cache.addrs[id].is_load() {
                    cache.addrs[id].hoist_mask.set_front();
                } else {
                    cache.addrs[id].hoist_mask.set_behind();
                }
            }
        }
    }
}

/// Only reorders when every direct child of this body is an `Addr`: a body
/// holding nested `LoopIr`s is left in insertion order, since interleaving a
/// nested loop with sibling addresses correctly would need to reason about
/// the nested loop's own dependency footprint as a unit, which the
/// per-address edge walk below does not model.
fn reorder_body(cache: &mut Cache, deps: &Dependencies, loop_ir: LoopIrId, children: &[NodeId]) {
    if children.len() < 2 || !children.iter().all(|n| matches!(n, NodeId::Addr(_))) {
        return;
    }
    let addrs: Vec<AddrId> = children.iter().map(|n| n.as_addr().unwrap()).collect();

    let mut visited: FxHashSet<AddrId> = FxHashSet::default();
    let mut on_stack: FxHashSet<AddrId> = FxHashSet::default();
    let mut order: Vec<AddrId> = Vec::with_capacity(addrs.len());

    for &a in &addrs {
        visit(cache, deps, a, &addrs, &mut visited, &mut on_stack, &mut order);
    }

    // `visit` is a post-order walk along predecessor -> successor edges, so
    // a node is pushed only once every node it must precede is already in
    // `order`; reversing yields a topological order (predecessors first).
    order.reverse();
    relink_body(cache, loop_ir, &order);
}

fn visit(
    cache: &Cache,
    deps: &Dependencies,
    a: AddrId,
    scope: &[AddrId],
    visited: &mut FxHashSet<AddrId>,
    on_stack: &mut FxHashSet<AddrId>,
    order: &mut Vec<AddrId>,
) {
    if visited.contains(&a) {
        return;
    }
    if !on_stack.insert(a) {
        // A cycle among addresses sharing this body (shouldn't occur for a
        // legally scheduled nest); leave the remaining relative order as is
        // rather than looping forever.
        return;
    }
    for id in deps.output_edges(cache, a) {
        let succ = deps.get(id).output;
        if scope.contains(&succ) {
            visit(cache, deps, succ, scope, visited, on_stack, order);
        }
    }
    on_stack.remove(&a);
    visited.insert(a);
    order.push(a);
}

fn relink_body(cache: &mut Cache, loop_ir: LoopIrId, order: &[AddrId]) {
    cache.loop_irs[loop_ir].child = None;
    cache.loop_irs[loop_ir].last = None;
    for &a in order {
        crate::ir::node::append_child(cache, loop_ir, NodeId::Addr(a));
    }
}
