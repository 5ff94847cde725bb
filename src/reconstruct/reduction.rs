//! Reduction `Phi`-pair insertion.
//!
//! Runs once per tree, bottom-up, right after `LoopTree::build` and before
//! `topo_sort`: for every store whose value chain reads back from a load at
//! the *same address*, in the *same* loop body, this recognizes a
//! loop-carried accumulator and folds it into an `Accum` `Phi` sitting at
//! this loop level. When nothing else still needs the per-iteration value
//! (the read feeding the accumulation is the load's only use) and the store
//! itself doesn't vary with this loop, the store can be relocated to the
//! enclosing level behind a `Join` `Phi` that reads the accum's final value
//! — matching the "hoisted accumulator / join of a reduction" data-model
//! description and the dot-product/matmul reconstruction scenarios.
//!
//! A store whose accumulator is read by something else too (e.g. a
//! further per-iteration store, as in the "loop-carried non-reassociable"
//! scenario) still gets an `Accum` `Phi` for `classify_reductions` to credit
//! towards `Legality::ordered_reduction_count`/`unordered_reduction_count`,
//! but is left exactly where it was: relocating it would drop the
//! intermediate value the other consumer needs.

use crate::deps::Dependencies;
use crate::fx::FxHashSet;
use crate::ir::{AddrId, Cache, ComputeId, LoopIrId, NodeId, Phi, PhiKind, ValueId};
use crate::stats::Stats;

/// Top-level nodes produced when a reduction's final store (and its `Join`
/// `Phi`) gets hoisted out of an outermost (depth-0) loop: there is no
/// enclosing `LoopIr` to attach them to, so the caller threads them onto
/// [`super::OptimizedProgram::top_level`] instead.
pub fn detect_reductions(cache: &mut Cache, deps: &mut Dependencies, root: LoopIrId, stats: &mut Stats, top_level: &mut Vec<NodeId>) {
    walk(cache, deps, root, 0, stats, top_level);
}

fn direct_children(cache: &Cache, loop_ir: LoopIrId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut cur = cache.loop_irs[loop_ir].child;
    while let Some(n) = cur {
        out.push(n);
        cur = crate::ir::node::next(cache, n);
    }
    out
}

fn walk(cache: &mut Cache, deps: &mut Dependencies, loop_ir: LoopIrId, depth: usize, stats: &mut Stats, top_level: &mut Vec<NodeId>) {
    let children = direct_children(cache, loop_ir);
    for &n in &children {
        if let NodeId::LoopIr(child) = n {
            walk(cache, deps, child, depth + 1, stats, top_level);
        }
    }

    let stores: Vec<AddrId> = children
        .iter()
        .filter_map(|n| n.as_addr())
        .filter(|&id| cache.addrs[id].is_store && !cache.addrs[id].dropped)
        .collect();

    for store in stores {
        try_insert_reduction(cache, deps, loop_ir, depth, store, stats, top_level);
    }
}

/// All `ComputeId`s reachable from `start` by walking operand edges
/// (treating a `Phi` operand as opaque, since no `Phi` exists yet at the
/// point this pass runs over freshly reconstructed bodies).
fn reachable_computes(cache: &Cache, start: ComputeId) -> FxHashSet<ComputeId> {
    let mut seen = FxHashSet::default();
    let mut stack = vec![start];
    while let Some(c) = stack.pop() {
        if !seen.insert(c) {
            continue;
        }
        for &op in cache.computes[c].operands.iter() {
            if let Some(opc) = op.as_compute() {
                stack.push(opc);
            }
        }
    }
    seen
}

/// A load with the identical `(array, loop, offset_omega, index_matrix)`
/// key as `store` — the same CSE key `optimizer::prune_redundant_addrs`
/// uses to recognize "the same access" — whose produced value is read
/// somewhere in `store`'s value chain.
fn find_self_address_load(cache: &Cache, store: AddrId, stored_compute: ComputeId) -> Option<AddrId> {
    let reachable = reachable_computes(cache, stored_compute);
    let s = &cache.addrs[store];
    cache.addrs.keys().find(|&id| {
        let a = &cache.addrs[id];
        !a.dropped
            && a.is_load()
            && a.array == s.array
            && a.loop_handle == s.loop_handle
            && a.access.offset_omega == s.access.offset_omega
            && a.access.index_matrix == s.access.index_matrix
            && a.load_value.map_or(false, |lv| reachable.contains(&lv))
    })
}

fn try_insert_reduction(
    cache: &mut Cache,
    deps: &mut Dependencies,
    loop_ir: LoopIrId,
    depth: usize,
    store: AddrId,
    stats: &mut Stats,
    top_level: &mut Vec<NodeId>,
) {
    let Some(stored_compute) = cache.addrs[store].stored_value.and_then(|v| v.as_compute()) else {
        return;
    };
    let Some(load) = find_self_address_load(cache, store, stored_compute) else {
        return;
    };
    if cache.addrs[load].owner != Some(loop_ir) {
        // The accumulator read isn't attached in this same body; leave it
        // to whichever level it actually sits at.
        return;
    }
    let Some(load_value) = cache.addrs[load].load_value else {
        return;
    };

    let accum_id = cache.push_phi(Phi {
        loop_ir,
        kind: PhiKind::Accum,
        incoming: ValueId::Compute(load_value),
        latch: ValueId::Compute(stored_compute),
        prev: None,
        next: None,
        owner: None,
    });
    super::optimizer::drop_addr_and_edges(cache, deps, load);
    crate::ir::node::append_child(cache, loop_ir, NodeId::Phi(accum_id));
    stats.reduction_phis_inserted += 1;

    // Only safe to relocate the store past this loop when nothing else
    // still needs the per-iteration value, and the final address doesn't
    // itself vary with this loop (otherwise there's no single value left
    // to write once the loop is gone).
    let single_use = cache.computes[load_value].users.len() <= 1;
    let store_is_loop_invariant = !cache.addrs[store].loopdeps.contains(depth as u8);
    if !single_use || !store_is_loop_invariant {
        return;
    }

    let join_id = cache.push_phi(Phi {
        loop_ir,
        kind: PhiKind::Join,
        incoming: ValueId::Compute(load_value),
        latch: ValueId::Phi(accum_id),
        prev: None,
        next: None,
        owner: None,
    });
    stats.reduction_phis_inserted += 1;

    crate::ir::node::unlink(cache, NodeId::Addr(store));
    cache.addrs[store].stored_value = Some(ValueId::Phi(join_id));

    match cache.loop_irs[loop_ir].owner {
        Some(parent) => {
            crate::ir::node::append_child(cache, parent, NodeId::Phi(join_id));
            crate::ir::node::append_child(cache, parent, NodeId::Addr(store));
        }
        None => {
            top_level.push(NodeId::Phi(join_id));
            top_level.push(NodeId::Addr(store));
        }
    }
}
