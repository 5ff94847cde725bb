//! `IrOptimizer`: the three post-scheduling passes over a reconstructed
//! tree — prune redundant addresses (CSE), eliminate temporaries, and
//! position & legality.

use std::hash::Hasher;

use crate::bitset::LoopMask;
use crate::ctxhash::{CtxEq, CtxHash, CtxHashMap};
use crate::deps::{DepId, Dependencies};
use crate::host::AliasQuery;
use crate::ir::{AddrId, ArrayId, Cache, ComputeId, LoopIrId, NodeId, PhiId};
use crate::stats::Stats;

pub struct IrOptimizer<'q, A> {
    alias_query: &'q A,
}

/// `Cache` as CSE context: two `Addr`s are the same access iff they target
/// the same array, sit in the same loop, and carry an identical index
/// matrix and constant offset. Mirrors `cranelift-codegen::egraph::NodeCtx`
/// hashing payload that lives in a shared arena rather than inline.
impl CtxEq<AddrId, AddrId> for Cache {
    fn ctx_eq(&self, a: &AddrId, b: &AddrId) -> bool {
        let x = &self.addrs[*a];
        let y = &self.addrs[*b];
        x.array == y.array && x.loop_handle == y.loop_handle && x.access.offset_omega == y.access.offset_omega && x.access.index_matrix == y.access.index_matrix
    }
}

impl CtxHash<AddrId> for Cache {
    fn ctx_hash<H: Hasher>(&self, state: &mut H, value: &AddrId) {
        use std::hash::Hash;
        let x = &self.addrs[*value];
        x.array.hash(state);
        x.loop_handle.hash(state);
        x.access.offset_omega.hash(state);
        for row in x.access.index_matrix.iter_rows() {
            row.hash(state);
        }
    }
}

impl<'q, A: AliasQuery<ArrayId>> IrOptimizer<'q, A> {
    pub fn new(alias_query: &'q A) -> Self {
        IrOptimizer { alias_query }
    }

    /// Collapse redundant same-access `Addr`s within each leaf body:
    /// store-then-load forwards to the store, store-then-store drops the
    /// earlier write, load-then-load merges by CSE.
    pub fn prune_redundant_addrs(&mut self, cache: &mut Cache, deps: &mut Dependencies, root: LoopIrId, stats: &mut Stats) {
        prune_subtree(cache, deps, root, stats);
    }

    /// Drop `Addr`s touching a provably non-escaping, removable allocation
    /// that this pass can show has no consumer outside the body it sits in.
    pub fn eliminate_temporaries(&mut self, cache: &mut Cache, deps: &mut Dependencies, root: LoopIrId, stats: &mut Stats) {
        eliminate_subtree(cache, deps, root, self.alias_query, stats);
    }

    /// Assign topological `(top_idx, blk_idx)` to every `LoopIr`, classify
    /// reassociable reduction chains, and compute each loop's `Legality`.
    pub fn assign_position_and_legality(&mut self, cache: &mut Cache, deps: &mut Dependencies, root: LoopIrId, stats: &mut Stats) {
        let mut counter = 0u32;
        assign_positions(cache, root, 0, &mut counter);
        classify_reductions(cache, stats);
        compute_legality(cache, deps, root, 0);
    }
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

fn prune_subtree(cache: &mut Cache, deps: &mut Dependencies, loop_ir: LoopIrId, stats: &mut Stats) {
    let children = direct_children(cache, loop_ir);
    for &n in &children {
        if let NodeId::LoopIr(child) = n {
            prune_subtree(cache, deps, child, stats);
        }
    }
    if !children.is_empty() && children.iter().all(|n| matches!(n, NodeId::Addr(_))) {
        prune_block(cache, deps, &children, stats);
    }
}

fn prune_block(cache: &mut Cache, deps: &mut Dependencies, children: &[NodeId], stats: &mut Stats) {
    let mut latest: CtxHashMap<AddrId, AddrId> = CtxHashMap::with_capacity(children.len());

    for &n in children {
        let NodeId::Addr(cur) = n else { unreachable!() };
        if cache.addrs[cur].dropped {
            continue;
        }

        let prior = latest.get(&cur, cache).copied();
        match prior {
            None => {
                latest.insert(cur, cur, cache);
            }
            Some(prior) if cache.addrs[prior].dropped => {
                latest.insert(cur, cur, cache);
            }
            Some(prior) => {
                let prior_is_store = cache.addrs[prior].is_store;
                let cur_is_store = cache.addrs[cur].is_store;
                match (prior_is_store, cur_is_store) {
                    (true, false) | (false, false) => {
                        // store -> load (forward) or load -> load (CSE):
                        // `cur` adds nothing `prior` didn't already supply.
                        merge_into(cache, deps, cur, prior);
                        stats.redundant_addrs_pruned += 1;
                    }
                    (true, true) => {
                        // store -> store: the earlier write is dead.
                        drop_addr_and_edges(cache, deps, prior);
                        stats.redundant_addrs_pruned += 1;
                        latest.insert(cur, cur, cache);
                    }
                    (false, true) => {
                        // load -> store: `cur` becomes the new representative.
                        latest.insert(cur, cur, cache);
                    }
                }
            }
        }
    }
}

/// Redirect every edge touching `dropped` onto `survivor`, then drop
/// `dropped` from the body.
fn merge_into(cache: &mut Cache, deps: &mut Dependencies, dropped: AddrId, survivor: AddrId) {
    let outs: Vec<DepId> = deps.output_edges(cache, dropped).collect();
    for id in outs {
        deps.rebind(cache, id, Some(survivor), None);
    }
    let ins: Vec<DepId> = deps.input_edges(cache, dropped).collect();
    for id in ins {
        deps.rebind(cache, id, None, Some(survivor));
    }
    cache.addrs[dropped].dropped = true;
    crate::ir::node::unlink(cache, NodeId::Addr(dropped));
}

/// Remove `addr` and every edge incident on it, then drop it from the body.
/// Unlike `merge_into`, nothing inherits its edges: used when `addr` itself
/// is the dead operation (an overwritten store, an eliminated temporary, or
/// a reduction's accumulator read folded into a `Phi` by
/// `super::reduction`).
pub(super) fn drop_addr_and_edges(cache: &mut Cache, deps: &mut Dependencies, addr: AddrId) {
    let outs: Vec<DepId> = deps.output_edges(cache, addr).collect();
    for id in outs {
        deps.remove_edge(cache, id, true, true);
    }
    let ins: Vec<DepId> = deps.input_edges(cache, addr).collect();
    for id in ins {
        deps.remove_edge(cache, id, true, true);
    }
    cache.addrs[addr].dropped = true;
    crate::ir::node::unlink(cache, NodeId::Addr(addr));
}

fn eliminate_subtree<A: AliasQuery<ArrayId>>(cache: &mut Cache, deps: &mut Dependencies, loop_ir: LoopIrId, alias_query: &A, stats: &mut Stats) {
    let children = direct_children(cache, loop_ir);
    for &n in &children {
        if let NodeId::LoopIr(child) = n {
            eliminate_subtree(cache, deps, child, alias_query, stats);
        }
    }

    for &n in &children {
        let NodeId::Addr(id) = n else { continue };
        if cache.addrs[id].dropped {
            continue;
        }
        let array = cache.addrs[id].array;
        if !alias_query.is_non_escaping_local_object(array) || !alias_query.is_removable_alloc(array) {
            continue;
        }
        let escapes = deps.output_edges(cache, id).any(|e| {
            let target = deps.get(e).output;
            crate::ir::node::owner(cache, NodeId::Addr(target)) != Some(loop_ir)
        });
        if escapes {
            continue;
        }
        drop_addr_and_edges(cache, deps, id);
        stats.temporaries_eliminated += 1;
    }
}

fn assign_positions(cache: &mut Cache, loop_ir: LoopIrId, blk_idx: u32, counter: &mut u32) {
    cache.loop_irs[loop_ir].top_idx = *counter;
    *counter += 1;
    cache.loop_irs[loop_ir].blk_idx = blk_idx;

    let children = direct_children(cache, loop_ir);
    for &n in &children {
        if let NodeId::LoopIr(child) = n {
            assign_positions(cache, child, blk_idx + 1, counter);
        }
    }
}

fn chain_is_reassociable(cache: &Cache, start: ComputeId) -> bool {
    let c = &cache.computes[start];
    c.opcode.is_associative_commutative() && c.fast_math_flags.allow_reassoc
}

/// Walk backward through a chain of same-opcode reassociable operands; the
/// deepest node still matching the starting opcode is the reduction's head.
fn reduction_head(cache: &Cache, start: ComputeId) -> ComputeId {
    let opcode = cache.computes[start].opcode;
    let mut current = start;
    loop {
        let next = cache.computes[current]
            .operands
            .iter()
            .filter_map(|op| op.as_compute())
            .find(|&op| cache.computes[op].opcode == opcode);
        match next {
            Some(next) if chain_is_reassociable(cache, next) => current = next,
            _ => break,
        }
    }
    current
}

/// For every loop-carried (`Accum`) Φ, decide whether its latch chain is
/// reassociable; reassociable reductions may run in any evaluation order
/// (`unordered_reduction_count`), others must preserve it
/// (`ordered_reduction_count`). A latch that names another `Phi` directly
/// (no intervening `Compute`) has nothing to reassociate and counts as
/// ordered, matching a plain pass-through accumulator.
fn classify_reductions(cache: &mut Cache, stats: &mut Stats) {
    let phi_ids: Vec<PhiId> = cache.phis.keys().collect();
    for pid in phi_ids {
        if !cache.phis[pid].depth_matches_latch() {
            continue;
        }
        let latch = cache.phis[pid].latch;
        let loop_ir = cache.phis[pid].loop_ir;
        match latch.as_compute() {
            Some(latch) if chain_is_reassociable(cache, latch) => {
                let head = reduction_head(cache, latch);
                cache.computes[head].reduction_dst = Some(pid);
                cache.loop_irs[loop_ir].legality.unordered_reduction_count += 1;
                stats.reassociable_reductions += 1;
            }
            _ => {
                cache.loop_irs[loop_ir].legality.ordered_reduction_count += 1;
            }
        }
    }
}

/// The ancestor of `addr`'s owning `LoopIr` that sits at `target_depth`
/// counting from the root, or `None` if `addr` isn't attached or its chain
/// is shallower than `target_depth`.
fn ancestor_loop_ir(cache: &Cache, addr: AddrId, target_depth: usize) -> Option<LoopIrId> {
    let mut chain = Vec::new();
    let mut cur = crate::ir::node::owner(cache, NodeId::Addr(addr))?;
    loop {
        chain.push(cur);
        match cache.loop_irs[cur].owner {
            Some(p) => cur = p,
            None => break,
        }
    }
    chain.reverse();
    chain.get(target_depth).copied()
}

/// Compute `Legality` for every loop in the tree: a loop is `reorderable`
/// unless some dependency satisfied at its depth could not be classified
/// for peeling (`determine_peel_depth` returned `None`); one that could be
/// handled by peeling some loop sets the corresponding `peel_flag` bit
/// without affecting `reorderable`.
fn compute_legality(cache: &mut Cache, deps: &mut Dependencies, loop_ir: LoopIrId, depth: usize) {
    let children = direct_children(cache, loop_ir);
    for &n in &children {
        if let NodeId::LoopIr(child) = n {
            compute_legality(cache, deps, child, depth + 1);
        }
    }

    let edge_ids: Vec<DepId> = deps.all_ids().collect();
    let mut reorderable = true;
    let mut peel_flag = LoopMask::EMPTY;
    let mut our_edges = Vec::new();

    for id in edge_ids {
        let (input, sat_depth) = {
            let e = deps.get(id);
            (e.input, e.sat_level.depth())
        };
        if sat_depth != Some(depth as u8) {
            continue;
        }
        if ancestor_loop_ir(cache, input, depth) != Some(loop_ir) {
            continue;
        }
        our_edges.push(id);
        match deps.determine_peel_depth(cache, id, depth) {
            Some(peel_idx) => peel_flag.insert(peel_idx as u8),
            None => reorderable = false,
        }
    }

    cache.loop_irs[loop_ir].edges = our_edges;
    cache.loop_irs[loop_ir].legality.reorderable = reorderable;
    cache.loop_irs[loop_ir].legality.peel_flag = peel_flag;
}
