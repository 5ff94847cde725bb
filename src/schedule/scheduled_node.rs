//! `ScheduledNode`: one vertex of the post-dependence-analysis access graph.

use cranelift_entity::entity_impl;

use crate::deps::Dependencies;
use crate::fx::FxHashMap;
use crate::ir::{AddrId, Cache, ComputeId, LoopHandle};
use crate::linalg::Matrix;
use crate::stats::Stats;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduledNodeId(u32);
entity_impl!(ScheduledNodeId, "node");

impl std::fmt::Debug for ScheduledNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use cranelift_entity::EntityRef;
        write!(f, "node{}", self.index())
    }
}

pub const NO_NODE: i32 = -1;

#[derive(Clone, Debug)]
pub struct ScheduledNode {
    /// The store rooting the chain; loads are reachable via operand walks
    /// rather than a second chain, per `add_scheduled_node`.
    pub store: AddrId,
    pub loads: Vec<AddrId>,
    pub loop_nest: LoopHandle,
    pub num_loops: usize,
    /// How many outer `phi` rows are already fixed by previous recursion
    /// levels.
    pub rank: usize,
    /// Schedule matrix, rows outer -> inner.
    pub phi: Matrix,
    pub fusion_omega: Vec<i64>,
    pub offset_omega: Vec<i64>,
    /// Canonical shift vector applied to align access offsets to zero.
    pub offsets: Vec<i64>,

    // Tarjan bookkeeping.
    pub index: Option<u32>,
    pub low_link: u32,
    pub on_stack: bool,
    pub visited: bool,

    // Intrusive list links.
    pub next: i32,
    pub component: i32,
    pub original_next: i32,
}

impl ScheduledNode {
    pub fn new(store: AddrId, loop_nest: LoopHandle, num_loops: usize) -> Self {
        ScheduledNode {
            store,
            loads: Vec::new(),
            loop_nest,
            num_loops,
            rank: 0,
            phi: Matrix::zeros(num_loops, num_loops),
            fusion_omega: vec![0; num_loops + 1],
            offset_omega: vec![0; num_loops],
            offsets: vec![0; num_loops],
            index: None,
            low_link: 0,
            on_stack: false,
            visited: false,
            next: NO_NODE,
            component: NO_NODE,
            original_next: NO_NODE,
        }
    }
}

/// Collect a store and its chain of loads into a single vertex.
///
/// Starting from the store's stored-value operand, recursively search
/// operands: if a load is encountered that is already attached to some
/// other node, call `reload` on the corresponding prior store to duplicate
/// it (so each node keeps exclusive ownership of the loads it reads),
/// otherwise attach the load to the current node. The maximum loop depth
/// encountered across loads becomes the node's `loop_nest`.
pub fn add_scheduled_node(
    cache: &mut Cache,
    deps: &mut Dependencies,
    stats: &mut crate::stats::Stats,
    attached: &mut std::collections::HashSet<AddrId>,
    store: AddrId,
) -> ScheduledNode {
    let root_loop = cache.addrs[store].loop_handle;
    let mut node = ScheduledNode::new(store, root_loop, cache.loops[root_loop].num_loops());
    attached.insert(store);

    // `stored_value` (and any operand reached from it) may name a `Phi`
    // rather than a `Compute`; at this point in the pipeline (scheduling,
    // before `reconstruct::reduction` ever creates one) that only happens
    // if the host handed in a pre-built reduction, which this walk does not
    // cross into — the load(s) feeding such a `Phi` belong to whichever
    // node the host already associated it with.
    let mut worklist: Vec<ComputeId> = cache.addrs[store]
        .stored_value
        .into_iter()
        .filter_map(|v| v.as_compute())
        .collect();
    let mut visited_computes = std::collections::HashSet::new();

    while let Some(c) = worklist.pop() {
        if !visited_computes.insert(c) {
            continue;
        }
        for &operand in cache.computes[c].operands.clone().iter() {
            if let Some(c) = operand.as_compute() {
                worklist.push(c);
            }
        }
    }

    // Only a load whose `load_value` was actually reached by the operand
    // walk above belongs to this chain; everything else is some other
    // store's concern, even if it shares `root_loop`.
    let candidate_loads: Vec<AddrId> = cache
        .addrs
        .keys()
        .filter(|&id| {
            cache.addrs[id].is_load()
                && !cache.addrs[id].dropped
                && cache.addrs[id]
                    .load_value
                    .map_or(false, |c| visited_computes.contains(&c))
        })
        .collect();

    for load in candidate_loads {
        // Already claimed by another node: duplicate it via `reload` so
        // each node keeps exclusive ownership of the loads it reads, and
        // attach the duplicate (not the shared original) to this node.
        let to_attach = if attached.contains(&load) {
            deps.reload(cache, load, stats)
        } else {
            load
        };
        attached.insert(to_attach);
        node.loads.push(to_attach);
        let load_loop = cache.addrs[to_attach].loop_handle;
        node.num_loops = node.num_loops.max(cache.loops[load_loop].num_loops());
    }

    node
}

/// Canonicalize `node`'s accesses so as many constant-offset terms as
/// possible read zero, per loop variable.
///
/// For each loop column `k`, a dimension row across any of the node's
/// accesses qualifies as a vote if it depends on loop `k` alone among loop
/// variables (coefficient `c`, `offset_omega[dim] = o`): the shift that
/// would zero it is `-o/c`, when that division is exact. The most popular
/// vote per column becomes `node.offsets[k]`; columns with no integral vote
/// are left at zero. The shift is then folded into every access's
/// `offset_omega`, matching the constant-column update `AffineLoop::rotate`
/// performs for the same kind of substitution.
///
/// Per-edge Farkas tableau right-hand sides are deliberately left untouched
/// here: a `DepEdge`'s `sat_simplex`/`bnd_simplex` are shared between the two
/// scheduled nodes its endpoints belong to, so a node-local shift can't be
/// folded into them without knowing whether the other endpoint's node has
/// already applied (or will apply) a shift of its own. The same
/// canonicalizing translation is instead applied once, uniformly, when
/// `reconstruct::loop_tree` rotates each node's loop nest by `node.offsets`.
pub fn shift_omega(cache: &mut Cache, stats: &mut Stats, node: &mut ScheduledNode) {
    stats.shift_omega_calls += 1;
    let n = node.num_loops;
    if n == 0 {
        return;
    }

    let members: Vec<AddrId> = std::iter::once(node.store).chain(node.loads.iter().copied()).collect();

    let mut offsets = vec![0i64; n];
    for k in 0..n {
        let mut votes: FxHashMap<i64, u32> = FxHashMap::default();
        for &addr in &members {
            let access = &cache.addrs[addr].access;
            let depth = access.index_matrix.cols().min(n);
            if k >= depth {
                continue;
            }
            for row in 0..access.index_matrix.rows() {
                let coeff = access.index_matrix.row(row)[k];
                if coeff == 0 {
                    continue;
                }
                let solely_k = (0..depth).filter(|&j| j != k).all(|j| access.index_matrix.row(row)[j] == 0);
                if !solely_k {
                    continue;
                }
                let o = access.offset_omega.get(row).copied().unwrap_or(0);
                if o % coeff == 0 {
                    *votes.entry(-o / coeff).or_insert(0) += 1;
                }
            }
        }
        if let Some((&best, _)) = votes.iter().max_by_key(|&(val, count)| (*count, -val.abs())) {
            offsets[k] = best;
        }
    }

    if offsets.iter().all(|&o| o == 0) {
        node.offsets = offsets;
        return;
    }

    for &addr in &members {
        let access = &mut cache.addrs[addr].access;
        let depth = access.index_matrix.cols().min(n);
        for row in 0..access.index_matrix.rows() {
            let mut delta = 0i64;
            for k in 0..depth {
                delta += access.index_matrix.row(row)[k] * offsets[k];
            }
            if delta != 0 {
                if let Some(o) = access.offset_omega.get_mut(row) {
                    *o += delta;
                }
            }
        }
    }

    node.offsets = offsets;
}
