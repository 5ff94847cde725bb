//! Post-scheduling IR reconstruction: turn the solved `ScheduledNode`
//! list into a tree of `LoopIr` nodes, sort and hoist-classify each body,
//! then run the three `IrOptimizer` passes over the result.

pub mod loop_tree;
pub mod optimizer;
pub mod reduction;
pub mod topo_sort;

pub use loop_tree::LoopTree;
pub use optimizer::IrOptimizer;

use crate::deps::Dependencies;
use crate::host::AliasQuery;
use crate::ir::{ArrayId, Cache, LoopIrId, NodeId};
use crate::schedule::OptimizationResult;
use crate::stats::Stats;

/// Everything `optimize` hands back to the embedder: the reconstructed
/// tree's roots and the loop level (if any) that satisfied each original
/// dependency edge.
pub struct OptimizedProgram {
    pub roots: Vec<LoopIrId>,
    /// Nodes hoisted past an outermost (depth-0) loop by
    /// [`reduction::detect_reductions`] — a reduction's `Join` `Phi`
    /// followed by its final store — in program order. Empty unless some
    /// reduction's carrying loop was itself a tree root.
    pub top_level: Vec<NodeId>,
    /// Indexed in parallel with `Dependencies::all_ids()`'s iteration order
    /// at the time `optimize` ran; `None` means the edge was never
    /// satisfied by the schedule (should not occur for a legal schedule,
    /// but recorded rather than assumed).
    pub edge_levels: Vec<(crate::deps::DepId, Option<u8>)>,
}

/// Run the full post-scheduling reconstruction pipeline with a conservative
/// alias oracle (no temporary elimination). See [`optimize_with_alias_query`]
/// to wire in a real one.
pub fn optimize(cache: &mut Cache, deps: &mut Dependencies, stats: &mut Stats, result: OptimizationResult) -> OptimizedProgram {
    optimize_with_alias_query(cache, deps, stats, result, &crate::host::ConservativeAliasQuery)
}

pub fn optimize_with_alias_query<A: AliasQuery<ArrayId>>(
    cache: &mut Cache,
    deps: &mut Dependencies,
    stats: &mut Stats,
    result: OptimizationResult,
    alias_query: &A,
) -> OptimizedProgram {
    let tree = LoopTree::build(cache, &result.nodes);
    let roots = tree.root_ids();

    let mut top_level = Vec::new();
    for &root in &roots {
        reduction::detect_reductions(cache, deps, root, stats, &mut top_level);
    }

    for &root in &roots {
        topo_sort::sort_tree(cache, deps, root);
    }

    let mut optimizer = IrOptimizer::new(alias_query);
    for &root in &roots {
        optimizer.prune_redundant_addrs(cache, deps, root, stats);
    }
    for &root in &roots {
        optimizer.eliminate_temporaries(cache, deps, root, stats);
    }
    for &root in &roots {
        optimizer.assign_position_and_legality(cache, deps, root, stats);
    }

    let edge_levels = deps.all_ids().map(|id| (id, deps.get(id).sat_level.depth())).collect();

    OptimizedProgram { roots, top_level, edge_levels }
}
