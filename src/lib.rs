//! `polysched`: the polyhedral loop-optimization core of a compiler mid-end.
//!
//! Consumes an affine representation of a loop nest — loop bounds, memory
//! access functions, and a dependency graph between those accesses — and
//! produces a reordered, fused, distributed, hoisted, and
//! vectorization-ready loop-nest tree together with an enabling legality
//! analysis.
//!
//! Parsing host-compiler IR into affine form, instruction cost modeling,
//! alias analysis, and remark emission are all out of scope: this crate
//! consumes them through the narrow traits in [`host`]. See `SPEC_FULL.md`
//! for the full specification and `DESIGN.md` for how each module is
//! grounded on `cranelift-codegen`.

pub mod affine_loop;
pub mod bitset;
pub mod comparator;
pub mod config;
pub mod ctxhash;
pub mod cursor;
pub mod deppoly;
pub mod deps;
pub mod error;
pub mod fx;
pub mod host;
pub mod ir;
pub mod linalg;
pub mod reconstruct;
pub mod schedule;
pub mod simplex;
pub mod stats;
pub mod symbol;

pub use affine_loop::AffineLoop;
pub use config::Config;
pub use error::{PolyError, PolyResult};
pub use stats::Stats;

use cranelift_entity::PrimaryMap;

use crate::deps::Dependencies;
use crate::ir::{AddrId, Cache, LoopIrId};
use crate::schedule::{LoopBlock, ScheduledNode, ScheduledNodeId};

/// Run the full pipeline on one pre-populated `Cache`/`Dependencies` pair:
/// schedule every store-rooted chain with [`LoopBlock::optimize`], then
/// reconstruct the loop-nest tree and stamp legality with
/// [`reconstruct::IrOptimizer`].
///
/// `stores` is the set of root `Addr`s (one per `ScheduledNode`) the caller
/// has already identified; this crate does not itself decide which `Addr`s
/// are node roots, since that requires walking host-IR def-use chains that
/// are out of scope here. The embedder builds `{Loops, Addrs}` from its own
/// IR before calling in.
pub fn optimize(
    cache: &mut Cache,
    deps: &mut Dependencies,
    config: &Config,
    stats: &mut Stats,
    stores: &[AddrId],
) -> reconstruct::OptimizedProgram {
    let mut attached = std::collections::HashSet::new();
    let mut nodes: PrimaryMap<ScheduledNodeId, ScheduledNode> = PrimaryMap::new();
    for &store in stores {
        if attached.contains(&store) {
            continue;
        }
        let node = schedule::add_scheduled_node(cache, deps, stats, &mut attached, store);
        nodes.push(node);
    }

    let block = LoopBlock::new(cache, deps, config, stats, nodes);
    let result = block.optimize();

    reconstruct::optimize(cache, deps, stats, result)
}

/// Convenience re-export of the reconstructed tree's root list, so embedders
/// don't need to reach into `reconstruct` for the common case.
pub fn roots(program: &reconstruct::OptimizedProgram) -> &[LoopIrId] {
    &program.roots
}
