//! Work counters threaded through the scheduler and IR reconstruction.
//!
//! Grounded on `cranelift-codegen::egraph::Stats`: a flat bag of counters
//! bumped at well-known points, read out after the pass completes. No timing
//! wheel, no histogram — just monotonic counts an embedder can log or assert
//! on in tests.

/// Monotonic counters for one engine invocation. Also serves as the work
/// counter the fail-fast budget reads from: `simplex_pivots` grows with
/// every tableau pivot and is the value `Config::fail_fast_pivot_budget` is
/// compared against.
#[derive(Clone, Debug, Default)]
pub struct Stats {
    pub simplex_pivots: u64,
    pub comparator_queries: u64,
    pub dep_checks: u64,
    pub dep_edges_created: u64,
    pub reloads: u64,
    pub scc_splits: u64,
    pub fuse_attempts: u64,
    pub fuse_successes: u64,
    pub shift_omega_calls: u64,
    pub redundant_addrs_pruned: u64,
    pub temporaries_eliminated: u64,
    pub reassociable_reductions: u64,
    pub reduction_phis_inserted: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }
}
