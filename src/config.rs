//! Engine-wide tunables.
//!
//! Plain data, no builder macro: this mirrors `cranelift-codegen`'s
//! `settings::Flags` in spirit but is scaled down to what this crate
//! actually needs, since target/ISA selection is out of scope here.

/// The deepest loop nest the engine will reason about. Affine loops beyond
/// this depth are peeled to dynamic symbols by the caller before they ever
/// reach this crate.
pub const MAX_SUPPORTED_DEPTH: usize = 15;

/// Trip-count estimate used when a loop's bound is not exactly affine in a
/// single symbol (see `AffineLoop::trip_count`).
pub const DYN_LOOP_EST: u64 = 1024;

/// Tunable knobs for one invocation of the engine.
#[derive(Clone, Debug)]
pub struct Config {
    /// Upper bound on loop nest depth; mirrors [`MAX_SUPPORTED_DEPTH`] but is
    /// overridable downward for embedders that want to bound compile time.
    pub max_depth: usize,

    /// Trip-count estimate substituted for inexact bounds.
    pub dyn_loop_est: u64,

    /// When set, the LP recursion aborts (treats the level as `FAILURE`)
    /// once `Stats::simplex_pivots` exceeds this count, rather than running
    /// to completion. Used by tests to bound worst-case SCC-splitting
    /// recursion; `None` means no cap.
    pub fail_fast_pivot_budget: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_depth: MAX_SUPPORTED_DEPTH,
            dyn_loop_est: DYN_LOOP_EST,
            fail_fast_pivot_budget: None,
        }
    }
}
