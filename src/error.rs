//! Error taxonomy.
//!
//! Almost every "failure" in this engine is an expected,
//! frequent outcome represented as a sentinel value (a reject-depth integer,
//! an `Option`, an `Outcome` enum) and handled locally — never a `Result`.
//! `PolyError` exists only for the few truly exceptional, embedder-facing
//! cases enumerated below; it is hand-rolled in the style of
//! `cranelift-codegen-meta::error::Error` rather than built on `thiserror`,
//! since the variant set is small and fixed.

use core::fmt;

/// An exceptional, embedder-visible failure. Distinct from the sentinel
/// return values (`reject_depth`, `Outcome::Failure`, `None`) used for
/// expected control flow within a single engine invocation.
#[derive(Debug)]
pub enum PolyError {
    /// A loop's bounds were not affine at any depth at all (reject depth
    /// equals the loop's own depth), so there is no affinely-representable
    /// subset left for the engine to schedule.
    NotAffine { depth: usize },

    /// An `EntityRef` handle (e.g. a `Symbol` or `DepId`) was used against a
    /// `Cache`/`Dependencies` instance other than the one that minted it.
    /// Always a caller bug; this crate does not attempt to recover from it.
    WrongArena { what: &'static str },
}

impl fmt::Display for PolyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolyError::NotAffine { depth } => {
                write!(f, "loop nest is not affine at any of its {depth} outer levels")
            }
            PolyError::WrongArena { what } => {
                write!(f, "{what} handle used against the wrong arena")
            }
        }
    }
}

impl std::error::Error for PolyError {}

pub type PolyResult<T> = Result<T, PolyError>;
