//! The dependency graph: a structure-of-arrays table of directed,
//! possibly reverse-time dependence edges with per-loop-level satisfaction
//! bits, incrementally updatable as edges are added, removed, or reloaded.

pub mod edge;
pub mod store;

pub use edge::{DepEdge, DepId, DepMeta, SatLevel, NO_EDGE, PEEL_NONE};
pub use store::Dependencies;
