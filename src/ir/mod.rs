//! The IR graph node hierarchy: `Addr`, `Compute`, `Phi`, `LoopIr`, plus the
//! `Cache` arena/entity-map bundle they're all stored in.
//!
//! Dispatch over node kinds is a tagged `match` on [`entities::NodeId`]
//! rather than a trait object: the kind universe is closed (no user
//! extension), so a vtable would only add an indirection with no payoff.

pub mod addr;
pub mod cache;
pub mod compute;
pub mod entities;
pub mod loop_ir;
pub mod node;
pub mod phi;

pub use addr::{AccessMatrices, Addr, ElementType, NO_DEP};
pub use cache::Cache;
pub use compute::{Compute, ComputeKind, FastMathFlags};
pub use entities::{AddrId, ArrayId, ComputeId, LoopHandle, LoopIrId, NodeId, Opcode, PhiId, ValueId};
pub use loop_ir::{Legality, LoopIr};
pub use phi::{Phi, PhiKind};
