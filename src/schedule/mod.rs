//! The scheduled-node graph and the LP block that computes its schedule.

pub mod lp_block;
pub mod scheduled_node;
pub mod stash;

pub use lp_block::{LoopBlock, Outcome, OptimizationResult};
pub use scheduled_node::{add_scheduled_node, shift_omega, ScheduledNode, ScheduledNodeId};
