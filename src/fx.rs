//! Fast, non-cryptographic hash maps/sets used throughout the engine.
//!
//! Dependence checking and CSE both do a lot of small, short-lived lookups
//! (by `Addr` id, by `Symbol` id); `rustc-hash`'s FxHash is a good fit since
//! keys are small integers and we don't need DoS resistance for a compiler
//! pass running on trusted input.

pub use rustc_hash::{FxHashMap, FxHashSet};
