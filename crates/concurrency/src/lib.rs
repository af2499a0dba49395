//! Snapshot and staging layer for ledgervc
//!
//! This crate holds the in-memory side of version control:
//! - Snapshot: immutable view of a branch at `t`, with a novelty overlay
//! - stage: apply flakes onto a snapshot without persisting them
//! - conflict: spot-level footprint comparison

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod conflict;
pub mod snapshot;
pub mod stage;

pub use conflict::{check_write_write_conflicts, has_conflict, spots_of, ConflictResult};
pub use snapshot::{FactIndex, Novelty, Snapshot, StageInfo, ViewPolicy};
pub use stage::{stage, StageOptions};
