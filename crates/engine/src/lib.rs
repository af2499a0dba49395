//! Version-control engine for ledgervc
//!
//! This crate orchestrates the lower layers:
//! - Commit Reader and Commit Chain Walker over a document store
//! - Ledger loading and the connection cache
//! - Ancestry resolution and fast-forward checks
//! - Net-change computation and squash/fast-forward rebase
//! - Branch lifecycle (create, list, inspect, delete, rename)
//! - Merge and reset entry points (preview / partial)
//!
//! Everything is reached through [`VersionControl`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ancestry;
pub mod branch_ops;
pub mod cache;
pub mod changes;
pub mod config;
pub mod ledger;
pub mod merge;
pub mod reader;
pub mod rebase;
pub mod reset;
pub mod transact;
pub mod vcs;
pub mod walker;

pub use ancestry::{can_fast_forward, find_common_ancestor, AncestorMethod, CommonAncestor};
pub use branch_ops::CreateBranchOptions;
pub use cache::ConnectionCache;
pub use changes::{compute_net_changes, NetChanges};
pub use config::{VcsConfig, CONFIG_FILE_NAME};
pub use ledger::Ledger;
pub use merge::{MergeOptions, MergePreview};
pub use reader::{CommitFlakes, CommitReader};
pub use rebase::{
    CommitSummary, FastForwardMode, RebaseOptions, RebasePreview, RebaseResult, RebaseStatus,
    RebaseStrategy,
};
pub use reset::{ResetMode, StateSpec};
pub use transact::{CommitOptions, CommitReceipt, DocumentTransactor, Transact};
pub use vcs::VersionControl;
pub use walker::{collect_chain, commits_after, walk};
