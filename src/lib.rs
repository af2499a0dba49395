//! ledgervc - Branching, ancestry and rebase for a versioned graph database
//!
//! A ledger is an append-only chain of commits over content-addressed
//! storage. Branches are named pointers published to a nameservice. This
//! crate can create and list branches, find the common ancestor of two
//! branches, and rebase one branch onto another by fast-forwarding or by
//! squashing the source's changes into one commit.
//!
//! # Quick Start
//!
//! ```ignore
//! use ledgervc::{MemoryNameservice, MemoryStore, RebaseOptions, VcsConfig, VersionControl};
//! use std::sync::Arc;
//!
//! let vc = VersionControl::new(Arc::new(MemoryStore::new()), VcsConfig::default())
//!     .with_nameservice(Arc::new(MemoryNameservice::new()));
//!
//! vc.create_ledger("books").await?;
//! vc.create_branch("books:draft", "books:main", &Default::default()).await?;
//! // ... commit onto books:draft ...
//! let result = vc.rebase("books:draft", "books:main", &RebaseOptions::squash()).await?;
//! ```
//!
//! # Architecture
//!
//! - `ledgervc-core`: commits, flakes, branch specs and the error type
//! - `ledgervc-storage`: document store and nameservice interfaces
//! - `ledgervc-concurrency`: snapshots, staging and write-write conflicts
//! - `ledgervc-engine`: the [`VersionControl`] handle and every operation

pub use ledgervc_concurrency::{
    check_write_write_conflicts, stage, ConflictResult, Snapshot, StageOptions,
};
pub use ledgervc_core::{
    datatype, BranchDescriptor, BranchMetadata, BranchSpec, Commit, CommitId, ErrorCode, Flake,
    FlakeValue, NamespaceCodes, Sid, Spot, VcsError, VcsResult,
};
pub use ledgervc_engine::*;
pub use ledgervc_storage::{
    DocumentKind, DocumentStore, MemoryNameservice, MemoryStore, Nameservice, NsRecord,
};
