//! Core types for ledgervc
//!
//! This crate defines the foundational types used throughout the system:
//! - Flake, Spot, Sid: atomic facts and their conflict coordinate
//! - NamespaceCodes: namespace code → IRI prefix table
//! - Commit, CommitDataDocument: validated commit documents
//! - BranchSpec, CommitId: parsed branch references and normalized ids
//! - BranchMetadata, BranchDescriptor: branch pointer metadata
//! - Error: closed error enumeration and stable error codes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod branch_types;
pub mod commit;
pub mod error;
pub mod flake;
pub mod namespace;
pub mod types;

pub use branch_types::{BranchDescriptor, BranchMetadata};
pub use commit::{Commit, CommitData, CommitDataDocument, CommitRef};
pub use error::{ErrorCode, VcsError, VcsResult};
pub use flake::{datatype, FactValue, Flake, FlakeMeta, FlakeValue, Sid, Spot};
pub use namespace::NamespaceCodes;
pub use types::{BranchSpec, CommitId, DEFAULT_BRANCH, DEFAULT_COMMIT_ID_SUFFIX};
