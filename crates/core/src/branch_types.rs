//! Branch metadata and descriptors
//!
//! A branch is a named pointer `"<ledger>:<branch>"` to a head commit plus
//! metadata. The metadata is flattened into the top-level commit document
//! when a branch record is published:
//!
//! | Field | JSON key |
//! |-------|----------|
//! | `created_at` | `createdAt` |
//! | `source_branch` | `sourceBranch` |
//! | `source_commit` | `sourceCommit` |
//! | `protected` | `protected` |
//! | `description` | `description` |

use crate::types::CommitId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata stored alongside a branch pointer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchMetadata {
    /// When the branch was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Branch this one was created from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_branch: Option<String>,
    /// Commit this branch was created from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_commit: Option<CommitId>,
    /// Rejects delete/rename when set
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub protected: bool,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BranchMetadata {
    /// Metadata for a branch created now from `source_branch` at `source_commit`
    pub fn created_from(source_branch: impl Into<String>, source_commit: CommitId) -> Self {
        BranchMetadata {
            created_at: Some(Utc::now()),
            source_branch: Some(source_branch.into()),
            source_commit: Some(source_commit),
            protected: false,
            description: None,
        }
    }

    /// Commit the branch was created from, if recorded
    pub fn created_from_commit(&self) -> Option<&CommitId> {
        self.source_commit.as_ref()
    }

    /// Whether delete/rename must be rejected
    pub fn is_protected(&self) -> bool {
        self.protected
    }
}

/// Description of a branch returned by lifecycle operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchDescriptor {
    /// Ledger name
    pub ledger: String,
    /// Branch name
    pub branch: String,
    /// Head commit
    pub head: CommitId,
    /// Transaction counter of the head
    pub t: i64,
    /// Stored metadata
    pub metadata: BranchMetadata,
}
