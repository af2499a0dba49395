//! Commit and commit-data documents
//!
//! A commit is an immutable, content-addressed node forming a singly-linked
//! list back to a genesis commit (`t = 0`):
//!
//! ```json
//! {
//!   "id": "commit:sha256:…",
//!   "address": "memory://…",
//!   "alias": "ledger",
//!   "branch": "main",
//!   "data": {"address": "memory://…", "t": 3},
//!   "previous": {"id": "commit:sha256:…", "address": "memory://…"},
//!   "createdAt": "…", "sourceBranch": "…", "sourceCommit": "…"
//! }
//! ```
//!
//! Branch metadata fields are merged directly into the top-level document.
//! Documents are validated when decoded; a malformed document never becomes
//! a [`Commit`].

use crate::branch_types::BranchMetadata;
use crate::error::{VcsError, VcsResult};
use crate::flake::Flake;
use crate::namespace::NamespaceCodes;
use crate::types::CommitId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Pointer to a commit's data document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitData {
    /// Address of the data document; absent for metadata-only commits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Transaction counter reached by this commit
    pub t: i64,
}

/// Reference to a parent commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    /// Parent id
    pub id: CommitId,
    /// Parent address
    pub address: String,
}

/// A decoded, validated commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Normalized content-hash id
    pub id: CommitId,
    /// Storage address
    #[serde(default)]
    pub address: String,
    /// Ledger alias the commit was written under
    pub alias: String,
    /// Branch the commit was written under
    pub branch: String,
    /// Data pointer and `t`
    pub data: CommitData,
    /// Parent, or `None` for genesis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<CommitRef>,
    /// Commit message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Commit author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Wall-clock time of the commit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    /// Flattened branch metadata
    #[serde(flatten)]
    pub metadata: BranchMetadata,
}

impl Commit {
    /// Decode and validate a commit document read from `address`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommit` if required fields are missing or the
    /// parent/`t` relationship is inconsistent.
    pub fn from_document(address: &str, doc: &JsonValue) -> VcsResult<Commit> {
        if !doc.is_object() {
            return Err(VcsError::invalid_commit(address, "document is not an object"));
        }
        let mut commit: Commit = serde_json::from_value(doc.clone())
            .map_err(|e| VcsError::invalid_commit(address, e.to_string()))?;
        if commit.address.is_empty() {
            commit.address = address.to_string();
        }
        commit.validate()?;
        Ok(commit)
    }

    /// Check structural invariants
    pub fn validate(&self) -> VcsResult<()> {
        if self.id.as_str().is_empty() {
            return Err(VcsError::invalid_commit(&self.address, "missing id"));
        }
        if self.alias.is_empty() {
            return Err(VcsError::invalid_commit(&self.address, "missing alias"));
        }
        if self.branch.is_empty() {
            return Err(VcsError::invalid_commit(&self.address, "missing branch"));
        }
        match (&self.previous, self.data.t) {
            (None, 0) => Ok(()),
            (None, t) => Err(VcsError::invalid_commit(
                &self.address,
                format!("genesis commit must have t = 0, found t = {}", t),
            )),
            (Some(_), t) if t <= 0 => Err(VcsError::invalid_commit(
                &self.address,
                format!("non-genesis commit must have t > 0, found t = {}", t),
            )),
            (Some(prev), _) if prev.address.is_empty() => Err(VcsError::invalid_commit(
                &self.address,
                "previous commit has no address",
            )),
            _ => Ok(()),
        }
    }

    /// Transaction counter of this commit
    pub fn t(&self) -> i64 {
        self.data.t
    }

    /// True for the root of the chain
    pub fn is_genesis(&self) -> bool {
        self.previous.is_none()
    }

    /// Reference to this commit, for use as a child's `previous`
    pub fn commit_ref(&self) -> CommitRef {
        CommitRef {
            id: self.id.clone(),
            address: self.address.clone(),
        }
    }

    /// Re-encode as a JSON document with metadata flattened
    pub fn to_document(&self) -> VcsResult<JsonValue> {
        Ok(serde_json::to_value(self)?)
    }

    /// Copy of this commit published under another alias/branch with `metadata`
    pub fn retagged(&self, alias: &str, branch: &str, metadata: BranchMetadata) -> Commit {
        Commit {
            alias: alias.to_string(),
            branch: branch.to_string(),
            metadata,
            ..self.clone()
        }
    }
}

/// Data document holding a commit's flakes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitDataDocument {
    /// Transaction counter
    pub t: i64,
    /// Asserted flakes
    #[serde(default)]
    pub assert: Vec<Flake>,
    /// Retracted flakes
    #[serde(default)]
    pub retract: Vec<Flake>,
    /// Namespace codes introduced by this commit
    #[serde(default = "NamespaceCodes::empty")]
    pub namespaces: NamespaceCodes,
}

impl CommitDataDocument {
    /// Decode a data document read from `address`
    pub fn from_document(address: &str, doc: &JsonValue) -> VcsResult<CommitDataDocument> {
        serde_json::from_value(doc.clone())
            .map_err(|e| VcsError::invalid_commit(address, format!("bad data document: {}", e)))
    }
}
