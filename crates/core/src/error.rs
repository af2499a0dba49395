//! Error types for branch and rebase operations
//!
//! This module defines the closed error enumeration used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! # Hard failures vs soft outcomes
//!
//! Every variant of [`VcsError`] is a hard failure: it aborts the operation
//! before any write and propagates to the caller. Squash-specific negative
//! outcomes (a rebase conflict, or `ff: only` that cannot fast-forward) are
//! NOT raised; they are reported through the `error` field of a result value
//! using the matching [`ErrorCode`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for version-control operations
pub type VcsResult<T> = std::result::Result<T, VcsError>;

/// Stable, serializable identifier for every error kind.
///
/// Carried in structured results so soft outcomes are self-describing
/// without an error object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Operation spans two different ledgers
    InvalidBranchOperation,
    /// Attempted to delete the default branch
    CannotDeleteMainBranch,
    /// Attempted to rename the default branch
    CannotRenameMainBranch,
    /// Attempted to delete a protected branch
    CannotDeleteProtectedBranch,
    /// Attempted to rename a protected branch
    CannotRenameProtectedBranch,
    /// No nameservice publisher is configured
    NoNameservice,
    /// Both sides of a squash wrote the same spot
    RebaseConflict,
    /// `ff: only` requested but the target has diverged
    CannotFastForward,
    /// Feature deliberately left unimplemented
    NotImplemented,
    /// Reset target could not be resolved
    InvalidStateSpec,
    /// Requested state equals the current state
    NoOp,
    /// The two branches share no history
    NoCommonAncestor,
    /// Backing store could not be reached
    StorageUnavailable,
    /// Address or record does not resolve
    NotFound,
    /// Malformed commit or data document
    InvalidCommit,
    /// Malformed caller input
    InvalidInput,
    /// JSON encode/decode failure
    Serialization,
    /// Unexpected internal failure
    Internal,
}

impl ErrorCode {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidBranchOperation => "InvalidBranchOperation",
            ErrorCode::CannotDeleteMainBranch => "CannotDeleteMainBranch",
            ErrorCode::CannotRenameMainBranch => "CannotRenameMainBranch",
            ErrorCode::CannotDeleteProtectedBranch => "CannotDeleteProtectedBranch",
            ErrorCode::CannotRenameProtectedBranch => "CannotRenameProtectedBranch",
            ErrorCode::NoNameservice => "NoNameservice",
            ErrorCode::RebaseConflict => "RebaseConflict",
            ErrorCode::CannotFastForward => "CannotFastForward",
            ErrorCode::NotImplemented => "NotImplemented",
            ErrorCode::InvalidStateSpec => "InvalidStateSpec",
            ErrorCode::NoOp => "NoOp",
            ErrorCode::NoCommonAncestor => "NoCommonAncestor",
            ErrorCode::StorageUnavailable => "StorageUnavailable",
            ErrorCode::NotFound => "NotFound",
            ErrorCode::InvalidCommit => "InvalidCommit",
            ErrorCode::InvalidInput => "InvalidInput",
            ErrorCode::Serialization => "Serialization",
            ErrorCode::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types for branch lifecycle and rebase operations
#[derive(Debug, Error)]
pub enum VcsError {
    /// Cross-ledger operation or otherwise invalid branch manipulation
    #[error("invalid branch operation: {reason}")]
    InvalidBranchOperation {
        /// Why the operation was rejected
        reason: String,
    },

    /// The default branch cannot be deleted
    #[error("cannot delete main branch '{branch}'")]
    CannotDeleteMainBranch {
        /// Full branch spec
        branch: String,
    },

    /// The default branch cannot be renamed
    #[error("cannot rename main branch '{branch}'")]
    CannotRenameMainBranch {
        /// Full branch spec
        branch: String,
    },

    /// Protected branches cannot be deleted
    #[error("cannot delete protected branch '{branch}'")]
    CannotDeleteProtectedBranch {
        /// Full branch spec
        branch: String,
    },

    /// Protected branches cannot be renamed
    #[error("cannot rename protected branch '{branch}'")]
    CannotRenameProtectedBranch {
        /// Full branch spec
        branch: String,
    },

    /// Operation requires a nameservice but none is configured
    #[error("no nameservice configured")]
    NoNameservice,

    /// Squash found overlapping writes (only produced by `into_result`)
    #[error("rebase conflict: {spots} conflicting spot(s)")]
    RebaseConflict {
        /// Number of conflicting spots
        spots: usize,
    },

    /// Fast-forward required but not possible (only produced by `into_result`)
    #[error("cannot fast-forward '{target}' to '{source_branch}'")]
    CannotFastForward {
        /// Source branch spec
        source_branch: String,
        /// Target branch spec
        target: String,
    },

    /// Feature deliberately not implemented
    #[error("not implemented: {feature}")]
    NotImplemented {
        /// The unsupported feature
        feature: String,
    },

    /// Reset target does not resolve to a commit in the branch history
    #[error("invalid state spec: {reason}")]
    InvalidStateSpec {
        /// Why the state spec is invalid
        reason: String,
    },

    /// Requested state is already the current state
    #[error("no-op: {reason}")]
    NoOp {
        /// What was requested
        reason: String,
    },

    /// The two branch heads have no shared commit
    #[error("no common ancestor between '{source_branch}' and '{target}'")]
    NoCommonAncestor {
        /// Source branch spec
        source_branch: String,
        /// Target branch spec
        target: String,
    },

    /// Backing store is unreachable
    #[error("storage unavailable: {reason}")]
    StorageUnavailable {
        /// Backend-provided detail
        reason: String,
    },

    /// Address, record or branch does not resolve
    #[error("not found: {what}")]
    NotFound {
        /// What was looked up
        what: String,
    },

    /// Document failed validation at the reader boundary
    #[error("invalid commit {address}: {reason}")]
    InvalidCommit {
        /// Address of the offending document
        address: String,
        /// What is wrong with it
        reason: String,
    },

    /// Malformed caller input
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Details
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Details
        message: String,
    },

    /// Unexpected internal failure
    #[error("internal error: {message}")]
    Internal {
        /// Details
        message: String,
    },
}

impl VcsError {
    /// Stable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            VcsError::InvalidBranchOperation { .. } => ErrorCode::InvalidBranchOperation,
            VcsError::CannotDeleteMainBranch { .. } => ErrorCode::CannotDeleteMainBranch,
            VcsError::CannotRenameMainBranch { .. } => ErrorCode::CannotRenameMainBranch,
            VcsError::CannotDeleteProtectedBranch { .. } => ErrorCode::CannotDeleteProtectedBranch,
            VcsError::CannotRenameProtectedBranch { .. } => ErrorCode::CannotRenameProtectedBranch,
            VcsError::NoNameservice => ErrorCode::NoNameservice,
            VcsError::RebaseConflict { .. } => ErrorCode::RebaseConflict,
            VcsError::CannotFastForward { .. } => ErrorCode::CannotFastForward,
            VcsError::NotImplemented { .. } => ErrorCode::NotImplemented,
            VcsError::InvalidStateSpec { .. } => ErrorCode::InvalidStateSpec,
            VcsError::NoOp { .. } => ErrorCode::NoOp,
            VcsError::NoCommonAncestor { .. } => ErrorCode::NoCommonAncestor,
            VcsError::StorageUnavailable { .. } => ErrorCode::StorageUnavailable,
            VcsError::NotFound { .. } => ErrorCode::NotFound,
            VcsError::InvalidCommit { .. } => ErrorCode::InvalidCommit,
            VcsError::InvalidInput { .. } => ErrorCode::InvalidInput,
            VcsError::Serialization { .. } => ErrorCode::Serialization,
            VcsError::Internal { .. } => ErrorCode::Internal,
        }
    }

    /// Create an InvalidBranchOperation error
    pub fn invalid_branch_operation(reason: impl Into<String>) -> Self {
        VcsError::InvalidBranchOperation {
            reason: reason.into(),
        }
    }

    /// Create a NotImplemented error
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        VcsError::NotImplemented {
            feature: feature.into(),
        }
    }

    /// Create an InvalidStateSpec error
    pub fn invalid_state_spec(reason: impl Into<String>) -> Self {
        VcsError::InvalidStateSpec {
            reason: reason.into(),
        }
    }

    /// Create a StorageUnavailable error
    pub fn storage_unavailable(reason: impl Into<String>) -> Self {
        VcsError::StorageUnavailable {
            reason: reason.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(what: impl Into<String>) -> Self {
        VcsError::NotFound { what: what.into() }
    }

    /// Create an InvalidCommit error
    pub fn invalid_commit(address: impl Into<String>, reason: impl Into<String>) -> Self {
        VcsError::InvalidCommit {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        VcsError::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a Serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        VcsError::Serialization {
            message: message.into(),
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        VcsError::Internal {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for VcsError {
    fn from(e: serde_json::Error) -> Self {
        VcsError::Serialization {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_implemented() {
        let err = VcsError::not_implemented("cherry-pick selector");
        let msg = err.to_string();
        assert!(msg.contains("not implemented"));
        assert!(msg.contains("cherry-pick selector"));
    }

    #[test]
    fn test_error_display_protected() {
        let err = VcsError::CannotDeleteProtectedBranch {
            branch: "L:release".to_string(),
        };
        assert!(err.to_string().contains("L:release"));
        assert_eq!(err.code(), ErrorCode::CannotDeleteProtectedBranch);
    }

    #[test]
    fn test_error_code_round_trips_through_json() {
        let json = serde_json::to_string(&ErrorCode::RebaseConflict).unwrap();
        assert_eq!(json, "\"RebaseConflict\"");
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ErrorCode::RebaseConflict);
    }

    #[test]
    fn test_error_from_serde_json() {
        let result: VcsResult<serde_json::Value> =
            serde_json::from_str("{not json").map_err(|e| e.into());
        assert!(matches!(result, Err(VcsError::Serialization { .. })));
    }

    #[test]
    fn test_code_matches_display_name() {
        let err = VcsError::NoCommonAncestor {
            source_branch: "L:a".into(),
            target: "L:b".into(),
        };
        assert_eq!(err.code().to_string(), "NoCommonAncestor");
    }
}
