//! Core identifiers for ledgers, branches and commits
//!
//! This module defines:
//! - BranchSpec: parsed `"<ledger>:<branch>"` reference
//! - CommitId: normalized content-hash identifier of a commit
//!
//! ## Branch spec format
//!
//! `"<ledger-name>:<branch-name>"`. Absence of `:branch` implies the
//! default branch.
//!
//! ## Validation
//!
//! Names must:
//! - Be 1-256 characters
//! - Contain only alphanumeric, dash, underscore, dot (ledgers may also use `/`)
//! - Not start with a dash or dot

use crate::error::{VcsError, VcsResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Name of the default branch when none is configured
pub const DEFAULT_BRANCH: &str = "main";

/// Trailing suffix some backends append to commit ids
pub const DEFAULT_COMMIT_ID_SUFFIX: &str = ".json";

/// Maximum length of a ledger or branch name
pub const MAX_NAME_LENGTH: usize = 256;

/// A parsed branch reference: ledger name plus branch name.
///
/// Equality, hashing and ordering look at the names only, so `"L"` and
/// `"L:main"` are the same branch.
#[derive(Debug, Clone)]
pub struct BranchSpec {
    ledger: String,
    branch: String,
    qualified: bool,
}

impl BranchSpec {
    /// Parse a spec, using [`DEFAULT_BRANCH`] when no branch is given
    pub fn parse(spec: &str) -> VcsResult<Self> {
        Self::parse_with_default(spec, DEFAULT_BRANCH)
    }

    /// Parse a spec, using `default_branch` when no branch is given
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if either name is invalid.
    pub fn parse_with_default(spec: &str, default_branch: &str) -> VcsResult<Self> {
        let (ledger, branch, qualified) = match spec.split_once(':') {
            Some((ledger, branch)) => (ledger, branch, true),
            None => (spec, default_branch, false),
        };
        validate_name(ledger, true)
            .map_err(|reason| VcsError::invalid_input(format!("ledger '{}': {}", ledger, reason)))?;
        validate_name(branch, false)
            .map_err(|reason| VcsError::invalid_input(format!("branch '{}': {}", branch, reason)))?;
        Ok(BranchSpec {
            ledger: ledger.to_string(),
            branch: branch.to_string(),
            qualified,
        })
    }

    /// Build a fully-qualified spec from already validated parts
    pub fn new(ledger: impl Into<String>, branch: impl Into<String>) -> Self {
        BranchSpec {
            ledger: ledger.into(),
            branch: branch.into(),
            qualified: true,
        }
    }

    /// Ledger name
    pub fn ledger(&self) -> &str {
        &self.ledger
    }

    /// Branch name (the default branch if the spec was unqualified)
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Whether the spec named its branch explicitly
    pub fn is_qualified(&self) -> bool {
        self.qualified
    }

    /// True for the unqualified spec or the configured default branch
    pub fn is_default(&self, default_branch: &str) -> bool {
        !self.qualified || self.branch == default_branch
    }

    /// True if both specs live in the same ledger
    pub fn same_ledger(&self, other: &BranchSpec) -> bool {
        self.ledger == other.ledger
    }

    /// Same ledger, different branch
    pub fn with_branch(&self, branch: impl Into<String>) -> Self {
        BranchSpec::new(self.ledger.clone(), branch)
    }

    fn key(&self) -> (&str, &str) {
        (&self.ledger, &self.branch)
    }
}

impl PartialEq for BranchSpec {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for BranchSpec {}

impl Hash for BranchSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for BranchSpec {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BranchSpec {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for BranchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ledger, self.branch)
    }
}

fn validate_name(name: &str, allow_slash: bool) -> Result<(), String> {
    if name.is_empty() {
        return Err("name cannot be empty".to_string());
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(format!(
            "name too long: {} chars (max {})",
            name.len(),
            MAX_NAME_LENGTH
        ));
    }
    if name.starts_with('-') || name.starts_with('.') {
        return Err("name cannot start with '-' or '.'".to_string());
    }
    for (pos, ch) in name.chars().enumerate() {
        let ok = ch.is_ascii_alphanumeric()
            || ch == '-'
            || ch == '_'
            || ch == '.'
            || (allow_slash && ch == '/');
        if !ok {
            return Err(format!("invalid character '{}' at position {}", ch, pos));
        }
    }
    Ok(())
}

/// Normalized commit identifier.
///
/// The same commit may be spelled with or without a trailing storage
/// suffix. [`CommitId::new`] and [`CommitId::normalized`] strip it.
/// Deserialization keeps the stored spelling; the commit reader normalizes
/// it with the configured suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitId(String);

impl CommitId {
    /// Normalize using [`DEFAULT_COMMIT_ID_SUFFIX`]
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self::normalized(raw, DEFAULT_COMMIT_ID_SUFFIX)
    }

    /// Normalize by stripping `suffix` if present
    pub fn normalized(raw: impl AsRef<str>, suffix: &str) -> Self {
        let raw = raw.as_ref();
        let trimmed = if suffix.is_empty() {
            raw
        } else {
            raw.strip_suffix(suffix).unwrap_or(raw)
        };
        CommitId(trimmed.to_string())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the hex part of the id starts with `prefix`
    pub fn matches_sha_prefix(&self, prefix: &str) -> bool {
        let hash = self.0.rsplit(':').next().unwrap_or(&self.0);
        !prefix.is_empty() && (hash.starts_with(prefix) || self.0.starts_with(prefix))
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for CommitId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CommitId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(CommitId)
    }
}
