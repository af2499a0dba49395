//! Merge (preview only)
//!
//! Three-way content merge with field-level reconciliation is not
//! implemented. `merge` can describe what a merge would start from, and
//! otherwise reports `NotImplemented` rather than falling back to a squash.

use crate::ancestry::find_common_ancestor;
use crate::vcs::VersionControl;
use ledgervc_core::{CommitId, VcsError, VcsResult};
use serde::{Deserialize, Serialize};

/// Options for [`VersionControl::merge`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Describe the merge without writing
    pub preview: bool,
}

/// What a merge of `from` into `to` would start from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePreview {
    /// Always `"merge"`
    pub operation: String,
    /// Source branch spec
    pub from: String,
    /// Target branch spec
    pub to: String,
    /// Lowest common ancestor
    pub common_ancestor: CommitId,
    /// Whether the target could simply be fast-forwarded
    pub can_fast_forward: bool,
    /// Source commits after the ancestor
    pub source_commits: usize,
    /// Target commits after the ancestor
    pub target_commits: usize,
}

impl VersionControl {
    /// Merge `source` into `target`.
    ///
    /// Only `preview` is supported.
    ///
    /// # Errors
    ///
    /// - `InvalidBranchOperation` if the branches belong to different ledgers
    /// - `NotImplemented` without `preview`
    pub async fn merge(
        &self,
        source: &str,
        target: &str,
        opts: &MergeOptions,
    ) -> VcsResult<MergePreview> {
        let source_spec = self.parse_spec(source)?;
        let target_spec = self.parse_spec(target)?;
        self.require_same_ledger(&source_spec, &target_spec)?;
        if !opts.preview {
            return Err(VcsError::not_implemented("three-way merge"));
        }

        let source_ledger = self.load_ledger(&source_spec).await?;
        let target_ledger = self.load_ledger(&target_spec).await?;
        let lca = find_common_ancestor(self.reader(), &source_ledger, &target_ledger).await?;
        let source_commits = self.commits_since(&source_ledger, &lca).await?;
        let target_commits = self.commits_since(&target_ledger, &lca).await?;

        Ok(MergePreview {
            operation: "merge".to_string(),
            from: source_spec.to_string(),
            to: target_spec.to_string(),
            can_fast_forward: lca.id == target_ledger.head().id,
            common_ancestor: lca.id,
            source_commits: source_commits.len(),
            target_commits: target_commits.len(),
        })
    }
}
