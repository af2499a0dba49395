//! Rebase Orchestrator
//!
//! `rebase` moves the changes of a source branch onto a target branch of the
//! same ledger:
//!
//! ```text
//! Start → ValidateSameLedger → (preview? return) → CheckFastForward
//!       → FastForward | Squash | CannotFastForward | NotImplemented(replay)
//!       → Success | Conflict
//! ```
//!
//! Validation failures and unsupported options are returned as `Err`.
//! A squash conflict and a refused fast-forward under `ff = only` are
//! ordinary results with `status` set accordingly; use
//! [`RebaseResult::into_result`] to turn them into errors.

use crate::ancestry::{find_common_ancestor, CommonAncestor};
use crate::changes::compute_net_changes;
use crate::ledger::Ledger;
use crate::transact::CommitOptions;
use crate::vcs::VersionControl;
use crate::walker::commits_after;
use ledgervc_concurrency::{check_write_write_conflicts, stage, ConflictResult, StageOptions};
use ledgervc_core::{BranchSpec, Commit, CommitId, ErrorCode, Spot, VcsError, VcsResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// =============================================================================
// Options
// =============================================================================

/// Fast-forward policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FastForwardMode {
    /// Fast-forward when possible, otherwise fall through
    #[default]
    Auto,
    /// Fast-forward or report `CannotFastForward`
    Only,
    /// Never fast-forward
    Never,
}

/// Options for [`VersionControl::rebase`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RebaseOptions {
    /// Fast-forward policy
    pub ff: FastForwardMode,
    /// Combine the source's post-ancestor commits into one commit
    pub squash: bool,
    /// Describe the decision without writing
    pub preview: bool,
    /// Apply all-or-nothing (the only supported mode)
    pub atomic: bool,
    /// Individual commits to pick (unsupported)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<Vec<String>>,
}

impl Default for RebaseOptions {
    fn default() -> Self {
        RebaseOptions {
            ff: FastForwardMode::Auto,
            squash: false,
            preview: false,
            atomic: true,
            selector: None,
        }
    }
}

impl RebaseOptions {
    /// Squash rebase with default fast-forward policy
    pub fn squash() -> Self {
        RebaseOptions {
            squash: true,
            ..Default::default()
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// Overall outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebaseStatus {
    /// Target updated (or already up to date)
    Success,
    /// Overlapping writes; nothing was written
    Conflict,
    /// Refused without writing; see `error`
    Error,
    /// Decision only; nothing was written
    Preview,
}

/// How the target was (or would be) updated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RebaseStrategy {
    /// Target pointer moved to the source head
    FastForward,
    /// Source changes combined into one new commit
    Squash,
}

/// Commit accounting for a rebase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    /// Source commits carried onto the target
    pub applied: usize,
    /// Source commits not carried over
    pub skipped: usize,
    /// Spots both sides changed since the common ancestor
    pub conflicts: Vec<Spot>,
}

/// Decision summary returned with `preview`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebasePreview {
    /// Whether the target could be fast-forwarded
    pub can_fast_forward: bool,
    /// Strategy a non-preview call would use, if any
    pub strategy: Option<RebaseStrategy>,
    /// Lowest common ancestor
    pub common_ancestor: CommitId,
    /// Source commits after the ancestor
    pub source_commits: usize,
    /// Target commits after the ancestor
    pub target_commits: usize,
}

/// Structured rebase result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebaseResult {
    /// Outcome
    pub status: RebaseStatus,
    /// Always `"rebase"`
    pub operation: String,
    /// Source branch spec
    pub from: String,
    /// Target branch spec
    pub to: String,
    /// Strategy used
    pub strategy: Option<RebaseStrategy>,
    /// Commit created on the target, if any
    pub new_commit: Option<CommitId>,
    /// Soft error, for `Conflict` and `Error`
    pub error: Option<ErrorCode>,
    /// Commit accounting
    pub commits: CommitSummary,
    /// Present for `Preview`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<RebasePreview>,
}

impl RebaseResult {
    fn new(status: RebaseStatus, source: &BranchSpec, target: &BranchSpec) -> Self {
        RebaseResult {
            status,
            operation: "rebase".to_string(),
            from: source.to_string(),
            to: target.to_string(),
            strategy: None,
            new_commit: None,
            error: None,
            commits: CommitSummary::default(),
            preview: None,
        }
    }

    /// Whether the target was updated or already up to date
    pub fn is_success(&self) -> bool {
        self.status == RebaseStatus::Success
    }

    /// Convert soft outcomes into errors.
    ///
    /// `Conflict` becomes `RebaseConflict`, a refused fast-forward becomes
    /// `CannotFastForward`; every other result is returned unchanged.
    pub fn into_result(self) -> VcsResult<RebaseResult> {
        match (self.status, self.error) {
            (RebaseStatus::Conflict, _) => Err(VcsError::RebaseConflict {
                spots: self.commits.conflicts.len(),
            }),
            (RebaseStatus::Error, Some(ErrorCode::CannotFastForward)) => {
                Err(VcsError::CannotFastForward {
                    source_branch: self.from,
                    target: self.to,
                })
            }
            _ => Ok(self),
        }
    }
}

// =============================================================================
// Orchestration
// =============================================================================

impl VersionControl {
    /// Rebase `source` onto `target`.
    ///
    /// # Errors
    ///
    /// - `InvalidBranchOperation` if the branches belong to different ledgers
    ///   or are the same branch
    /// - `NotImplemented` for a `selector`, `atomic = false`, or a
    ///   non-squash rebase that cannot fast-forward
    /// - `NoCommonAncestor` and collaborator errors
    pub async fn rebase(
        &self,
        source: &str,
        target: &str,
        opts: &RebaseOptions,
    ) -> VcsResult<RebaseResult> {
        let source_spec = self.parse_spec(source)?;
        let target_spec = self.parse_spec(target)?;
        self.require_same_ledger(&source_spec, &target_spec)?;
        if source_spec == target_spec {
            return Err(VcsError::invalid_branch_operation(format!(
                "cannot rebase '{}' onto itself",
                source_spec
            )));
        }
        if opts.selector.is_some() {
            return Err(VcsError::not_implemented("cherry-pick selector"));
        }
        if !opts.atomic {
            return Err(VcsError::not_implemented("non-atomic rebase"));
        }

        let source_ledger = self.load_ledger(&source_spec).await?;
        let target_ledger = self.load_ledger(&target_spec).await?;
        let lca = find_common_ancestor(self.reader(), &source_ledger, &target_ledger).await?;
        let fast_forward = lca.id == target_ledger.head().id;

        debug!(
            target: "ledgervc::rebase",
            source = %source_spec,
            target_branch = %target_spec,
            lca = %lca.id,
            fast_forward,
            ff = ?opts.ff,
            squash = opts.squash,
            "Rebase decision"
        );

        if opts.preview {
            return self
                .preview(&source_ledger, &target_ledger, &lca, fast_forward, opts)
                .await;
        }

        if opts.ff == FastForwardMode::Only && !fast_forward {
            let mut result = RebaseResult::new(RebaseStatus::Error, &source_spec, &target_spec);
            result.error = Some(ErrorCode::CannotFastForward);
            return Ok(result);
        }

        if fast_forward && opts.ff != FastForwardMode::Never {
            return self
                .fast_forward(&source_ledger, &target_ledger, &lca)
                .await;
        }

        if opts.squash {
            return self.squash(&source_ledger, &target_ledger, &lca).await;
        }

        Err(VcsError::not_implemented("commit-by-commit replay"))
    }

    async fn preview(
        &self,
        source: &Ledger,
        target: &Ledger,
        lca: &CommonAncestor,
        fast_forward: bool,
        opts: &RebaseOptions,
    ) -> VcsResult<RebaseResult> {
        let source_commits = self.commits_since(source, lca).await?;
        let target_commits = self.commits_since(target, lca).await?;
        let strategy = if fast_forward && opts.ff != FastForwardMode::Never {
            Some(RebaseStrategy::FastForward)
        } else if opts.ff == FastForwardMode::Only {
            None
        } else if opts.squash {
            Some(RebaseStrategy::Squash)
        } else {
            None
        };

        let mut result = RebaseResult::new(RebaseStatus::Preview, source.spec(), target.spec());
        result.strategy = strategy;
        result.preview = Some(RebasePreview {
            can_fast_forward: fast_forward,
            strategy,
            common_ancestor: lca.id.clone(),
            source_commits: source_commits.len(),
            target_commits: target_commits.len(),
        });
        Ok(result)
    }

    async fn fast_forward(
        &self,
        source: &Ledger,
        target: &Ledger,
        lca: &CommonAncestor,
    ) -> VcsResult<RebaseResult> {
        let applied = self.commits_since(source, lca).await?.len();
        let moved = source.head().retagged(
            target.spec().ledger(),
            target.spec().branch(),
            target.branch_info(),
        );
        self.publish(&moved.to_document()?).await?;
        self.cache().release_ledger(target.spec());

        info!(
            target: "ledgervc::rebase",
            source = %source.spec(),
            target_branch = %target.spec(),
            head = %moved.id,
            t = moved.t(),
            applied,
            strategy = "fast-forward",
            "Branch fast-forwarded"
        );

        let mut result = RebaseResult::new(RebaseStatus::Success, source.spec(), target.spec());
        result.strategy = Some(RebaseStrategy::FastForward);
        result.commits.applied = applied;
        Ok(result)
    }

    async fn squash(
        &self,
        source: &Ledger,
        target: &Ledger,
        lca: &CommonAncestor,
    ) -> VcsResult<RebaseResult> {
        let source_commits = self.commits_since(source, lca).await?;
        let target_commits = self.commits_since(target, lca).await?;
        let target_snapshot = target.current_snapshot();

        let net = compute_net_changes(self.reader(), &source_commits, &target_snapshot).await?;

        let conflict = if target_commits.is_empty() {
            debug!(
                target: "ledgervc::rebase",
                target_branch = %target.spec(),
                "Target has not diverged; skipping conflict check"
            );
            ConflictResult::NoConflict
        } else {
            let base = target
                .snapshot_before(self.reader(), target_commits.len())
                .await?;
            let ours = compute_net_changes(self.reader(), &source_commits, &base).await?;
            let theirs = compute_net_changes(self.reader(), &target_commits, &base).await?;
            check_write_write_conflicts(&ours.footprint, &theirs.footprint)
        };

        let mut result = RebaseResult::new(RebaseStatus::Success, source.spec(), target.spec());
        result.strategy = Some(RebaseStrategy::Squash);

        if let ConflictResult::WriteWriteConflict { spots } = conflict {
            info!(
                target: "ledgervc::rebase",
                source = %source.spec(),
                target_branch = %target.spec(),
                conflicts = spots.len(),
                "Squash rebase conflicted"
            );
            result.status = RebaseStatus::Conflict;
            result.error = Some(ErrorCode::RebaseConflict);
            result.commits.skipped = source_commits.len();
            result.commits.conflicts = spots;
            return Ok(result);
        }

        let staged = stage(
            &net.snapshot,
            &net.flakes,
            &StageOptions::with_message(format!(
                "squash {} onto {}",
                source.spec(),
                target.spec()
            )),
        );
        result.commits.applied = source_commits.len();

        if staged.t() == target_snapshot.t() {
            debug!(
                target: "ledgervc::rebase",
                source = %source.spec(),
                target_branch = %target.spec(),
                "Nothing to squash"
            );
            return Ok(result);
        }

        let receipt = self
            .transactor()?
            .commit(target, &staged, &CommitOptions::default())
            .await?;
        self.cache().release_ledger(target.spec());

        info!(
            target: "ledgervc::rebase",
            source = %source.spec(),
            target_branch = %target.spec(),
            commit = %receipt.commit_id,
            t = receipt.t,
            flakes = net.flakes.len(),
            strategy = "squash",
            "Squash rebase committed"
        );

        result.new_commit = Some(receipt.commit_id);
        Ok(result)
    }

    /// Commits on `ledger` after the ancestor, oldest first
    pub(crate) async fn commits_since(
        &self,
        ledger: &Ledger,
        lca: &CommonAncestor,
    ) -> VcsResult<Vec<Commit>> {
        commits_after(self.reader(), ledger.head().clone(), &lca.id, lca.t).await
    }
}
