//! Ancestry Resolver and Fast-Forward Checker
//!
//! Finds the lowest common ancestor (LCA) of two branch heads. Four O(1)
//! shortcuts over branch metadata are tried in order before falling back to
//! walking both chains:
//!
//! 1. both heads are the same commit
//! 2. source was created from target's head
//! 3. target was created from source's head
//! 4. both were created from the same commit
//!
//! The fallback collects the source chain's ids and scans the target chain
//! from its head for the first shared id. If no id matches (the backends
//! spell ids differently), the scan is repeated keyed on `t`.

use crate::ledger::Ledger;
use crate::reader::CommitReader;
use crate::walker::collect_chain;
use ledgervc_core::{CommitId, VcsError, VcsResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// How the common ancestor was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AncestorMethod {
    /// Heads are identical
    SameHead,
    /// Source was created from target's head
    SourceCreatedFromTarget,
    /// Target was created from source's head
    TargetCreatedFromSource,
    /// Both branches share the same creation commit
    SharedCreationPoint,
    /// Id match while walking both chains
    ChainWalk,
    /// `t` match while walking both chains
    TFallback,
}

/// Lowest common ancestor of two branches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonAncestor {
    /// Ancestor commit id
    pub id: CommitId,
    /// Ancestor `t`, when known without extra reads
    pub t: Option<i64>,
    /// Which rule produced the answer
    pub method: AncestorMethod,
}

/// Find the lowest common ancestor of `source` and `target`.
///
/// # Errors
///
/// Returns `NoCommonAncestor` if the chains share neither an id nor a `t`.
pub async fn find_common_ancestor(
    reader: &CommitReader,
    source: &Ledger,
    target: &Ledger,
) -> VcsResult<CommonAncestor> {
    if let Some(found) = shortcut(source, target) {
        debug!(
            target: "ledgervc::ancestry",
            source = %source.spec(),
            target_branch = %target.spec(),
            lca = %found.id,
            method = ?found.method,
            "Common ancestor from metadata"
        );
        return Ok(found);
    }

    let source_chain = collect_chain(reader, source.head().clone()).await?;
    let target_chain = collect_chain(reader, target.head().clone()).await?;

    let source_ids: HashSet<&CommitId> = source_chain.iter().map(|c| &c.id).collect();
    if let Some(commit) = target_chain.iter().find(|c| source_ids.contains(&c.id)) {
        debug!(
            target: "ledgervc::ancestry",
            source = %source.spec(),
            target_branch = %target.spec(),
            lca = %commit.id,
            "Common ancestor from chain walk"
        );
        return Ok(CommonAncestor {
            id: commit.id.clone(),
            t: Some(commit.t()),
            method: AncestorMethod::ChainWalk,
        });
    }

    let source_ts: HashSet<i64> = source_chain.iter().map(|c| c.t()).collect();
    if let Some(commit) = target_chain.iter().find(|c| source_ts.contains(&c.t())) {
        warn!(
            target: "ledgervc::ancestry",
            source = %source.spec(),
            target_branch = %target.spec(),
            lca = %commit.id,
            t = commit.t(),
            "No shared commit id; common ancestor matched on t"
        );
        return Ok(CommonAncestor {
            id: commit.id.clone(),
            t: Some(commit.t()),
            method: AncestorMethod::TFallback,
        });
    }

    Err(VcsError::NoCommonAncestor {
        source_branch: source.spec().to_string(),
        target: target.spec().to_string(),
    })
}

fn shortcut(source: &Ledger, target: &Ledger) -> Option<CommonAncestor> {
    let source_head = source.head();
    let target_head = target.head();
    let source_info = source.branch_info();
    let target_info = target.branch_info();

    if source_head.id == target_head.id {
        return Some(CommonAncestor {
            id: source_head.id.clone(),
            t: Some(source_head.t()),
            method: AncestorMethod::SameHead,
        });
    }
    if source_info.created_from_commit() == Some(&target_head.id) {
        return Some(CommonAncestor {
            id: target_head.id.clone(),
            t: Some(target_head.t()),
            method: AncestorMethod::SourceCreatedFromTarget,
        });
    }
    if target_info.created_from_commit() == Some(&source_head.id) {
        return Some(CommonAncestor {
            id: source_head.id.clone(),
            t: Some(source_head.t()),
            method: AncestorMethod::TargetCreatedFromSource,
        });
    }
    match (source_info.source_commit, target_info.source_commit) {
        (Some(a), Some(b)) if a == b => Some(CommonAncestor {
            id: a,
            t: None,
            method: AncestorMethod::SharedCreationPoint,
        }),
        _ => None,
    }
}

/// True iff `target` can be moved to `source`'s head without a new commit,
/// i.e. the common ancestor is `target`'s head.
pub async fn can_fast_forward(
    reader: &CommitReader,
    source: &Ledger,
    target: &Ledger,
) -> VcsResult<bool> {
    let lca = find_common_ancestor(reader, source, target).await?;
    Ok(lca.id == target.head().id)
}
