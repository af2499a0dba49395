//! Transact collaborator
//!
//! The only path by which a staged snapshot becomes durable. The document
//! implementation persists in three steps:
//!
//! 1. write the staged novelty as a data document
//! 2. write a commit document linking to the previous head
//! 3. publish the commit under the branch's alias/branch
//!
//! Nothing is visible until step 3, so a failure in steps 1 or 2 leaves the
//! branch unchanged (the orphaned documents are unreachable).

use crate::ledger::Ledger;
use async_trait::async_trait;
use chrono::Utc;
use ledgervc_concurrency::Snapshot;
use ledgervc_core::{
    BranchMetadata, Commit, CommitData, CommitDataDocument, CommitId, VcsError, VcsResult,
};
use ledgervc_storage::{content_hash, publish_to_all, DocumentKind, DocumentStore, Nameservice};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::info;

/// Overrides applied when committing a staged snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOptions {
    /// Commit message; falls back to the staged message
    pub message: Option<String>,
    /// Commit author; falls back to the staged author
    pub author: Option<String>,
}

/// Outcome of a successful commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReceipt {
    /// Id of the new commit
    pub commit_id: CommitId,
    /// Storage address of the new commit
    pub address: String,
    /// `t` reached by the new commit
    pub t: i64,
}

/// Persists a staged snapshot onto a branch
#[async_trait]
pub trait Transact: Send + Sync {
    /// Commit `snapshot` (staged on top of `ledger`'s head) to `ledger`'s branch
    async fn commit(
        &self,
        ledger: &Ledger,
        snapshot: &Snapshot,
        opts: &CommitOptions,
    ) -> VcsResult<CommitReceipt>;
}

/// [`Transact`] over a document store and nameservice
pub struct DocumentTransactor {
    store: Arc<dyn DocumentStore>,
    nameservice: Arc<dyn Nameservice>,
    secondaries: Vec<Arc<dyn Nameservice>>,
}

impl DocumentTransactor {
    /// Create a transactor publishing to `nameservice` and, best effort, to `secondaries`
    pub fn new(
        store: Arc<dyn DocumentStore>,
        nameservice: Arc<dyn Nameservice>,
        secondaries: Vec<Arc<dyn Nameservice>>,
    ) -> Self {
        DocumentTransactor {
            store,
            nameservice,
            secondaries,
        }
    }
}

#[async_trait]
impl Transact for DocumentTransactor {
    async fn commit(
        &self,
        ledger: &Ledger,
        snapshot: &Snapshot,
        opts: &CommitOptions,
    ) -> VcsResult<CommitReceipt> {
        let t = snapshot.t();
        if t <= ledger.t() {
            return Err(VcsError::invalid_input(format!(
                "nothing staged on '{}' (snapshot t = {}, head t = {})",
                ledger.spec(),
                t,
                ledger.t()
            )));
        }
        if t != ledger.t() + 1 {
            return Err(VcsError::invalid_input(format!(
                "snapshot t = {} does not follow head t = {}",
                t,
                ledger.t()
            )));
        }

        let novelty = snapshot.novelty();
        let data = CommitDataDocument {
            t,
            assert: novelty.added_flakes(),
            retract: novelty
                .removed_flakes()
                .into_iter()
                .map(|f| f.retimed(t))
                .collect(),
            namespaces: snapshot
                .namespaces()
                .delta_from(ledger.current_snapshot().namespaces()),
        };
        let data_address = self
            .store
            .write(DocumentKind::Data, &serde_json::to_value(&data)?)
            .await?;

        let staged = snapshot.staged();
        let commit = Commit {
            id: CommitId::new(""),
            address: String::new(),
            alias: ledger.spec().ledger().to_string(),
            branch: ledger.spec().branch().to_string(),
            data: CommitData {
                address: Some(data_address),
                t,
            },
            previous: Some(ledger.head().commit_ref()),
            message: opts
                .message
                .clone()
                .or_else(|| staged.and_then(|s| s.message.clone())),
            author: opts
                .author
                .clone()
                .or_else(|| staged.and_then(|s| s.author.clone())),
            time: Some(Utc::now()),
            metadata: ledger.branch_info(),
        };
        let (commit, doc) = persist_commit(self.store.as_ref(), commit).await?;

        self.nameservice.publish(&doc).await?;
        publish_to_all(&doc, &self.secondaries);

        info!(
            target: "ledgervc::transact",
            spec = %ledger.spec(),
            commit = %commit.id,
            t,
            asserted = data.assert.len(),
            retracted = data.retract.len(),
            "Commit published"
        );

        Ok(CommitReceipt {
            commit_id: commit.id,
            address: commit.address,
            t,
        })
    }
}

/// Assign a content-derived id to `commit`, write it, and return the stored
/// commit together with its publishable document (address included).
pub(crate) async fn persist_commit(
    store: &dyn DocumentStore,
    mut commit: Commit,
) -> VcsResult<(Commit, JsonValue)> {
    let mut doc = strip_identity(commit.to_document()?);
    commit.id = CommitId::new(format!("commit:sha256:{}", content_hash(&doc)?));
    if let Some(obj) = doc.as_object_mut() {
        obj.insert("id".into(), JsonValue::String(commit.id.to_string()));
    }
    commit.address = store.write(DocumentKind::Commit, &doc).await?;
    commit.validate()?;
    Ok((commit.clone(), commit.to_document()?))
}

/// Genesis commit for a new ledger
pub(crate) fn genesis_commit(alias: &str, branch: &str, metadata: BranchMetadata) -> Commit {
    Commit {
        id: CommitId::new(""),
        address: String::new(),
        alias: alias.to_string(),
        branch: branch.to_string(),
        data: CommitData { address: None, t: 0 },
        previous: None,
        message: None,
        author: None,
        time: Some(Utc::now()),
        metadata,
    }
}

fn strip_identity(mut doc: JsonValue) -> JsonValue {
    if let Some(obj) = doc.as_object_mut() {
        obj.remove("id");
        obj.remove("address");
    }
    doc
}
