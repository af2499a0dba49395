//! Nameservice: branch name → head commit pointer
//!
//! The nameservice is the sole source of truth for branch pointers. A
//! pointer moves by publishing a commit document tagged with the branch's
//! alias/branch; it disappears when retracted. There is no locking: the
//! last publish for a branch wins.

use async_trait::async_trait;
use ledgervc_core::{BranchMetadata, BranchSpec, Commit, CommitId, VcsError, VcsResult};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// One published branch pointer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NsRecord {
    /// Ledger name
    pub ledger: String,
    /// Branch name
    pub branch: String,
    /// Address of the head commit
    pub address: String,
    /// Id of the head commit
    pub commit_id: CommitId,
    /// `t` of the head commit
    pub t: i64,
    /// Branch metadata carried by the published document
    pub metadata: BranchMetadata,
}

impl NsRecord {
    /// Build a record from a commit document about to be published
    pub fn from_commit_document(doc: &JsonValue) -> VcsResult<NsRecord> {
        let address = doc
            .get("address")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();
        if address.is_empty() {
            return Err(VcsError::invalid_commit("<unpublished>", "missing address"));
        }
        let commit = Commit::from_document(&address, doc)?;
        Ok(NsRecord {
            ledger: commit.alias,
            branch: commit.branch,
            address: commit.address,
            commit_id: commit.id,
            t: commit.data.t,
            metadata: commit.metadata,
        })
    }

    /// Spec of the branch this record points
    pub fn spec(&self) -> BranchSpec {
        BranchSpec::new(self.ledger.clone(), self.branch.clone())
    }
}

/// Nameservice collaborator
#[async_trait]
pub trait Nameservice: Send + Sync {
    /// Publish (create or move) the pointer described by `commit_doc`
    async fn publish(&self, commit_doc: &JsonValue) -> VcsResult<()>;

    /// Remove the pointer for `spec`
    async fn retract(&self, spec: &BranchSpec) -> VcsResult<()>;

    /// Every record this nameservice knows
    async fn all_records(&self) -> VcsResult<Vec<NsRecord>>;

    /// Record for `spec`, if published
    async fn lookup(&self, spec: &BranchSpec) -> VcsResult<Option<NsRecord>>;
}

/// Publish to each secondary without waiting for the outcome.
///
/// Failures are logged and otherwise ignored. Must be called from within a
/// tokio runtime.
pub fn publish_to_all(doc: &JsonValue, secondaries: &[Arc<dyn Nameservice>]) {
    for ns in secondaries {
        let ns = Arc::clone(ns);
        let doc = doc.clone();
        tokio::spawn(async move {
            if let Err(e) = ns.publish(&doc).await {
                warn!(
                    target: "ledgervc::nameservice",
                    error = %e,
                    "Secondary publish failed"
                );
            }
        });
    }
}

/// A call observed by [`MemoryNameservice`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NsCall {
    /// `publish` for the given `ledger:branch`
    Publish(String),
    /// `retract` for the given `ledger:branch`
    Retract(String),
}

/// In-memory [`Nameservice`] that records every mutating call
#[derive(Debug, Default)]
pub struct MemoryNameservice {
    records: RwLock<BTreeMap<String, NsRecord>>,
    calls: Mutex<Vec<NsCall>>,
}

impl MemoryNameservice {
    /// Create an empty nameservice
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutating calls seen so far, oldest first
    pub fn calls(&self) -> Vec<NsCall> {
        self.calls.lock().clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Synchronous lookup by spec
    pub fn get(&self, spec: &BranchSpec) -> Option<NsRecord> {
        self.records.read().get(&spec.to_string()).cloned()
    }
}

#[async_trait]
impl Nameservice for MemoryNameservice {
    async fn publish(&self, commit_doc: &JsonValue) -> VcsResult<()> {
        let record = NsRecord::from_commit_document(commit_doc)?;
        let key = record.spec().to_string();
        self.calls.lock().push(NsCall::Publish(key.clone()));
        self.records.write().insert(key, record);
        Ok(())
    }

    async fn retract(&self, spec: &BranchSpec) -> VcsResult<()> {
        let key = spec.to_string();
        self.calls.lock().push(NsCall::Retract(key.clone()));
        self.records
            .write()
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| VcsError::not_found(format!("branch '{}'", key)))
    }

    async fn all_records(&self) -> VcsResult<Vec<NsRecord>> {
        Ok(self.records.read().values().cloned().collect())
    }

    async fn lookup(&self, spec: &BranchSpec) -> VcsResult<Option<NsRecord>> {
        Ok(self.get(spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(branch: &str, t: i64) -> JsonValue {
        let mut doc = json!({
            "id": format!("c{}", t),
            "address": format!("memory://c{}", t),
            "alias": "L",
            "branch": branch,
            "data": {"t": t},
            "protected": true
        });
        if t > 0 {
            doc["previous"] = json!({"id": "g", "address": "memory://g"});
        }
        doc
    }

    #[tokio::test]
    async fn test_publish_lookup_retract() {
        let ns = MemoryNameservice::new();
        ns.publish(&doc("main", 0)).await.unwrap();
        ns.publish(&doc("feature", 2)).await.unwrap();

        let spec = BranchSpec::new("L", "feature");
        let record = ns.lookup(&spec).await.unwrap().unwrap();
        assert_eq!(record.t, 2);
        assert_eq!(record.commit_id, CommitId::new("c2"));
        assert!(record.metadata.protected);
        assert_eq!(ns.all_records().await.unwrap().len(), 2);

        ns.retract(&spec).await.unwrap();
        assert!(ns.lookup(&spec).await.unwrap().is_none());
        assert_eq!(
            ns.calls(),
            vec![
                NsCall::Publish("L:main".into()),
                NsCall::Publish("L:feature".into()),
                NsCall::Retract("L:feature".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_publish_overwrites() {
        let ns = MemoryNameservice::new();
        ns.publish(&doc("main", 0)).await.unwrap();
        ns.publish(&doc("main", 3)).await.unwrap();
        let record = ns.get(&BranchSpec::new("L", "main")).unwrap();
        assert_eq!(record.t, 3);
    }

    #[tokio::test]
    async fn test_retract_missing_is_not_found() {
        let ns = MemoryNameservice::new();
        let err = ns.retract(&BranchSpec::new("L", "x")).await.unwrap_err();
        assert!(matches!(err, VcsError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_publish_rejects_unaddressed_document() {
        let ns = MemoryNameservice::new();
        let mut d = doc("main", 0);
        d.as_object_mut().unwrap().remove("address");
        assert!(ns.publish(&d).await.is_err());
        assert!(ns.calls().is_empty());
    }

    #[tokio::test]
    async fn test_publish_to_all_reaches_secondaries() {
        let secondary = Arc::new(MemoryNameservice::new());
        let secondaries: Vec<Arc<dyn Nameservice>> = vec![secondary.clone()];
        publish_to_all(&doc("main", 0), &secondaries);
        for _ in 0..10 {
            if secondary.get(&BranchSpec::new("L", "main")).is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(secondary.get(&BranchSpec::new("L", "main")).is_some());
    }
}
