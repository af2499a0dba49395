//! Version-control handle
//!
//! [`VersionControl`] owns the collaborators every operation needs: the
//! commit reader over a document store, the optional primary nameservice,
//! best-effort secondaries, the connection cache and the transactor. Branch
//! lifecycle, rebase, merge and reset operations are implemented as methods
//! on it in their own modules.

use crate::cache::ConnectionCache;
use crate::config::VcsConfig;
use crate::ledger::Ledger;
use crate::reader::CommitReader;
use crate::transact::{DocumentTransactor, Transact};
use ledgervc_core::{BranchSpec, VcsError, VcsResult};
use ledgervc_storage::{publish_to_all, DocumentStore, Nameservice};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Entry point for branch and rebase operations
pub struct VersionControl {
    config: VcsConfig,
    store: Arc<dyn DocumentStore>,
    reader: Arc<CommitReader>,
    nameservice: Option<Arc<dyn Nameservice>>,
    secondaries: Vec<Arc<dyn Nameservice>>,
    transactor: Option<Arc<dyn Transact>>,
    cache: Arc<ConnectionCache>,
}

impl VersionControl {
    /// Create a handle over `store` with no nameservice
    pub fn new(store: Arc<dyn DocumentStore>, config: VcsConfig) -> Self {
        let reader = Arc::new(CommitReader::new(
            Arc::clone(&store),
            config.commit_id_suffix.clone(),
        ));
        let cache = Arc::new(ConnectionCache::new(
            Arc::clone(&reader),
            None,
            config.cache_ledgers,
        ));
        VersionControl {
            config,
            store,
            reader,
            nameservice: None,
            secondaries: Vec::new(),
            transactor: None,
            cache,
        }
    }

    /// Use `nameservice` as the primary publisher
    pub fn with_nameservice(mut self, nameservice: Arc<dyn Nameservice>) -> Self {
        self.cache = Arc::new(ConnectionCache::new(
            Arc::clone(&self.reader),
            Some(Arc::clone(&nameservice)),
            self.config.cache_ledgers,
        ));
        self.nameservice = Some(nameservice);
        self
    }

    /// Also publish, best effort, to `nameservice`
    pub fn with_secondary(mut self, nameservice: Arc<dyn Nameservice>) -> Self {
        self.secondaries.push(nameservice);
        self
    }

    /// Replace the default document transactor
    pub fn with_transactor(mut self, transactor: Arc<dyn Transact>) -> Self {
        self.transactor = Some(transactor);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &VcsConfig {
        &self.config
    }

    /// Commit reader
    pub fn reader(&self) -> &CommitReader {
        &self.reader
    }

    /// Connection cache
    pub fn cache(&self) -> &ConnectionCache {
        &self.cache
    }

    /// Parse `spec` against the configured default branch
    pub fn parse_spec(&self, spec: &str) -> VcsResult<BranchSpec> {
        self.config.parse_spec(spec)
    }

    /// Load (or fetch from cache) the branch named by `spec`
    pub async fn load_ledger(&self, spec: &BranchSpec) -> VcsResult<Arc<Ledger>> {
        self.cache.load_ledger(spec).await
    }

    pub(crate) fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub(crate) fn nameservice(&self) -> VcsResult<&Arc<dyn Nameservice>> {
        self.nameservice.as_ref().ok_or(VcsError::NoNameservice)
    }

    pub(crate) fn transactor(&self) -> VcsResult<Arc<dyn Transact>> {
        if let Some(transactor) = &self.transactor {
            return Ok(Arc::clone(transactor));
        }
        let nameservice = self.nameservice()?;
        Ok(Arc::new(DocumentTransactor::new(
            Arc::clone(&self.store),
            Arc::clone(nameservice),
            self.active_secondaries().to_vec(),
        )))
    }

    /// Publish `doc` to the primary (awaited) and the secondaries (not awaited)
    pub(crate) async fn publish(&self, doc: &JsonValue) -> VcsResult<()> {
        self.nameservice()?.publish(doc).await?;
        publish_to_all(doc, self.active_secondaries());
        Ok(())
    }

    /// Whether a record exists for `spec`
    pub(crate) async fn branch_exists(&self, spec: &BranchSpec) -> VcsResult<bool> {
        Ok(self.nameservice()?.lookup(spec).await?.is_some())
    }

    pub(crate) fn require_same_ledger(&self, a: &BranchSpec, b: &BranchSpec) -> VcsResult<()> {
        if a.same_ledger(b) {
            Ok(())
        } else {
            Err(VcsError::invalid_branch_operation(format!(
                "'{}' and '{}' belong to different ledgers",
                a, b
            )))
        }
    }

    fn active_secondaries(&self) -> &[Arc<dyn Nameservice>] {
        if self.config.publish_to_secondaries {
            &self.secondaries
        } else {
            &[]
        }
    }
}
