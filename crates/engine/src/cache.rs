//! Connection Cache
//!
//! Explicit handle over loaded branches, keyed by canonical branch spec.
//! Anything that moves a branch pointer must call
//! [`ConnectionCache::release_ledger`] so the next load sees fresh state.

use crate::ledger::Ledger;
use crate::reader::CommitReader;
use dashmap::DashMap;
use ledgervc_core::{BranchSpec, VcsError, VcsResult};
use ledgervc_storage::Nameservice;
use std::sync::Arc;
use tracing::debug;

/// Concurrent spec → [`Ledger`] cache
pub struct ConnectionCache {
    reader: Arc<CommitReader>,
    nameservice: Option<Arc<dyn Nameservice>>,
    ledgers: DashMap<String, Arc<Ledger>>,
    retain: bool,
}

impl ConnectionCache {
    /// Create a cache; with `retain = false` every load reads through
    pub fn new(
        reader: Arc<CommitReader>,
        nameservice: Option<Arc<dyn Nameservice>>,
        retain: bool,
    ) -> Self {
        ConnectionCache {
            reader,
            nameservice,
            ledgers: DashMap::new(),
            retain,
        }
    }

    /// Load the branch named by `spec`.
    ///
    /// # Errors
    ///
    /// - `NoNameservice` if no nameservice is configured
    /// - `NotFound` if the branch has no published record
    /// - any reader error while materializing the chain
    pub async fn load_ledger(&self, spec: &BranchSpec) -> VcsResult<Arc<Ledger>> {
        let key = spec.to_string();
        if let Some(ledger) = self.ledgers.get(&key) {
            return Ok(Arc::clone(ledger.value()));
        }

        let nameservice = self.nameservice.as_ref().ok_or(VcsError::NoNameservice)?;
        let record = nameservice
            .lookup(spec)
            .await?
            .ok_or_else(|| VcsError::not_found(format!("branch '{}'", key)))?;
        let ledger = Arc::new(Ledger::load(&self.reader, &record).await?);

        if self.retain {
            self.ledgers.insert(key, Arc::clone(&ledger));
        }
        Ok(ledger)
    }

    /// Drop any cached state for `spec`
    pub fn release_ledger(&self, spec: &BranchSpec) {
        if self.ledgers.remove(&spec.to_string()).is_some() {
            debug!(target: "ledgervc::cache", spec = %spec, "Ledger released");
        }
    }

    /// Whether `spec` is currently cached
    pub fn is_cached(&self, spec: &BranchSpec) -> bool {
        self.ledgers.contains_key(&spec.to_string())
    }

    /// Number of cached ledgers
    pub fn len(&self) -> usize {
        self.ledgers.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }
}
