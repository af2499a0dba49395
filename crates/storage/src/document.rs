//! Byte-addressable document store
//!
//! Commits and their data documents are JSON documents stored under a
//! content-derived address. The store itself has no notion of branches,
//! order or history.

use async_trait::async_trait;
use dashmap::DashMap;
use ledgervc_core::{VcsError, VcsResult};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Kind of document being written; becomes part of the address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// A commit document
    Commit,
    /// A commit's data document
    Data,
}

impl DocumentKind {
    /// Path segment used in addresses
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Commit => "commit",
            DocumentKind::Data => "data",
        }
    }
}

/// Document store collaborator.
///
/// Reads fail with `NotFound` when the address does not resolve and
/// `StorageUnavailable` when the backend cannot be reached.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the document at `address`
    async fn read(&self, address: &str) -> VcsResult<JsonValue>;

    /// Write a document, returning its content-derived address
    async fn write(&self, kind: DocumentKind, doc: &JsonValue) -> VcsResult<String>;
}

/// Hex-encoded SHA-256 of a document's canonical JSON encoding
pub fn content_hash(doc: &JsonValue) -> VcsResult<String> {
    let bytes = serde_json::to_vec(doc)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

/// In-memory [`DocumentStore`].
///
/// Can be switched offline to simulate an unreachable backend.
#[derive(Debug)]
pub struct MemoryStore {
    docs: DashMap<String, JsonValue>,
    available: AtomicBool,
    reads: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty, online store
    pub fn new() -> Self {
        MemoryStore {
            docs: DashMap::new(),
            available: AtomicBool::new(true),
            reads: AtomicUsize::new(0),
        }
    }

    /// Toggle availability
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of successful and failed reads served so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Whether the store holds no documents
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Store a document under an explicit address (bypasses content addressing)
    pub fn insert_raw(&self, address: impl Into<String>, doc: JsonValue) {
        self.docs.insert(address.into(), doc);
    }

    fn check_available(&self) -> VcsResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(VcsError::storage_unavailable("memory store is offline"))
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, address: &str) -> VcsResult<JsonValue> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.docs
            .get(address)
            .map(|doc| doc.value().clone())
            .ok_or_else(|| VcsError::not_found(format!("document '{}'", address)))
    }

    async fn write(&self, kind: DocumentKind, doc: &JsonValue) -> VcsResult<String> {
        self.check_available()?;
        let address = format!("memory://{}/{}", kind.as_str(), content_hash(doc)?);
        self.docs.insert(address.clone(), doc.clone());
        Ok(address)
    }
}
