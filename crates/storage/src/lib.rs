//! Storage collaborators for ledgervc
//!
//! This crate defines the external interfaces the version-control core
//! consumes, plus in-memory implementations:
//! - DocumentStore: content-addressed commit/data documents
//! - Nameservice: branch name → head commit pointers
//! - publish_to_all: fire-and-forget secondary publishing

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod nameservice;

pub use document::{content_hash, DocumentKind, DocumentStore, MemoryStore};
pub use nameservice::{publish_to_all, MemoryNameservice, Nameservice, NsCall, NsRecord};
