//! Commit Reader
//!
//! Resolves commit addresses to validated [`Commit`]s and decodes their
//! data documents into flakes. This is the boundary where malformed
//! documents are rejected and where commit ids are normalized.

use ledgervc_core::{
    BranchMetadata, Commit, CommitDataDocument, CommitId, Flake, FlakeValue, NamespaceCodes, Sid, VcsError,
    VcsResult,
};
use ledgervc_storage::DocumentStore;
use std::sync::Arc;

/// Flakes decoded from one commit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitFlakes {
    /// Asserted flakes, `op = true`
    pub asserted: Vec<Flake>,
    /// Retracted flakes, `op = false`
    pub retracted: Vec<Flake>,
    /// Namespace codes the commit introduced
    pub namespaces: NamespaceCodes,
}

impl CommitFlakes {
    /// Whether the commit carried no flakes
    pub fn is_empty(&self) -> bool {
        self.asserted.is_empty() && self.retracted.is_empty()
    }
}

/// Reads commits and commit data from a [`DocumentStore`]
#[derive(Clone)]
pub struct CommitReader {
    store: Arc<dyn DocumentStore>,
    suffix: String,
}

impl CommitReader {
    /// Create a reader normalizing ids with `suffix`
    pub fn new(store: Arc<dyn DocumentStore>, suffix: impl Into<String>) -> Self {
        CommitReader {
            store,
            suffix: suffix.into(),
        }
    }

    /// Underlying document store
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Normalize a raw commit id the same way stored ids are normalized
    pub fn normalize_id(&self, raw: &str) -> CommitId {
        CommitId::normalized(raw, &self.suffix)
    }

    /// Normalize the commit ids carried by branch metadata
    pub fn normalize_metadata(&self, mut metadata: BranchMetadata) -> BranchMetadata {
        if let Some(source) = metadata.source_commit.take() {
            metadata.source_commit = Some(self.normalize_id(source.as_str()));
        }
        metadata
    }

    /// Read and validate the commit at `address`.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable` if the store cannot be reached
    /// - `NotFound` if the address does not resolve
    /// - `InvalidCommit` if the document is malformed
    pub async fn read_commit(&self, address: &str) -> VcsResult<Commit> {
        let doc = self.store.read(address).await?;
        let mut commit = Commit::from_document(address, &doc)?;
        commit.id = self.normalize_id(commit.id.as_str());
        if let Some(prev) = commit.previous.as_mut() {
            prev.id = self.normalize_id(prev.id.as_str());
        }
        commit.metadata = self.normalize_metadata(commit.metadata);
        Ok(commit)
    }

    /// Decode the data document of `commit`.
    ///
    /// `context` holds the namespace codes known before this commit; codes
    /// introduced by the commit itself are added to it for decoding. Returns
    /// empty sets if the commit has no data address.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommit` if the data document disagrees with the
    /// commit's `t` or references an unknown namespace code.
    pub async fn read_commit_data(
        &self,
        commit: &Commit,
        context: &NamespaceCodes,
    ) -> VcsResult<CommitFlakes> {
        let Some(address) = commit.data.address.as_deref() else {
            return Ok(CommitFlakes {
                namespaces: NamespaceCodes::empty(),
                ..Default::default()
            });
        };
        let doc = self.store.read(address).await?;
        let data = CommitDataDocument::from_document(address, &doc)?;
        if data.t != commit.t() {
            return Err(VcsError::invalid_commit(
                address,
                format!("data t = {} but commit t = {}", data.t, commit.t()),
            ));
        }

        let mut codes = context.clone();
        codes.merge(&data.namespaces);

        let t = commit.t();
        let decode = |flake: &Flake, op: bool| -> VcsResult<Flake> {
            check_codes(address, flake, &codes)?;
            Ok(flake.retimed(t).with_op(op))
        };
        let asserted = data
            .assert
            .iter()
            .map(|f| decode(f, true))
            .collect::<VcsResult<Vec<_>>>()?;
        let retracted = data
            .retract
            .iter()
            .map(|f| decode(f, false))
            .collect::<VcsResult<Vec<_>>>()?;

        Ok(CommitFlakes {
            asserted,
            retracted,
            namespaces: data.namespaces,
        })
    }
}

fn check_codes(address: &str, flake: &Flake, codes: &NamespaceCodes) -> VcsResult<()> {
    let check = |sid: &Sid| {
        if codes.contains(sid.ns_code) {
            Ok(())
        } else {
            Err(VcsError::invalid_commit(
                address,
                format!("unknown namespace code {} in {}", sid.ns_code, sid),
            ))
        }
    };
    check(&flake.s)?;
    check(&flake.p)?;
    check(&flake.dt)?;
    if let FlakeValue::Ref(sid) = &flake.o {
        check(sid)?;
    }
    Ok(())
}
