//! Loaded branch state
//!
//! A [`Ledger`] is one branch materialized from its nameservice record: the
//! head commit, the snapshot obtained by replaying the chain from genesis,
//! and the branch metadata carried by the record.

use crate::reader::CommitReader;
use crate::walker::collect_chain;
use ledgervc_concurrency::Snapshot;
use ledgervc_core::{BranchDescriptor, BranchMetadata, BranchSpec, Commit, VcsError, VcsResult};
use ledgervc_storage::NsRecord;
use tracing::debug;

/// A branch loaded at its current head
#[derive(Debug, Clone)]
pub struct Ledger {
    spec: BranchSpec,
    head: Commit,
    snapshot: Snapshot,
    metadata: BranchMetadata,
}

impl Ledger {
    /// Materialize the branch described by `record`
    pub async fn load(reader: &CommitReader, record: &NsRecord) -> VcsResult<Ledger> {
        let spec = record.spec();
        let head = reader.read_commit(&record.address).await?;
        let mut chain = collect_chain(reader, head.clone()).await?;
        chain.reverse();
        let snapshot = replay(reader, &spec, &chain).await?;

        debug!(
            target: "ledgervc::cache",
            spec = %spec,
            head = %head.id,
            t = head.t(),
            commits = chain.len(),
            "Ledger loaded"
        );

        Ok(Ledger {
            spec,
            head,
            snapshot,
            metadata: reader.normalize_metadata(record.metadata.clone()),
        })
    }

    /// Branch this ledger was loaded for
    pub fn spec(&self) -> &BranchSpec {
        &self.spec
    }

    /// Head commit
    pub fn head(&self) -> &Commit {
        &self.head
    }

    /// `t` of the head commit
    pub fn t(&self) -> i64 {
        self.head.t()
    }

    /// Snapshot at the head
    pub fn current_snapshot(&self) -> Snapshot {
        self.snapshot.clone()
    }

    /// Snapshot with the newest `trailing` commits left out.
    ///
    /// Replays the chain from genesis; `trailing = 0` is the head snapshot.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the chain has fewer than `trailing` commits.
    pub async fn snapshot_before(
        &self,
        reader: &CommitReader,
        trailing: usize,
    ) -> VcsResult<Snapshot> {
        if trailing == 0 {
            return Ok(self.current_snapshot());
        }
        let mut chain = collect_chain(reader, self.head.clone()).await?;
        if chain.len() <= trailing {
            return Err(VcsError::not_found(format!(
                "{} commits below head of {}",
                trailing, self.spec
            )));
        }
        let mut older = chain.split_off(trailing);
        older.reverse();
        replay(reader, &self.spec, &older).await
    }

    /// Stored branch metadata
    pub fn branch_info(&self) -> BranchMetadata {
        self.metadata.clone()
    }

    /// Descriptor of this branch
    pub fn descriptor(&self) -> BranchDescriptor {
        BranchDescriptor {
            ledger: self.spec.ledger().to_string(),
            branch: self.spec.branch().to_string(),
            head: self.head.id.clone(),
            t: self.head.t(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Replay `chain` (oldest first) from an empty snapshot
async fn replay(reader: &CommitReader, spec: &BranchSpec, chain: &[Commit]) -> VcsResult<Snapshot> {
    let mut snapshot = Snapshot::genesis(spec.ledger(), spec.branch());
    for commit in chain {
        let flakes = reader.read_commit_data(commit, snapshot.namespaces()).await?;
        snapshot = snapshot.advance(
            commit.t(),
            commit.id.clone(),
            &flakes.namespaces,
            &flakes.asserted,
            &flakes.retracted,
        );
    }
    Ok(snapshot)
}
