//! Branch operations: create, list, inspect, delete, rename
//!
//! Branch pointers live in the nameservice. Creating or moving a branch
//! publishes a commit document tagged with the branch's alias/branch and its
//! metadata fields; deleting retracts the record.
//!
//! ## Operations
//!
//! - `create_ledger`: Write a genesis commit and publish the default branch
//! - `create_branch`: Point a new branch at an existing commit
//! - `list_branches`: Names of every branch of a ledger
//! - `branch_info`: Stored metadata of a branch
//! - `delete_branch`: Retract a branch record
//! - `rename_branch`: Publish under a new name, then retract the old record
//! - `set_branch_protection`: Toggle the `protected` flag
//! - `commit_flakes`: Stage and commit flakes directly onto a branch
//!
//! Rename is not atomic: a failure between publish and retract leaves both
//! records in place.

use crate::ledger::Ledger;
use crate::transact::{genesis_commit, persist_commit, CommitOptions, CommitReceipt};
use crate::vcs::VersionControl;
use crate::walker::walk;
use futures::TryStreamExt;
use ledgervc_concurrency::{stage, StageOptions};
use ledgervc_core::{
    BranchDescriptor, BranchMetadata, Commit, Flake, FlakeValue, NamespaceCodes, VcsError,
    VcsResult,
};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Options
// =============================================================================

/// Options for [`VersionControl::create_branch`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateBranchOptions {
    /// Branch from this commit (id or sha prefix) instead of the source head
    pub from_commit: Option<String>,
    /// Description stored in the branch metadata
    pub description: Option<String>,
    /// Create the branch protected
    pub protected: bool,
}

// =============================================================================
// Lifecycle
// =============================================================================

impl VersionControl {
    /// Create a ledger with an empty default branch.
    ///
    /// # Errors
    ///
    /// - `NoNameservice` if no nameservice is configured
    /// - `InvalidBranchOperation` if the ledger already has any branch
    pub async fn create_ledger(&self, alias: &str) -> VcsResult<BranchDescriptor> {
        let spec = self.parse_spec(alias)?;
        let spec = spec.with_branch(self.config().default_branch.clone());
        let existing = self.list_branches(spec.ledger()).await?;
        if !existing.is_empty() {
            return Err(VcsError::invalid_branch_operation(format!(
                "ledger '{}' already exists",
                spec.ledger()
            )));
        }

        let metadata = BranchMetadata {
            created_at: Some(chrono::Utc::now()),
            ..Default::default()
        };
        let (genesis, doc) = persist_commit(
            self.store(),
            genesis_commit(spec.ledger(), spec.branch(), metadata.clone()),
        )
        .await?;
        self.publish(&doc).await?;

        info!(
            target: "ledgervc::branch",
            ledger = spec.ledger(),
            branch = spec.branch(),
            genesis = %genesis.id,
            "Ledger created"
        );

        Ok(BranchDescriptor {
            ledger: spec.ledger().to_string(),
            branch: spec.branch().to_string(),
            head: genesis.id,
            t: 0,
            metadata,
        })
    }

    /// Create `new_branch` from `from_branch`.
    ///
    /// The new branch points at `opts.from_commit` when given, otherwise at
    /// the source head.
    ///
    /// # Errors
    ///
    /// - `InvalidBranchOperation` across ledgers or if `new_branch` exists
    /// - `NoNameservice` if no nameservice is configured
    /// - `NotFound` if the source branch or `from_commit` does not resolve
    pub async fn create_branch(
        &self,
        new_branch: &str,
        from_branch: &str,
        opts: &CreateBranchOptions,
    ) -> VcsResult<BranchDescriptor> {
        let new_spec = self.parse_spec(new_branch)?;
        let from_spec = self.parse_spec(from_branch)?;
        self.require_same_ledger(&new_spec, &from_spec)?;
        if self.branch_exists(&new_spec).await? {
            return Err(VcsError::invalid_branch_operation(format!(
                "branch '{}' already exists",
                new_spec
            )));
        }

        let source = self.load_ledger(&from_spec).await?;
        let commit = match &opts.from_commit {
            Some(wanted) => self.find_commit(&source, wanted).await?,
            None => source.head().clone(),
        };

        let mut metadata = BranchMetadata::created_from(from_spec.branch(), commit.id.clone());
        metadata.description = opts.description.clone();
        metadata.protected = opts.protected;

        let tagged = commit.retagged(new_spec.ledger(), new_spec.branch(), metadata.clone());
        self.publish(&tagged.to_document()?).await?;

        info!(
            target: "ledgervc::branch",
            source = %from_spec,
            destination = %new_spec,
            commit = %commit.id,
            t = commit.t(),
            "Branch created"
        );

        Ok(BranchDescriptor {
            ledger: new_spec.ledger().to_string(),
            branch: new_spec.branch().to_string(),
            head: commit.id,
            t: tagged.t(),
            metadata,
        })
    }

    /// Names of every branch of `ledger`, sorted.
    ///
    /// # Errors
    ///
    /// Returns `NoNameservice` if no nameservice is configured.
    pub async fn list_branches(&self, ledger: &str) -> VcsResult<Vec<String>> {
        let nameservice = self.nameservice()?;
        let ledger = self.parse_spec(ledger)?;
        let mut names: Vec<String> = nameservice
            .all_records()
            .await?
            .into_iter()
            .filter(|record| record.ledger == ledger.ledger())
            .map(|record| record.branch)
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Stored metadata of `branch`
    pub async fn branch_info(&self, branch: &str) -> VcsResult<BranchMetadata> {
        let spec = self.parse_spec(branch)?;
        Ok(self.load_ledger(&spec).await?.branch_info())
    }

    /// Descriptor (head, `t`, metadata) of `branch`
    pub async fn describe_branch(&self, branch: &str) -> VcsResult<BranchDescriptor> {
        let spec = self.parse_spec(branch)?;
        Ok(self.load_ledger(&spec).await?.descriptor())
    }

    /// Delete `branch`.
    ///
    /// # Errors
    ///
    /// - `CannotDeleteMainBranch` for the default branch
    /// - `NoNameservice` if no nameservice is configured
    /// - `CannotDeleteProtectedBranch` if the branch is protected
    pub async fn delete_branch(&self, branch: &str) -> VcsResult<()> {
        let spec = self.parse_spec(branch)?;
        if spec.is_default(&self.config().default_branch) {
            return Err(VcsError::CannotDeleteMainBranch {
                branch: spec.to_string(),
            });
        }
        let nameservice = self.nameservice()?;
        let ledger = self.load_ledger(&spec).await?;
        if ledger.branch_info().is_protected() {
            return Err(VcsError::CannotDeleteProtectedBranch {
                branch: spec.to_string(),
            });
        }

        nameservice.retract(&spec).await?;
        self.cache().release_ledger(&spec);

        info!(target: "ledgervc::branch", branch = %spec, "Branch deleted");
        Ok(())
    }

    /// Rename `old_branch` to `new_branch`.
    ///
    /// # Errors
    ///
    /// - `InvalidBranchOperation` across ledgers or if `new_branch` exists
    /// - `CannotRenameMainBranch` for the default branch
    /// - `NoNameservice` if no nameservice is configured
    /// - `CannotRenameProtectedBranch` if the branch is protected
    pub async fn rename_branch(
        &self,
        old_branch: &str,
        new_branch: &str,
    ) -> VcsResult<BranchDescriptor> {
        let old_spec = self.parse_spec(old_branch)?;
        let new_spec = self.parse_spec(new_branch)?;
        self.require_same_ledger(&old_spec, &new_spec)?;
        if old_spec.is_default(&self.config().default_branch) {
            return Err(VcsError::CannotRenameMainBranch {
                branch: old_spec.to_string(),
            });
        }
        let nameservice = self.nameservice()?;
        let ledger = self.load_ledger(&old_spec).await?;
        if ledger.branch_info().is_protected() {
            return Err(VcsError::CannotRenameProtectedBranch {
                branch: old_spec.to_string(),
            });
        }
        if self.branch_exists(&new_spec).await? {
            return Err(VcsError::invalid_branch_operation(format!(
                "branch '{}' already exists",
                new_spec
            )));
        }

        let metadata = ledger.branch_info();
        let moved = ledger
            .head()
            .retagged(new_spec.ledger(), new_spec.branch(), metadata.clone());
        self.publish(&moved.to_document()?).await?;
        nameservice.retract(&old_spec).await?;
        self.cache().release_ledger(&old_spec);

        info!(
            target: "ledgervc::branch",
            source = %old_spec,
            destination = %new_spec,
            "Branch renamed"
        );

        Ok(BranchDescriptor {
            ledger: new_spec.ledger().to_string(),
            branch: new_spec.branch().to_string(),
            head: moved.id.clone(),
            t: moved.t(),
            metadata,
        })
    }

    /// Set or clear the `protected` flag of `branch`
    pub async fn set_branch_protection(
        &self,
        branch: &str,
        protected: bool,
    ) -> VcsResult<BranchDescriptor> {
        let spec = self.parse_spec(branch)?;
        let ledger = self.load_ledger(&spec).await?;
        let mut metadata = ledger.branch_info();
        metadata.protected = protected;

        let head = ledger
            .head()
            .retagged(spec.ledger(), spec.branch(), metadata.clone());
        self.publish(&head.to_document()?).await?;
        self.cache().release_ledger(&spec);

        info!(
            target: "ledgervc::branch",
            branch = %spec,
            protected,
            "Branch protection updated"
        );

        Ok(BranchDescriptor {
            ledger: spec.ledger().to_string(),
            branch: spec.branch().to_string(),
            head: head.id.clone(),
            t: head.t(),
            metadata,
        })
    }

    /// Stage `flakes` onto the head of `branch` and commit them.
    ///
    /// `namespaces` declares codes the flakes use that the branch does not
    /// know yet. Returns `None` when staging changes nothing.
    pub async fn commit_flakes(
        &self,
        branch: &str,
        flakes: &[Flake],
        namespaces: &NamespaceCodes,
        opts: &StageOptions,
    ) -> VcsResult<Option<CommitReceipt>> {
        let spec = self.parse_spec(branch)?;
        let ledger = self.load_ledger(&spec).await?;
        let snapshot = ledger.current_snapshot().merge_namespaces(namespaces);
        for flake in flakes {
            check_known_codes(flake, snapshot.namespaces())?;
        }

        let staged = stage(&snapshot, flakes, opts);
        if staged.t() == snapshot.t() {
            return Ok(None);
        }
        let receipt = self
            .transactor()?
            .commit(&ledger, &staged, &CommitOptions::default())
            .await?;
        self.cache().release_ledger(&spec);
        Ok(Some(receipt))
    }

    async fn find_commit(&self, ledger: &Ledger, wanted: &str) -> VcsResult<Commit> {
        let id = self.reader().normalize_id(wanted);
        let mut chain = Box::pin(walk(self.reader(), ledger.head().clone()));
        while let Some(commit) = chain.try_next().await? {
            if commit.id == id || commit.id.matches_sha_prefix(wanted) {
                return Ok(commit);
            }
        }
        Err(VcsError::not_found(format!(
            "commit '{}' on '{}'",
            wanted,
            ledger.spec()
        )))
    }
}

fn check_known_codes(flake: &Flake, codes: &NamespaceCodes) -> VcsResult<()> {
    let object = match &flake.o {
        FlakeValue::Ref(sid) => Some(sid),
        _ => None,
    };
    let unknown = [&flake.s, &flake.p, &flake.dt]
        .into_iter()
        .chain(object)
        .find(|sid| !codes.contains(sid.ns_code));
    match unknown {
        Some(sid) => Err(VcsError::invalid_input(format!(
            "flake {} uses undeclared namespace code {}",
            flake, sid.ns_code
        ))),
        None => Ok(()),
    }
}
