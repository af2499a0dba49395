//! Shared helpers for engine integration tests.
//!
//! Builds in-memory ledgers over [`MemoryStore`] and [`MemoryNameservice`].

#![allow(dead_code)]

use ledgervc_concurrency::StageOptions;
use ledgervc_core::{datatype, BranchSpec, CommitId, Flake, FlakeValue, NamespaceCodes, Sid};
use ledgervc_engine::{CommitReceipt, VcsConfig, VersionControl};
use ledgervc_storage::{MemoryNameservice, MemoryStore};
use std::sync::Arc;

/// Namespace code used by every test flake
pub const EX: u16 = 100;

pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub ns: Arc<MemoryNameservice>,
    pub vc: VersionControl,
}

pub fn env() -> TestEnv {
    env_with(VcsConfig::default())
}

pub fn env_with(config: VcsConfig) -> TestEnv {
    let store = Arc::new(MemoryStore::new());
    let ns = Arc::new(MemoryNameservice::new());
    let vc = VersionControl::new(store.clone(), config).with_nameservice(ns.clone());
    TestEnv { store, ns, vc }
}

pub fn ex_namespaces() -> NamespaceCodes {
    let mut codes = NamespaceCodes::empty();
    codes.insert(EX, "http://example.org/");
    codes
}

pub fn flake(s: &str, p: &str, o: &str) -> Flake {
    Flake::new(
        Sid::new(EX, s),
        Sid::new(EX, p),
        FlakeValue::from(o),
        datatype::string(),
        0,
        true,
    )
}

pub fn retraction(s: &str, p: &str, o: &str) -> Flake {
    flake(s, p, o).with_op(false)
}

pub fn spec(s: &str) -> BranchSpec {
    BranchSpec::parse(s).unwrap()
}

/// Commit `flakes` onto `branch`, expecting a new commit
pub async fn commit(env: &TestEnv, branch: &str, flakes: &[Flake]) -> CommitReceipt {
    env.vc
        .commit_flakes(branch, flakes, &ex_namespaces(), &StageOptions::default())
        .await
        .unwrap()
        .expect("commit should change state")
}

/// Ledger `alias` whose main branch has `commits` commits on top of genesis
pub async fn ledger_with_commits(env: &TestEnv, alias: &str, commits: usize) {
    env.vc.create_ledger(alias).await.unwrap();
    let main = format!("{}:main", alias);
    for n in 0..commits {
        commit(
            env,
            &main,
            &[flake("seed", &format!("p{}", n), &format!("v{}", n))],
        )
        .await;
    }
}

/// Current head id and `t` of `branch`
pub async fn head(env: &TestEnv, branch: &str) -> (CommitId, i64) {
    let descriptor = env.vc.describe_branch(branch).await.unwrap();
    (descriptor.head, descriptor.t)
}

/// Whether `fact` is currently asserted on `branch`
pub async fn has_fact(env: &TestEnv, branch: &str, fact: &Flake) -> bool {
    let ledger = env.vc.load_ledger(&spec(branch)).await.unwrap();
    ledger
        .current_snapshot()
        .values_at(&fact.spot())
        .contains(&fact.fact_key())
}
