//! Ancestry Tests
//!
//! Tests common-ancestor resolution between branches:
//! - Metadata shortcuts (same head, created-from, shared creation point)
//! - Chain walk and the `t` fallback
//! - Symmetry and the fast-forward rule over generated branch histories

mod common;

use common::*;
use ledgervc_core::{BranchMetadata, CommitId};
use ledgervc_engine::{
    can_fast_forward, collect_chain, find_common_ancestor, AncestorMethod, CommitReader,
    CreateBranchOptions, Ledger,
};
use ledgervc_storage::{MemoryStore, NsRecord};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

async fn ledgers(env: &TestEnv, a: &str, b: &str) -> (Arc<Ledger>, Arc<Ledger>) {
    (
        env.vc.load_ledger(&spec(a)).await.unwrap(),
        env.vc.load_ledger(&spec(b)).await.unwrap(),
    )
}

async fn branch(env: &TestEnv, name: &str, from: &str) {
    env.vc
        .create_branch(name, from, &CreateBranchOptions::default())
        .await
        .unwrap();
}

// ========================================
// Shortcuts
// ========================================

#[tokio::test]
async fn test_same_head() {
    let env = env();
    ledger_with_commits(&env, "L", 2).await;
    branch(&env, "L:feature", "L:main").await;
    let (main, feature) = ledgers(&env, "L:main", "L:feature").await;

    let lca = find_common_ancestor(env.vc.reader(), &feature, &main)
        .await
        .unwrap();
    assert_eq!(lca.method, AncestorMethod::SameHead);
    assert_eq!(lca.id, main.head().id);
    assert_eq!(lca.t, Some(2));
}

#[tokio::test]
async fn test_created_from_shortcut_both_directions() {
    let env = env();
    ledger_with_commits(&env, "L", 2).await;
    branch(&env, "L:feature", "L:main").await;
    commit(&env, "L:feature", &[flake("s1", "p1", "A")]).await;
    let (main, feature) = ledgers(&env, "L:main", "L:feature").await;
    let reads_before = env.store.read_count();

    let forward = find_common_ancestor(env.vc.reader(), &feature, &main)
        .await
        .unwrap();
    assert_eq!(forward.method, AncestorMethod::SourceCreatedFromTarget);
    assert_eq!(forward.id, main.head().id);

    let backward = find_common_ancestor(env.vc.reader(), &main, &feature)
        .await
        .unwrap();
    assert_eq!(backward.method, AncestorMethod::TargetCreatedFromSource);
    assert_eq!(backward.id, main.head().id);
    assert_eq!(env.store.read_count(), reads_before, "shortcuts need no reads");

    assert!(can_fast_forward(env.vc.reader(), &feature, &main).await.unwrap());
    assert!(!can_fast_forward(env.vc.reader(), &main, &feature).await.unwrap());
}

#[tokio::test]
async fn test_shared_creation_point() {
    let env = env();
    ledger_with_commits(&env, "L", 2).await;
    let (creation, _) = head(&env, "L:main").await;
    branch(&env, "L:a", "L:main").await;
    branch(&env, "L:b", "L:main").await;
    commit(&env, "L:a", &[flake("s1", "p1", "A")]).await;
    commit(&env, "L:b", &[flake("s2", "p1", "B")]).await;
    let (a, b) = ledgers(&env, "L:a", "L:b").await;

    let lca = find_common_ancestor(env.vc.reader(), &a, &b).await.unwrap();
    assert_eq!(lca.method, AncestorMethod::SharedCreationPoint);
    assert_eq!(lca.id, creation);
    assert_eq!(lca.t, None);
}

// ========================================
// Chain walk
// ========================================

#[tokio::test]
async fn test_chain_walk_finds_lowest_shared_commit() {
    let env = env();
    ledger_with_commits(&env, "L", 2).await;
    let (c2, _) = head(&env, "L:main").await;
    branch(&env, "L:early", "L:main").await;
    commit(&env, "L:main", &[flake("s0", "p0", "M")]).await;
    branch(&env, "L:late", "L:main").await;
    commit(&env, "L:early", &[flake("s1", "p1", "E")]).await;
    commit(&env, "L:late", &[flake("s2", "p1", "L")]).await;
    let (early, late) = ledgers(&env, "L:early", "L:late").await;

    let lca = find_common_ancestor(env.vc.reader(), &early, &late)
        .await
        .unwrap();
    assert_eq!(lca.method, AncestorMethod::ChainWalk);
    assert_eq!(lca.id, c2);
    assert_eq!(lca.t, Some(2));

    let reverse = find_common_ancestor(env.vc.reader(), &late, &early)
        .await
        .unwrap();
    assert_eq!(reverse.id, c2);
}

fn raw_commit(id: &str, t: i64, previous: Option<&str>) -> serde_json::Value {
    let mut doc = json!({
        "id": id,
        "address": format!("mem://{}", id),
        "alias": "L",
        "branch": "main",
        "data": {"t": t},
    });
    if let Some(prev) = previous {
        doc["previous"] = json!({"id": prev, "address": format!("mem://{}", prev)});
    }
    doc
}

#[tokio::test]
async fn test_t_fallback_when_ids_never_match() {
    let store = Arc::new(MemoryStore::new());
    for doc in [
        raw_commit("a0", 0, None),
        raw_commit("a1", 1, Some("a0")),
        raw_commit("b0", 0, None),
    ] {
        let address = doc["address"].as_str().unwrap().to_string();
        store.insert_raw(address, doc);
    }
    let reader = CommitReader::new(store, ".json");
    let record = |id: &str, t: i64| NsRecord {
        ledger: "L".to_string(),
        branch: id.to_string(),
        address: format!("mem://{}", id),
        commit_id: CommitId::new(id),
        t,
        metadata: BranchMetadata::default(),
    };
    let source = Ledger::load(&reader, &record("a1", 1)).await.unwrap();
    let target = Ledger::load(&reader, &record("b0", 0)).await.unwrap();

    let lca = find_common_ancestor(&reader, &source, &target).await.unwrap();
    assert_eq!(lca.method, AncestorMethod::TFallback);
    assert_eq!(lca.id, CommitId::new("b0"));
    assert_eq!(lca.t, Some(0));
}

// ========================================
// Generated histories
// ========================================

/// Branch creations and commits applied in order
#[derive(Debug, Clone)]
enum Step {
    Commit(usize),
    Branch(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (0usize..4).prop_map(Step::Commit),
        1 => (0usize..4).prop_map(Step::Branch),
    ]
}

struct PairCheck {
    forward: CommitId,
    backward: CommitId,
    ff: bool,
    target_head: CommitId,
    source_head: CommitId,
    target_created_from: Option<CommitId>,
    in_source_chain: bool,
    in_target_chain: bool,
}

async fn run_history(steps: Vec<Step>) -> Vec<PairCheck> {
    let env = env();
    ledger_with_commits(&env, "L", 1).await;
    let mut branches = vec!["L:main".to_string()];

    for (n, step) in steps.into_iter().enumerate() {
        match step {
            Step::Commit(i) => {
                let name = branches[i % branches.len()].clone();
                commit(&env, &name, &[flake(&format!("s{}", n), "p", "v")]).await;
            }
            Step::Branch(i) if branches.len() < 4 => {
                let from = branches[i % branches.len()].clone();
                let name = format!("L:b{}", n);
                branch(&env, &name, &from).await;
                branches.push(name);
            }
            Step::Branch(_) => {}
        }
    }

    let reader = env.vc.reader();
    let mut checks = Vec::new();
    for a in &branches {
        for b in &branches {
            if a == b {
                continue;
            }
            let (source, target) = ledgers(&env, a, b).await;
            let forward = find_common_ancestor(reader, &source, &target).await.unwrap();
            let backward = find_common_ancestor(reader, &target, &source).await.unwrap();
            let ff = can_fast_forward(reader, &source, &target).await.unwrap();
            let source_chain = collect_chain(reader, source.head().clone()).await.unwrap();
            let target_chain = collect_chain(reader, target.head().clone()).await.unwrap();
            checks.push(PairCheck {
                in_source_chain: source_chain.iter().any(|c| c.id == forward.id),
                in_target_chain: target_chain.iter().any(|c| c.id == forward.id),
                forward: forward.id,
                backward: backward.id,
                ff,
                target_head: target.head().id.clone(),
                source_head: source.head().id.clone(),
                target_created_from: target.branch_info().source_commit,
            });
        }
    }
    checks
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_common_ancestor_laws(steps in prop::collection::vec(step(), 0..10)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let checks = runtime.block_on(run_history(steps));

        for check in checks {
            prop_assert_eq!(&check.forward, &check.backward);
            prop_assert_eq!(check.ff, check.forward == check.target_head);
            prop_assert!(check.in_source_chain);
            prop_assert!(check.in_target_chain);
            if check.target_created_from.as_ref() == Some(&check.source_head) {
                prop_assert_eq!(&check.forward, &check.source_head);
            }
        }
    }
}
