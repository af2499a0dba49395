//! Net-Change Computer
//!
//! Reduces an ordered run of commits to one set of fact-level changes
//! relative to a target snapshot.
//!
//! Values are tracked per [`Spot`] as sets, so multi-valued properties keep
//! every value asserted at that spot. Within a commit, retractions are
//! applied before assertions. Each spot is seeded with the target's live
//! values the first time a commit touches it; the final sets are then diffed
//! against the target to produce retraction and assertion flakes.
//!
//! The footprint is the set of spots those flakes touch. A spot written and
//! then restored within the run has no net change and is not in it.

use crate::reader::CommitReader;
use ledgervc_concurrency::{spots_of, Snapshot};
use ledgervc_core::{Commit, FactValue, Flake, Spot, VcsResult};
use std::collections::{BTreeMap, BTreeSet};

/// Result of [`compute_net_changes`]
#[derive(Debug, Clone)]
pub struct NetChanges {
    /// Retractions followed by assertions, ordered by spot
    pub flakes: Vec<Flake>,
    /// Spots whose live values differ from the target's
    pub footprint: BTreeSet<Spot>,
    /// Target snapshot with the commits' namespace codes merged in
    pub snapshot: Snapshot,
}

impl NetChanges {
    /// Whether there is nothing to apply
    pub fn is_empty(&self) -> bool {
        self.flakes.is_empty()
    }
}

/// Net changes of `commits` (oldest first) against `target`.
///
/// An empty commit list yields no flakes and an unchanged snapshot.
pub async fn compute_net_changes(
    reader: &CommitReader,
    commits: &[Commit],
    target: &Snapshot,
) -> VcsResult<NetChanges> {
    if commits.is_empty() {
        return Ok(NetChanges {
            flakes: Vec::new(),
            footprint: BTreeSet::new(),
            snapshot: target.clone(),
        });
    }

    let root = target.as_root();
    let mut snapshot = target.clone();
    let mut live: BTreeMap<Spot, BTreeSet<FactValue>> = BTreeMap::new();

    for commit in commits {
        let data = reader.read_commit_data(commit, snapshot.namespaces()).await?;
        snapshot = snapshot.merge_namespaces(&data.namespaces);

        for flake in &data.retracted {
            let spot = flake.spot();
            live.entry(spot.clone())
                .or_insert_with(|| root.values_at(&spot))
                .remove(&flake.fact_key());
        }
        for flake in &data.asserted {
            let spot = flake.spot();
            live.entry(spot.clone())
                .or_insert_with(|| root.values_at(&spot))
                .insert(flake.fact_key());
        }
    }

    let t = target.t();
    let mut retractions = Vec::new();
    let mut assertions = Vec::new();
    for (spot, values) in &live {
        let existing = root.values_at(spot);
        retractions.extend(
            existing
                .difference(values)
                .map(|value| value.to_flake(spot, t, false)),
        );
        assertions.extend(
            values
                .difference(&existing)
                .map(|value| value.to_flake(spot, t, true)),
        );
    }
    retractions.extend(assertions);

    Ok(NetChanges {
        footprint: spots_of(&retractions),
        flakes: retractions,
        snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgervc_core::{datatype, CommitId, FlakeValue, NamespaceCodes, Sid};
    use ledgervc_storage::MemoryStore;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::Arc;

    fn flake(p: &str, o: &str, op: bool) -> Flake {
        Flake::new(
            Sid::new(100, "s1"),
            Sid::new(100, p),
            FlakeValue::from(o),
            datatype::string(),
            1,
            op,
        )
    }

    fn ns() -> NamespaceCodes {
        let mut codes = NamespaceCodes::empty();
        codes.insert(100, "http://example.org/");
        codes
    }

    /// Target snapshot at t = 1 holding `p1 = Z`
    fn target() -> Snapshot {
        Snapshot::genesis("L", "main").advance(
            1,
            CommitId::new("c1"),
            &ns(),
            &[flake("p1", "Z", true)],
            &[],
        )
    }

    /// Store commits `n = 2..` with the given (asserted, retracted) flakes
    async fn commits(store: &Arc<MemoryStore>, txs: &[(Vec<Flake>, Vec<Flake>)]) -> Vec<Commit> {
        let reader = CommitReader::new(store.clone(), ".json");
        let mut out = Vec::new();
        for (i, (assert, retract)) in txs.iter().enumerate() {
            let t = i as i64 + 2;
            store.insert_raw(
                format!("mem://d{}", t),
                json!({"t": t, "assert": assert, "retract": retract}),
            );
            store.insert_raw(
                format!("mem://c{}", t),
                json!({
                    "id": format!("c{}", t),
                    "alias": "L",
                    "branch": "feature",
                    "data": {"address": format!("mem://d{}", t), "t": t},
                    "previous": {"id": format!("c{}", t - 1), "address": format!("mem://c{}", t - 1)}
                }),
            );
            out.push(reader.read_commit(&format!("mem://c{}", t)).await.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_empty_commit_list_is_identity() {
        let store = Arc::new(MemoryStore::new());
        let reader = CommitReader::new(store.clone(), ".json");
        let snap = target();
        let net = compute_net_changes(&reader, &[], &snap).await.unwrap();
        assert!(net.is_empty());
        assert!(net.footprint.is_empty());
        assert_eq!(net.snapshot.t(), snap.t());
        assert_eq!(net.snapshot.flakes(), snap.flakes());
        assert_eq!(store.read_count(), 0);
    }

    #[tokio::test]
    async fn test_single_assertion() {
        let store = Arc::new(MemoryStore::new());
        let reader = CommitReader::new(store.clone(), ".json");
        let log = commits(&store, &[(vec![flake("p2", "A", true)], vec![])]).await;
        let net = compute_net_changes(&reader, &log, &target()).await.unwrap();
        assert_eq!(net.flakes.len(), 1);
        assert!(net.flakes[0].op);
        assert_eq!(net.flakes[0].o, FlakeValue::from("A"));
    }

    #[tokio::test]
    async fn test_replacement_emits_retract_and_assert() {
        let store = Arc::new(MemoryStore::new());
        let reader = CommitReader::new(store.clone(), ".json");
        let log = commits(
            &store,
            &[(vec![flake("p1", "Y", true)], vec![flake("p1", "Z", false)])],
        )
        .await;
        let net = compute_net_changes(&reader, &log, &target()).await.unwrap();
        assert_eq!(net.flakes.len(), 2);
        assert!(!net.flakes[0].op, "retractions come first");
        assert_eq!(net.flakes[0].o, FlakeValue::from("Z"));
        assert!(net.flakes[1].op);
        assert_eq!(net.flakes[1].o, FlakeValue::from("Y"));
    }

    #[tokio::test]
    async fn test_multi_valued_adds_coexist() {
        let store = Arc::new(MemoryStore::new());
        let reader = CommitReader::new(store.clone(), ".json");
        let log = commits(
            &store,
            &[
                (vec![flake("p1", "A", true)], vec![]),
                (vec![flake("p1", "B", true)], vec![]),
            ],
        )
        .await;
        let net = compute_net_changes(&reader, &log, &target()).await.unwrap();
        // Z stays; A and B are added
        assert_eq!(net.flakes.len(), 2);
        assert!(net.flakes.iter().all(|f| f.op));
        assert_eq!(net.footprint.len(), 1);
    }

    #[tokio::test]
    async fn test_add_then_remove_cancels_out() {
        let store = Arc::new(MemoryStore::new());
        let reader = CommitReader::new(store.clone(), ".json");
        let log = commits(
            &store,
            &[
                (vec![flake("p2", "A", true)], vec![]),
                (vec![], vec![flake("p2", "A", false)]),
            ],
        )
        .await;
        let net = compute_net_changes(&reader, &log, &target()).await.unwrap();
        assert!(net.is_empty());
        assert!(net.footprint.is_empty());
    }

    #[tokio::test]
    async fn test_namespaces_merged_into_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let reader = CommitReader::new(store.clone(), ".json");
        let log = commits(&store, &[(vec![flake("p2", "A", true)], vec![])]).await;
        store.insert_raw(
            "mem://d2",
            json!({
                "t": 2,
                "assert": [Flake::new(
                    Sid::new(101, "s9"),
                    Sid::new(100, "p2"),
                    FlakeValue::from("A"),
                    datatype::string(),
                    2,
                    true,
                )],
                "namespaces": {"101": "http://other.example/"}
            }),
        );
        let net = compute_net_changes(&reader, &log, &target()).await.unwrap();
        assert_eq!(net.snapshot.namespaces().get(101), Some("http://other.example/"));
        assert!(target().namespaces().get(101).is_none());
    }

    #[tokio::test]
    async fn test_footprint_covers_net_changes_only() {
        let store = Arc::new(MemoryStore::new());
        let reader = CommitReader::new(store.clone(), ".json");
        let log = commits(
            &store,
            &[
                (vec![flake("p2", "A", true)], vec![flake("p1", "Z", false)]),
                (vec![flake("p1", "Z", true), flake("p3", "B", true)], vec![]),
                (vec![], vec![flake("p3", "B", false)]),
            ],
        )
        .await;
        let net = compute_net_changes(&reader, &log, &target()).await.unwrap();
        // p1 is restored and p3 cancels out
        let expected: BTreeSet<Spot> = [flake("p2", "A", true).spot()].into_iter().collect();
        assert_eq!(net.footprint, expected);
        assert_eq!(net.footprint, spots_of(&net.flakes));
    }

    proptest! {
        #[test]
        fn prop_empty_input_is_identity(values in proptest::collection::vec("[a-z]{1,4}", 0..8)) {
            let asserted: Vec<Flake> = values.iter().map(|v| flake("p", v, true)).collect();
            let snap = Snapshot::genesis("L", "main")
                .advance(3, CommitId::new("c3"), &ns(), &asserted, &[]);
            let reader = CommitReader::new(Arc::new(MemoryStore::new()), ".json");
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let net = rt.block_on(compute_net_changes(&reader, &[], &snap)).unwrap();
            prop_assert!(net.flakes.is_empty());
            prop_assert_eq!(net.snapshot.t(), snap.t());
            prop_assert_eq!(net.snapshot.flakes(), snap.flakes());
        }
    }
}
