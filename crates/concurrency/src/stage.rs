//! Flake staging
//!
//! Applies a set of flakes onto a snapshot, producing a new, unpersisted
//! snapshot at the next transaction counter.
//!
//! A retraction flake handed to the stager is a pattern: it names a fact,
//! not necessarily the stored flake (its `t` differs, for one). Each
//! retraction is resolved against the novelty overlay and the indexed facts
//! through an unrestricted view, so a restricted read policy can never hide
//! a fact that must be removed.

use crate::snapshot::{Novelty, Snapshot, StageInfo};
use ledgervc_core::Flake;
use serde_json::Value as JsonValue;
use tracing::debug;

/// Staging annotations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOptions {
    /// Commit message
    pub message: Option<String>,
    /// Commit author
    pub author: Option<String>,
    /// Free-form annotation
    pub annotation: Option<JsonValue>,
}

impl StageOptions {
    /// Options carrying only a message
    pub fn with_message(message: impl Into<String>) -> Self {
        StageOptions {
            message: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Stage `flakes` onto `snapshot`.
///
/// Returns the input unchanged when `flakes` is empty. Otherwise every flake
/// is retimed to `snapshot.t() + 1`, retractions are resolved to the stored
/// facts they name, and the result carries the adds/removes as novelty.
pub fn stage(snapshot: &Snapshot, flakes: &[Flake], opts: &StageOptions) -> Snapshot {
    if flakes.is_empty() {
        return snapshot.clone();
    }

    let next_t = snapshot.t() + 1;
    let (adds, removes): (Vec<Flake>, Vec<Flake>) = flakes
        .iter()
        .map(|f| f.retimed(next_t))
        .partition(|f| f.op);

    let root = snapshot.as_root();
    let mut novelty: Novelty = snapshot.novelty().clone();
    let mut retracted = 0usize;

    for pattern in &removes {
        let spot = pattern.spot();
        let key = pattern.fact_key();
        let staged = novelty
            .adds
            .get_mut(&spot)
            .and_then(|values| values.remove(&key));
        if novelty.adds.get(&spot).map_or(false, |v| v.is_empty()) {
            novelty.adds.remove(&spot);
        }
        if staged.is_some() {
            retracted += 1;
        }
        if let Some(stored) = root.indexed_fact(pattern) {
            let masks = novelty.removes.entry(spot).or_default();
            if masks.insert(key, stored).is_none() {
                retracted += 1;
            }
        }
    }

    let mut asserted = 0usize;
    for flake in adds {
        let spot = flake.spot();
        let key = flake.fact_key();
        let unmasked = novelty
            .removes
            .get_mut(&spot)
            .map_or(false, |values| values.remove(&key).is_some());
        if novelty.removes.get(&spot).map_or(false, |v| v.is_empty()) {
            novelty.removes.remove(&spot);
        }
        if unmasked {
            asserted += 1;
            continue;
        }
        let already_staged = novelty
            .adds
            .get(&spot)
            .map_or(false, |values| values.contains_key(&key));
        if already_staged || root.indexed_fact(&flake).is_some() {
            continue;
        }
        novelty.adds.entry(spot).or_default().insert(key, flake);
        asserted += 1;
    }

    debug!(
        target: "ledgervc::stage",
        alias = snapshot.alias(),
        branch = snapshot.branch(),
        t = next_t,
        asserted,
        retracted,
        "Staged flakes"
    );

    snapshot.with_staged(
        next_t,
        novelty,
        StageInfo {
            message: opts.message.clone(),
            author: opts.author.clone(),
            annotation: opts.annotation.clone(),
            asserted,
            retracted,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ViewPolicy;
    use ledgervc_core::{datatype, CommitId, FlakeValue, NamespaceCodes, Sid};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn flake(p: &str, o: &str, t: i64, op: bool) -> Flake {
        Flake::new(
            Sid::new(100, "s1"),
            Sid::new(100, p),
            FlakeValue::from(o),
            datatype::string(),
            t,
            op,
        )
    }

    fn base() -> Snapshot {
        Snapshot::genesis("L", "main").advance(
            3,
            CommitId::new("c3"),
            &NamespaceCodes::empty(),
            &[flake("p1", "Z", 3, true)],
            &[],
        )
    }

    #[test]
    fn test_empty_is_noop() {
        let snap = base();
        let staged = stage(&snap, &[], &StageOptions::default());
        assert_eq!(staged.t(), 3);
        assert!(staged.staged().is_none());
        assert!(staged.novelty().is_empty());
    }

    #[test]
    fn test_stage_retimes_to_next_t() {
        let snap = base();
        let staged = stage(
            &snap,
            &[flake("p2", "A", 99, true)],
            &StageOptions::with_message("add A"),
        );
        assert_eq!(staged.t(), 4);
        let added = staged.novelty().added_flakes();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].t, 4);
        let info = staged.staged().unwrap();
        assert_eq!(info.message.as_deref(), Some("add A"));
        assert_eq!(info.asserted, 1);
        // input untouched
        assert_eq!(snap.t(), 3);
        assert!(snap.novelty().is_empty());
    }

    #[test]
    fn test_retraction_pattern_resolves_indexed_fact() {
        let snap = base();
        // pattern carries a different t than the stored flake
        let staged = stage(
            &snap,
            &[flake("p1", "Z", 0, false), flake("p1", "Y", 0, true)],
            &StageOptions::default(),
        );
        let removed = staged.novelty().removed_flakes();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].t, 3, "removes the literal stored flake");
        assert!(!removed[0].op);

        let values = staged.values_at(&flake("p1", "Y", 0, true).spot());
        assert_eq!(values.len(), 1);
        assert!(values.contains(&flake("p1", "Y", 0, true).fact_key()));
    }

    #[test]
    fn test_retraction_of_staged_fact_drops_it_from_novelty() {
        let snap = base();
        let once = stage(&snap, &[flake("p2", "A", 0, true)], &StageOptions::default());
        let twice = stage(&once, &[flake("p2", "A", 0, false)], &StageOptions::default());
        assert!(twice.novelty().adds.is_empty());
        assert!(twice.novelty().removes.is_empty());
        assert_eq!(twice.t(), 5);
    }

    #[test]
    fn test_restricted_view_does_not_hide_retraction_target() {
        let hidden: BTreeSet<Sid> = [Sid::new(100, "p1")].into_iter().collect();
        let snap = base().with_view(ViewPolicy::HidePredicates(Arc::new(hidden)));
        let staged = stage(&snap, &[flake("p1", "Z", 0, false)], &StageOptions::default());
        assert_eq!(staged.novelty().removed_flakes().len(), 1);
        assert!(staged.as_root().values_at(&flake("p1", "Z", 0, true).spot()).is_empty());
    }

    #[test]
    fn test_asserting_existing_fact_is_not_duplicated() {
        let snap = base();
        let staged = stage(&snap, &[flake("p1", "Z", 0, true)], &StageOptions::default());
        assert!(staged.novelty().adds.is_empty());
        assert_eq!(staged.staged().unwrap().asserted, 0);
    }
}
