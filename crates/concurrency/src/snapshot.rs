//! Database snapshots
//!
//! A snapshot is the queryable state of a branch at a given `t`:
//! committed (indexed) facts plus an optional novelty overlay of staged but
//! uncommitted flakes. Snapshots are values: staging produces a new
//! snapshot and never mutates an existing one.
//!
//! # Structure
//!
//! Facts are grouped by [`Spot`], and within a spot keyed by [`FactValue`],
//! so at most one live flake exists per `(spot, value)`.
//!
//! Live facts at a spot = (indexed − novelty removes) ∪ novelty adds.
//!
//! # Views
//!
//! A snapshot may carry a [`ViewPolicy`] that hides predicates from reads.
//! [`Snapshot::as_root`] returns the same state with no filtering.

use ledgervc_core::{CommitId, FactValue, Flake, NamespaceCodes, Sid, Spot};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Spot → value → flake
pub type FactIndex = BTreeMap<Spot, BTreeMap<FactValue, Flake>>;

/// Read filter applied to a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ViewPolicy {
    /// Unrestricted
    #[default]
    Root,
    /// Flakes with any of these predicates are invisible
    HidePredicates(Arc<BTreeSet<Sid>>),
}

impl ViewPolicy {
    /// Whether `flake` is visible under this policy
    pub fn allows(&self, flake: &Flake) -> bool {
        match self {
            ViewPolicy::Root => true,
            ViewPolicy::HidePredicates(hidden) => !hidden.contains(&flake.p),
        }
    }

    fn allows_spot(&self, spot: &Spot) -> bool {
        match self {
            ViewPolicy::Root => true,
            ViewPolicy::HidePredicates(hidden) => !hidden.contains(&spot.p),
        }
    }
}

/// Staged-but-uncommitted changes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Novelty {
    /// Asserted flakes not yet committed
    pub adds: FactIndex,
    /// Indexed flakes retracted but not yet committed
    pub removes: FactIndex,
}

impl Novelty {
    /// Whether nothing is staged
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.removes.is_empty()
    }

    /// All staged assertions
    pub fn added_flakes(&self) -> Vec<Flake> {
        flatten(&self.adds)
    }

    /// All staged retractions, as retraction flakes
    pub fn removed_flakes(&self) -> Vec<Flake> {
        flatten(&self.removes)
            .into_iter()
            .map(|f| f.with_op(false))
            .collect()
    }
}

/// Annotation left by the stager on the snapshot it produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageInfo {
    /// Commit message
    pub message: Option<String>,
    /// Commit author
    pub author: Option<String>,
    /// Free-form annotation
    pub annotation: Option<JsonValue>,
    /// Number of assertions staged
    pub asserted: usize,
    /// Number of retractions resolved
    pub retracted: usize,
}

/// Immutable view of a branch at `t`
#[derive(Debug, Clone)]
pub struct Snapshot {
    alias: String,
    branch: String,
    t: i64,
    commit: Option<CommitId>,
    namespaces: NamespaceCodes,
    indexed: Arc<FactIndex>,
    novelty: Arc<Novelty>,
    view: ViewPolicy,
    staged: Option<StageInfo>,
}

impl Snapshot {
    /// Empty snapshot at `t = 0`
    pub fn genesis(alias: impl Into<String>, branch: impl Into<String>) -> Self {
        Snapshot {
            alias: alias.into(),
            branch: branch.into(),
            t: 0,
            commit: None,
            namespaces: NamespaceCodes::new(),
            indexed: Arc::new(FactIndex::new()),
            novelty: Arc::new(Novelty::default()),
            view: ViewPolicy::Root,
            staged: None,
        }
    }

    /// Ledger alias
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Branch name
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Transaction counter
    pub fn t(&self) -> i64 {
        self.t
    }

    /// Commit this snapshot was loaded from, if any
    pub fn commit(&self) -> Option<&CommitId> {
        self.commit.as_ref()
    }

    /// Namespace code table
    pub fn namespaces(&self) -> &NamespaceCodes {
        &self.namespaces
    }

    /// Staged overlay
    pub fn novelty(&self) -> &Novelty {
        &self.novelty
    }

    /// Staging annotation, if this snapshot came from the stager
    pub fn staged(&self) -> Option<&StageInfo> {
        self.staged.as_ref()
    }

    /// Active read policy
    pub fn view(&self) -> &ViewPolicy {
        &self.view
    }

    /// Same state, unrestricted
    pub fn as_root(&self) -> Snapshot {
        self.with_view(ViewPolicy::Root)
    }

    /// Same state under `view`
    pub fn with_view(&self, view: ViewPolicy) -> Snapshot {
        Snapshot {
            view,
            ..self.clone()
        }
    }

    /// Apply one committed transaction directly to the index.
    ///
    /// Used when materializing a branch from its commit chain.
    pub fn advance(
        &self,
        t: i64,
        commit: CommitId,
        namespaces: &NamespaceCodes,
        asserted: &[Flake],
        retracted: &[Flake],
    ) -> Snapshot {
        let mut indexed = (*self.indexed).clone();
        for flake in retracted {
            let spot = flake.spot();
            if let Some(values) = indexed.get_mut(&spot) {
                values.remove(&flake.fact_key());
                if values.is_empty() {
                    indexed.remove(&spot);
                }
            }
        }
        for flake in asserted {
            indexed
                .entry(flake.spot())
                .or_default()
                .insert(flake.fact_key(), flake.with_op(true));
        }
        let mut codes = self.namespaces.clone();
        codes.merge(namespaces);
        Snapshot {
            t,
            commit: Some(commit),
            namespaces: codes,
            indexed: Arc::new(indexed),
            staged: None,
            ..self.clone()
        }
    }

    /// Same snapshot with additional namespace codes
    pub fn merge_namespaces(&self, delta: &NamespaceCodes) -> Snapshot {
        let mut codes = self.namespaces.clone();
        if codes.merge(delta) == 0 {
            return self.clone();
        }
        Snapshot {
            namespaces: codes,
            ..self.clone()
        }
    }

    /// Live values at `spot`, subject to the view policy
    pub fn values_at(&self, spot: &Spot) -> BTreeSet<FactValue> {
        self.live_at(spot).into_iter().map(|f| f.fact_key()).collect()
    }

    /// Live flakes at `spot`, subject to the view policy
    pub fn live_at(&self, spot: &Spot) -> Vec<Flake> {
        if !self.view.allows_spot(spot) {
            return Vec::new();
        }
        let removed = self.novelty.removes.get(spot);
        let mut out: Vec<Flake> = self
            .indexed
            .get(spot)
            .into_iter()
            .flat_map(|values| values.iter())
            .filter(|(value, _)| removed.map_or(true, |r| !r.contains_key(*value)))
            .map(|(_, flake)| flake.clone())
            .collect();
        if let Some(added) = self.novelty.adds.get(spot) {
            out.extend(added.values().cloned());
        }
        out
    }

    /// Committed flake stating the same fact as `pattern`, ignoring novelty
    pub fn indexed_fact(&self, pattern: &Flake) -> Option<Flake> {
        if !self.view.allows(pattern) {
            return None;
        }
        self.indexed
            .get(&pattern.spot())
            .and_then(|values| values.get(&pattern.fact_key()))
            .cloned()
    }

    /// Every live flake, subject to the view policy
    pub fn flakes(&self) -> Vec<Flake> {
        let mut spots: BTreeSet<&Spot> = self.indexed.keys().collect();
        spots.extend(self.novelty.adds.keys());
        spots.into_iter().flat_map(|spot| self.live_at(spot)).collect()
    }

    /// Number of live facts, subject to the view policy
    pub fn len(&self) -> usize {
        self.flakes().len()
    }

    /// Whether no facts are live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn with_staged(&self, t: i64, novelty: Novelty, info: StageInfo) -> Snapshot {
        Snapshot {
            t,
            novelty: Arc::new(novelty),
            staged: Some(info),
            ..self.clone()
        }
    }
}

fn flatten(index: &FactIndex) -> Vec<Flake> {
    index
        .values()
        .flat_map(|values| values.values().cloned())
        .collect()
}
