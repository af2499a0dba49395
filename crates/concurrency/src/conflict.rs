//! Spot-level conflict detection for squash rebases.
//!
//! Two change sets conflict if their footprints share a [`Spot`]. The check
//! is conservative: identical writes on both sides still conflict, because
//! there is no per-field reconciliation.

use ledgervc_core::{Flake, Spot};
use std::collections::BTreeSet;

/// Result of conflict detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictResult {
    /// No conflict detected
    NoConflict,
    /// Both sides wrote these spots
    WriteWriteConflict {
        /// The overlapping spots, in order
        spots: Vec<Spot>,
    },
}

impl ConflictResult {
    /// Whether a conflict was found
    pub fn is_conflict(&self) -> bool {
        matches!(self, ConflictResult::WriteWriteConflict { .. })
    }

    /// Conflicting spots (empty when there is no conflict)
    pub fn spots(&self) -> &[Spot] {
        match self {
            ConflictResult::NoConflict => &[],
            ConflictResult::WriteWriteConflict { spots } => spots,
        }
    }
}

/// Footprint of a set of flakes
pub fn spots_of<'a>(flakes: impl IntoIterator<Item = &'a Flake>) -> BTreeSet<Spot> {
    flakes.into_iter().map(Flake::spot).collect()
}

/// True iff the two footprints intersect
pub fn has_conflict(source: &BTreeSet<Spot>, target: &BTreeSet<Spot>) -> bool {
    // iterate the smaller set
    let (small, large) = if source.len() <= target.len() {
        (source, target)
    } else {
        (target, source)
    };
    small.iter().any(|spot| large.contains(spot))
}

/// Compare two footprints and report every overlapping spot
pub fn check_write_write_conflicts(
    source: &BTreeSet<Spot>,
    target: &BTreeSet<Spot>,
) -> ConflictResult {
    let spots: Vec<Spot> = source.intersection(target).cloned().collect();
    if spots.is_empty() {
        ConflictResult::NoConflict
    } else {
        ConflictResult::WriteWriteConflict { spots }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgervc_core::{datatype, FlakeValue, Sid};
    use proptest::prelude::*;

    fn flake(s: &str, p: &str, o: &str) -> Flake {
        Flake::new(
            Sid::new(100, s),
            Sid::new(100, p),
            FlakeValue::from(o),
            datatype::string(),
            1,
            true,
        )
    }

    #[test]
    fn test_same_spot_different_values_conflict() {
        let source = spots_of(&[flake("s1", "p1", "A")]);
        let target = spots_of(&[flake("s1", "p1", "B")]);
        assert!(has_conflict(&source, &target));
        let result = check_write_write_conflicts(&source, &target);
        assert!(result.is_conflict());
        assert_eq!(result.spots().len(), 1);
    }

    #[test]
    fn test_identical_writes_still_conflict() {
        let source = spots_of(&[flake("s1", "p1", "A")]);
        let target = spots_of(&[flake("s1", "p1", "A")]);
        assert!(has_conflict(&source, &target));
    }

    #[test]
    fn test_disjoint_spots_do_not_conflict() {
        let source = spots_of(&[flake("s1", "p1", "A"), flake("s2", "p1", "A")]);
        let target = spots_of(&[flake("s1", "p2", "A")]);
        assert!(!has_conflict(&source, &target));
        assert_eq!(
            check_write_write_conflicts(&source, &target),
            ConflictResult::NoConflict
        );
    }

    #[test]
    fn test_empty_side_never_conflicts() {
        let source = spots_of(&[flake("s1", "p1", "A")]);
        assert!(!has_conflict(&source, &BTreeSet::new()));
        assert!(!has_conflict(&BTreeSet::new(), &source));
    }

    fn arb_spots() -> impl Strategy<Value = BTreeSet<Spot>> {
        proptest::collection::btree_set((0u8..6, 0u8..4), 0..8).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(s, p)| flake(&format!("s{}", s), &format!("p{}", p), "v").spot())
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_conflict_iff_intersection(a in arb_spots(), b in arb_spots()) {
            let intersects = a.intersection(&b).next().is_some();
            prop_assert_eq!(has_conflict(&a, &b), intersects);
            prop_assert_eq!(has_conflict(&b, &a), intersects);
            prop_assert_eq!(check_write_write_conflicts(&a, &b).is_conflict(), intersects);
        }
    }
}
