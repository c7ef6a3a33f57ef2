//! Set difference between the live container ids reported by the runtime and
//! the ids the discovery loop already tracks.
use std::collections::HashSet;
use std::hash::Hash;

/// Ids present in `live` but not yet in `tracked`.
pub fn added<T: Eq + Hash + Clone>(live: &HashSet<T>, tracked: &HashSet<T>) -> HashSet<T> {
    live.difference(tracked).cloned().collect()
}

/// Ids still in `tracked` that the runtime no longer reports.
pub fn removed<T: Eq + Hash + Clone>(live: &HashSet<T>, tracked: &HashSet<T>) -> HashSet<T> {
    tracked.difference(live).cloned().collect()
}

/// Result of comparing one poll's live set with the tracked set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff<T: Eq + Hash> {
    pub added: HashSet<T>,
    pub removed: HashSet<T>,
}

impl<T: Eq + Hash + Clone> Diff<T> {
    pub fn compute(live: &HashSet<T>, tracked: &HashSet<T>) -> Self {
        Self {
            added: added(live, tracked),
            removed: removed(live, tracked),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Cheap pre-check: equal cardinality hints that nothing changed.
///
/// This is only a hint. A simultaneous add and remove keeps the size equal.
pub fn probably_unchanged<T>(live: &HashSet<T>, tracked: &HashSet<T>) -> bool {
    live.len() == tracked.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&'static str]) -> HashSet<&'static str> {
        ids.iter().copied().collect()
    }

    fn assert_diff_laws(live: &HashSet<&'static str>, tracked: &HashSet<&'static str>) {
        let diff = Diff::compute(live, tracked);
        assert!(diff.added.is_disjoint(tracked));
        assert!(diff.removed.is_disjoint(live));

        let rebuilt: HashSet<_> = tracked
            .union(&diff.added)
            .filter(|id| !diff.removed.contains(*id))
            .copied()
            .collect();
        assert_eq!(&rebuilt, live);
    }

    #[test]
    fn test_diff_laws_hold() {
        let cases = [
            (set(&[]), set(&[])),
            (set(&["c1", "c2"]), set(&[])),
            (set(&[]), set(&["c1", "c2"])),
            (set(&["c2"]), set(&["c1", "c2"])),
            (set(&["c1", "c3"]), set(&["c1", "c2"])),
            (set(&["c1", "c2", "c3"]), set(&["c4", "c5"])),
        ];
        for (live, tracked) in &cases {
            assert_diff_laws(live, tracked);
        }
    }

    #[test]
    fn test_new_containers_are_added() {
        let diff = Diff::compute(&set(&["c1", "c2"]), &set(&[]));
        assert_eq!(diff.added, set(&["c1", "c2"]));
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn test_vanished_containers_are_removed() {
        let diff = Diff::compute(&set(&["c2"]), &set(&["c1", "c2"]));
        assert!(diff.added.is_empty());
        assert_eq!(diff.removed, set(&["c1"]));
    }

    #[test]
    fn test_swap_is_invisible_to_cardinality_hint() {
        let live = set(&["c1", "c3"]);
        let tracked = set(&["c1", "c2"]);
        assert!(probably_unchanged(&live, &tracked));

        let diff = Diff::compute(&live, &tracked);
        assert!(!diff.is_empty());
        assert_eq!(diff.added, set(&["c3"]));
        assert_eq!(diff.removed, set(&["c2"]));
    }
}
