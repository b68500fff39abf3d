//! Rank-synchronized joining of per-source recommendation lists.
//!
//! The output is a list of rows with one slot per source, meant for showing
//! the sources side by side. At every rank the sources that agree on the
//! same recommendation share a row; disagreeing sources get a row each.
//! Afterwards every recommendation is kept only in the first row that
//! exports it.
//!
//! The per-rank search tries every subset of sources, largest first, which is
//! exponential in the number of sources. That number comes from the
//! configuration and stays small.

use std::collections::HashSet;
use std::hash::Hash;

use itertools::Itertools;

use crate::index::entry::{RecommendationEntry, target_key};

/// One output row: a slot per source, `None` where the source does not take part.
pub type JoinedRow<T> = Vec<Option<T>>;

/// Join recommendation lists by target id.
pub fn join<L>(lists: &[L]) -> Vec<JoinedRow<RecommendationEntry>>
where
    L: AsRef<[RecommendationEntry]>,
{
    join_by(lists, target_key)
}

/// Join ranked lists, treating items with equal `key` as the same item.
pub fn join_by<T, K, L, F>(lists: &[L], key: F) -> Vec<JoinedRow<T>>
where
    T: Clone,
    K: Eq + Hash + Clone,
    L: AsRef<[T]>,
    F: Fn(&T) -> &K,
{
    let width = lists.len();
    let depth = lists
        .iter()
        .map(|list| list.as_ref().len())
        .max()
        .unwrap_or(0);

    let mut rows: Vec<JoinedRow<T>> = Vec::new();
    for rank in 0..depth {
        let mut working: Vec<Option<&T>> =
            lists.iter().map(|list| list.as_ref().get(rank)).collect();

        while let Some(subset) = largest_agreeing_subset(&working, &key) {
            let mut row: JoinedRow<T> = vec![None; width];
            for slot in subset {
                row[slot] = working[slot].take().cloned();
            }
            rows.push(row);
        }
    }

    let mut seen: HashSet<K> = HashSet::new();
    rows.retain(|row| match row.iter().flatten().next() {
        Some(first) => seen.insert(key(first).clone()),
        None => false,
    });
    rows
}

/// Slot indices of the largest group of occupied slots whose items share a
/// key. Among groups of the same size the lexicographically first wins.
/// `None` once every slot is empty.
fn largest_agreeing_subset<T, K, F>(working: &[Option<&T>], key: &F) -> Option<Vec<usize>>
where
    K: Eq,
    F: Fn(&T) -> &K,
{
    let occupied: Vec<usize> = working
        .iter()
        .enumerate()
        .filter_map(|(slot, item)| item.map(|_| slot))
        .collect();

    for size in (1..=occupied.len()).rev() {
        for subset in occupied.iter().copied().combinations(size) {
            let mut keys = subset.iter().filter_map(|&slot| working[slot].map(key));
            let Some(first) = keys.next() else { continue };
            if keys.all(|k| k == first) {
                return Some(subset);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;

    fn list(ids: &[&str]) -> Vec<RecommendationEntry> {
        ids.iter()
            .map(|id| RecommendationEntry::new(NodeId::from(*id), 1))
            .collect()
    }

    fn render(rows: &[JoinedRow<RecommendationEntry>]) -> Vec<Vec<&str>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .map(|slot| slot.as_ref().map_or("_", |e| e.target_id.as_str()))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn agreeing_sources_share_a_row() {
        let rows = join(&[list(&["n2"]), list(&["n2"])]);
        assert_eq!(render(&rows), [["n2", "n2"]]);
    }

    #[test]
    fn disagreement_splits_rank_into_singletons() {
        let rows = join(&[list(&["x", "z"]), list(&["y", "z"])]);
        assert_eq!(render(&rows), [["x", "_"], ["_", "y"], ["z", "z"]]);
    }

    #[test]
    fn largest_group_is_extracted_first() {
        let rows = join(&[list(&["a"]), list(&["b"]), list(&["b"])]);
        assert_eq!(render(&rows), [["_", "b", "b"], ["a", "_", "_"]]);
    }

    #[test]
    fn later_ranks_do_not_repeat_ids() {
        // "y" is exported at rank 0 by the second source and again at rank 1
        // by the first; only the first row survives.
        let rows = join(&[list(&["x", "y"]), list(&["y", "w"])]);
        assert_eq!(render(&rows), [["x", "_"], ["_", "y"], ["_", "w"]]);
    }

    #[test]
    fn uneven_lengths_leave_slots_empty() {
        let rows = join(&[list(&["a", "b", "c"]), list(&["a"])]);
        assert_eq!(render(&rows), [["a", "a"], ["b", "_"], ["c", "_"]]);
    }

    #[test]
    fn no_sources_no_rows() {
        let empty: [Vec<RecommendationEntry>; 0] = [];
        assert!(join(&empty).is_empty());
        assert!(join(&[list(&[]), list(&[])]).is_empty());
    }

    #[test]
    fn works_with_custom_keys() {
        fn label<'a>(item: &'a (i32, &'static str)) -> &'a &'static str {
            &item.1
        }
        let lists = vec![vec![(1, "a"), (2, "b")], vec![(3, "a")]];
        let rows = join_by(&lists, label);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![Some((1, "a")), Some((3, "a"))]);
        assert_eq!(rows[1], vec![Some((2, "b")), None]);
    }
}
