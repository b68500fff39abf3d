//! Scored recommendation candidates and the list utilities that rank them.
//!
//! Entries have no `PartialEq`/`Ord` of their own. Identity is the target id
//! ([`target_key`]) and ranking is descending frequency
//! ([`by_frequency_desc`]); both are passed explicitly to the generic helpers.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::node::NodeId;

/// A recommended node with its aggregated frequency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationEntry {
    /// The recommended node.
    pub target_id: NodeId,
    /// Sum of all merged raw frequencies.
    pub frequency_sum: u64,
    /// Number of samples averaged into `frequency_sum` (1 under the sum policy).
    pub sample_count: u64,
    /// Sum of [`frequency`](Self::frequency) over the list this entry was
    /// finalized in; the denominator for percentage display.
    pub total_frequency: u64,
}

impl RecommendationEntry {
    pub fn new(target_id: NodeId, frequency: u64) -> Self {
        Self {
            target_id,
            frequency_sum: frequency,
            sample_count: 1,
            total_frequency: 0,
        }
    }

    /// `frequency_sum / sample_count`, rounded half away from zero.
    pub fn frequency(&self) -> u64 {
        let samples = self.sample_count;
        if samples <= 1 {
            return self.frequency_sum;
        }
        let (quotient, remainder) = (self.frequency_sum / samples, self.frequency_sum % samples);
        // remainder < samples, so this compares 2 * remainder >= samples without overflow
        if remainder >= samples - remainder {
            quotient + 1
        } else {
            quotient
        }
    }

    /// Share of this entry in its list, in `[0, 1]`.
    pub fn share(&self) -> f64 {
        if self.total_frequency == 0 {
            return 0.0;
        }
        self.frequency() as f64 / self.total_frequency as f64
    }
}

/// Identity key: two entries for the same target are the same recommendation.
pub fn target_key(entry: &RecommendationEntry) -> &NodeId {
    &entry.target_id
}

/// Ranking comparator: higher frequency first.
pub fn by_frequency_desc(a: &RecommendationEntry, b: &RecommendationEntry) -> Ordering {
    b.frequency().cmp(&a.frequency())
}

/// Sort `entries` (stable) and stamp the list total on every entry.
///
/// Entries with equal frequency keep their relative input order.
pub fn finalize(entries: &mut [RecommendationEntry]) {
    entries.sort_by(by_frequency_desc);
    let total = entries
        .iter()
        .map(RecommendationEntry::frequency)
        .fold(0u64, u64::saturating_add);
    for entry in entries.iter_mut() {
        entry.total_frequency = total;
    }
}

/// Append the items of `extra` whose key is not yet present, keeping the
/// first occurrence of every key.
pub fn union_by<T, K, F>(target: &mut Vec<T>, extra: impl IntoIterator<Item = T>, key: F)
where
    K: Eq + Hash + Clone,
    F: Fn(&T) -> &K,
{
    let mut seen: HashSet<K> = target.iter().map(|item| key(item).clone()).collect();
    for item in extra {
        if seen.insert(key(&item).clone()) {
            target.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, frequency: u64) -> RecommendationEntry {
        RecommendationEntry::new(NodeId::from(id), frequency)
    }

    #[test]
    fn frequency_rounds_mean() {
        let mut e = entry("a", 8);
        e.sample_count = 2;
        assert_eq!(e.frequency(), 4);
        e.frequency_sum = 7;
        assert_eq!(e.frequency(), 4); // 3.5 rounds up
        e.frequency_sum = 5;
        e.sample_count = 3;
        assert_eq!(e.frequency(), 2);
    }

    #[test]
    fn frequency_is_exact_for_huge_sums() {
        let mut e = entry("a", u64::MAX);
        e.sample_count = 2;
        assert_eq!(e.frequency(), u64::MAX / 2 + 1);
        e.frequency_sum = (1 << 60) + 3;
        e.sample_count = 3;
        assert_eq!(e.frequency(), (1 << 60) / 3 + 1);
    }

    #[test]
    fn finalize_total_saturates() {
        let mut list = vec![entry("a", u64::MAX), entry("b", 5)];
        finalize(&mut list);
        assert!(list.iter().all(|e| e.total_frequency == u64::MAX));
        assert_eq!(list[0].target_id.as_str(), "a");
    }

    #[test]
    fn finalize_sorts_stably_and_sets_total() {
        let mut list = vec![entry("a", 2), entry("b", 7), entry("c", 2), entry("d", 9)];
        finalize(&mut list);
        let ids: Vec<&str> = list.iter().map(|e| e.target_id.as_str()).collect();
        assert_eq!(ids, ["d", "b", "a", "c"]);
        assert!(list.iter().all(|e| e.total_frequency == 20));
        assert!((list[0].share() - 0.45).abs() < 1e-9);
    }

    #[test]
    fn union_keeps_first_occurrence() {
        let mut list = vec![entry("a", 1)];
        union_by(&mut list, vec![entry("a", 50), entry("b", 2)], target_key);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].frequency(), 1);
        assert_eq!(list[1].target_id.as_str(), "b");
    }
}
