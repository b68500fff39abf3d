//! Deduplication of recommendation lists by target id.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::ContextKey;
use super::entry::{RecommendationEntry, finalize};

/// How duplicate entries for the same target are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Running mean: frequencies are summed and every duplicate adds a sample.
    Mean,
    /// Running sum: frequencies are summed, the sample count stays 1.
    Sum,
}

impl Policy {
    /// Global contexts accumulate usage, node-specific contexts average it.
    pub fn for_context(key: &ContextKey) -> Self {
        match key {
            ContextKey::AllNodes | ContextKey::SourceNodes => Policy::Sum,
            ContextKey::Single(_) | ContextKey::Pair(..) => Policy::Mean,
        }
    }
}

/// Merge entries sharing a target id. The first occurrence of every id is
/// the accumulator and keeps its position.
pub fn aggregate(entries: Vec<RecommendationEntry>, policy: Policy) -> Vec<RecommendationEntry> {
    let mut positions: HashMap<_, usize> = HashMap::with_capacity(entries.len());
    let mut merged: Vec<RecommendationEntry> = Vec::with_capacity(entries.len());

    for entry in entries {
        match positions.entry(entry.target_id.clone()) {
            Entry::Occupied(slot) => {
                let acc = &mut merged[*slot.get()];
                acc.frequency_sum = acc.frequency_sum.saturating_add(entry.frequency_sum);
                if policy == Policy::Mean {
                    acc.sample_count += 1;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(merged.len());
                merged.push(entry);
            }
        }
    }
    merged
}

/// Aggregate one (context, direction) list with the policy its context
/// calls for. Global contexts are also ranked and stamped with their total.
pub fn normalize(key: &ContextKey, entries: Vec<RecommendationEntry>) -> Vec<RecommendationEntry> {
    let policy = Policy::for_context(key);
    let mut merged = aggregate(entries, policy);
    if policy == Policy::Sum {
        finalize(&mut merged);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;

    fn entry(id: &str, frequency: u64) -> RecommendationEntry {
        RecommendationEntry::new(NodeId::from(id), frequency)
    }

    #[test]
    fn mean_merge_running_sequence() {
        let mut seen = Vec::new();
        let mut acc: Vec<RecommendationEntry> = Vec::new();
        for f in [3, 5, 10] {
            acc.push(entry("x", f));
            acc = aggregate(acc, Policy::Mean);
            seen.push(acc[0].frequency());
        }
        assert_eq!(seen, [3, 4, 6]);
        assert_eq!(acc[0].sample_count, 3);
    }

    #[test]
    fn sum_merge_keeps_single_sample() {
        let merged = aggregate(vec![entry("x", 3), entry("x", 5), entry("x", 10)], Policy::Sum);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].sample_count, 1);
        assert_eq!(merged[0].frequency(), 18);
    }

    #[test]
    fn sums_saturate_instead_of_overflowing() {
        for policy in [Policy::Sum, Policy::Mean] {
            let merged = aggregate(vec![entry("x", u64::MAX), entry("x", 1)], policy);
            assert_eq!(merged[0].frequency_sum, u64::MAX);
        }
    }

    #[test]
    fn first_occurrence_keeps_position() {
        let merged = aggregate(
            vec![entry("a", 1), entry("b", 2), entry("a", 3)],
            Policy::Mean,
        );
        let ids: Vec<&str> = merged.iter().map(|e| e.target_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(merged[0].frequency(), 2);
    }

    #[test]
    fn global_contexts_are_ranked() {
        let list = normalize(
            &ContextKey::AllNodes,
            vec![entry("a", 1), entry("b", 2), entry("a", 3)],
        );
        let ids: Vec<&str> = list.iter().map(|e| e.target_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert!(list.iter().all(|e| e.total_frequency == 6));
    }

    #[test]
    fn node_contexts_stay_unsorted() {
        let key = ContextKey::Single(NodeId::from("n"));
        let list = normalize(&key, vec![entry("a", 1), entry("b", 2)]);
        assert_eq!(list[0].target_id.as_str(), "a");
        assert_eq!(list[0].total_frequency, 0);
    }
}
