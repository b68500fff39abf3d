//! Context-keyed recommendation indices built from usage triples.
//!
//! One [`RecommendationIndex`] is built per statistics source. It maps a
//! [`ContextKey`] to two lists of [`RecommendationEntry`]: the nodes seen
//! before the context and the nodes seen after it.
//!
//! - [`builder`]: ingestion rules turning triples into raw lists
//! - [`aggregate`]: mean/sum deduplication applied before publication
//! - [`entry`]: the entry type plus ranking and identity helpers

pub mod aggregate;
pub mod builder;
pub mod entry;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node::NodeId;

pub use builder::TripleIndexBuilder;
pub use entry::RecommendationEntry;

/// Which neighbors of a context are being recommended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Nodes that typically follow.
    Successors,
    /// Nodes that typically precede.
    Predecessors,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Successors => Direction::Predecessors,
            Direction::Predecessors => Direction::Successors,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Successors => f.write_str("successors"),
            Direction::Predecessors => f.write_str("predecessors"),
        }
    }
}

/// Lookup key of an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContextKey {
    /// Every node, regardless of neighbors (overall popularity).
    AllNodes,
    /// Nodes that start workflows.
    SourceNodes,
    /// A single node.
    Single(NodeId),
    /// An ordered pair: successors of `.1` when it follows `.0`, or
    /// predecessors of `.0` when it precedes `.1`.
    Pair(NodeId, NodeId),
}

/// The two recommendation lists stored under one context.
#[derive(Debug, Clone, Default)]
pub struct ContextLists {
    pub predecessors: Vec<RecommendationEntry>,
    pub successors: Vec<RecommendationEntry>,
}

impl ContextLists {
    pub fn get(&self, direction: Direction) -> &[RecommendationEntry] {
        match direction {
            Direction::Successors => &self.successors,
            Direction::Predecessors => &self.predecessors,
        }
    }

    fn get_mut(&mut self, direction: Direction) -> &mut Vec<RecommendationEntry> {
        match direction {
            Direction::Successors => &mut self.successors,
            Direction::Predecessors => &mut self.predecessors,
        }
    }
}

/// All recommendation lists of one statistics source.
#[derive(Debug, Clone, Default)]
pub struct RecommendationIndex {
    contexts: HashMap<ContextKey, ContextLists>,
}

impl RecommendationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The list stored under `key` in `direction`; empty if absent.
    pub fn list(&self, key: &ContextKey, direction: Direction) -> &[RecommendationEntry] {
        self.contexts
            .get(key)
            .map(|lists| lists.get(direction))
            .unwrap_or_default()
    }

    pub fn context(&self, key: &ContextKey) -> Option<&ContextLists> {
        self.contexts.get(key)
    }

    /// Number of distinct contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Total number of entries over all contexts and directions.
    pub fn entry_count(&self) -> usize {
        self.contexts
            .values()
            .map(|lists| lists.predecessors.len() + lists.successors.len())
            .sum()
    }

    fn push(&mut self, key: ContextKey, direction: Direction, entry: RecommendationEntry) {
        self.contexts
            .entry(key)
            .or_default()
            .get_mut(direction)
            .push(entry);
    }

    /// Apply the context-dependent aggregation policy to every list.
    fn normalize(&mut self) {
        for (key, lists) in self.contexts.iter_mut() {
            for direction in [Direction::Predecessors, Direction::Successors] {
                let list = std::mem::take(lists.get_mut(direction));
                *lists.get_mut(direction) = aggregate::normalize(key, list);
            }
        }
    }
}
