//! The immutable set of per-source indices currently in effect.
//!
//! A [`Snapshot`] is only ever created by a reload and is never mutated after
//! it has been published; a later reload replaces it wholesale.

use crate::index::RecommendationIndex;

/// A built index together with the name of the source it came from.
#[derive(Debug, Clone)]
pub struct SourceIndex {
    pub name: String,
    pub index: RecommendationIndex,
}

/// One index per enabled and successfully loaded statistics source, in
/// configuration order.
#[derive(Debug, Clone)]
pub struct Snapshot {
    sources: Vec<SourceIndex>,
}

impl Snapshot {
    /// Wrap the built indices. Returns `None` for an empty list: a snapshot
    /// without any source is never published.
    pub fn new(sources: Vec<SourceIndex>) -> Option<Self> {
        (!sources.is_empty()).then_some(Self { sources })
    }

    pub fn sources(&self) -> &[SourceIndex] {
        &self.sources
    }

    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
