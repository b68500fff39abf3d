//! Index construction from raw usage triples.
//!
//! Every triple is classified endpoint by endpoint and then run through five
//! additive ingestion rules; a single triple may feed several contexts:
//!
//! | rule | requires                                   | feeds                                   |
//! |------|--------------------------------------------|-----------------------------------------|
//! | 1    | node known                                 | `AllNodes` successors                   |
//! | 2    | only successor known, successor is source  | `SourceNodes` successors                |
//! | 3    | no predecessor, node is source             | `SourceNodes` successors                |
//! | 4    | no predecessor, node + successor known     | `Single` successors / predecessors      |
//! | 5    | all three known                            | `Pair` and `Single` in both directions  |
//!
//! An endpoint the classifier cannot resolve counts as absent.

use tracing::debug;

use crate::error::SourceError;
use crate::node::{KnownNode, NodeTypeClassifier, UsageTriple};

use super::{ContextKey, Direction, RecommendationEntry, RecommendationIndex};

/// Incrementally builds a [`RecommendationIndex`] for one statistics source.
pub struct TripleIndexBuilder<'c, C: NodeTypeClassifier + ?Sized> {
    classifier: &'c C,
    index: RecommendationIndex,
    ingested: usize,
}

impl<'c, C: NodeTypeClassifier + ?Sized> TripleIndexBuilder<'c, C> {
    pub fn new(classifier: &'c C) -> Self {
        Self {
            classifier,
            index: RecommendationIndex::new(),
            ingested: 0,
        }
    }

    fn resolve(&self, raw: Option<&str>) -> Option<KnownNode> {
        raw.and_then(|id| self.classifier.classify(id))
    }

    /// Apply all ingestion rules to one triple.
    pub fn ingest(&mut self, triple: &UsageTriple) {
        let pred = self.resolve(triple.predecessor.as_deref());
        let node = self.resolve(triple.node.as_deref());
        let succ = self.resolve(triple.successor.as_deref());
        let count = triple.count;
        self.ingested += 1;

        let index = &mut self.index;
        let mut add = |key: ContextKey, direction: Direction, target: &KnownNode| {
            index.push(key, direction, RecommendationEntry::new(target.id.clone(), count));
        };

        if let Some(n) = &node {
            add(ContextKey::AllNodes, Direction::Successors, n);
        }

        match (&pred, &node, &succ) {
            (None, None, Some(s)) if s.is_source() => {
                add(ContextKey::SourceNodes, Direction::Successors, s);
            }
            (None, Some(n), _) if n.is_source() => {
                add(ContextKey::SourceNodes, Direction::Successors, n);
            }
            _ => {}
        }

        match (&pred, &node, &succ) {
            (None, Some(n), Some(s)) => {
                add(ContextKey::Single(n.id.clone()), Direction::Successors, s);
                add(ContextKey::Single(s.id.clone()), Direction::Predecessors, n);
            }
            (Some(p), Some(n), Some(s)) => {
                add(
                    ContextKey::Pair(p.id.clone(), n.id.clone()),
                    Direction::Successors,
                    s,
                );
                add(
                    ContextKey::Pair(n.id.clone(), s.id.clone()),
                    Direction::Predecessors,
                    p,
                );
                add(ContextKey::Single(p.id.clone()), Direction::Successors, n);
                add(ContextKey::Single(n.id.clone()), Direction::Predecessors, p);
            }
            _ => {}
        }
    }

    /// Number of triples ingested so far.
    pub fn ingested(&self) -> usize {
        self.ingested
    }

    /// Aggregate every list and hand out the finished index.
    pub fn finish(mut self) -> RecommendationIndex {
        self.index.normalize();
        debug!(
            triples = self.ingested,
            contexts = self.index.len(),
            entries = self.index.entry_count(),
            "recommendation index built"
        );
        self.index
    }
}

/// Build an index from an infallible triple stream.
pub fn build<C>(
    triples: impl IntoIterator<Item = UsageTriple>,
    classifier: &C,
) -> RecommendationIndex
where
    C: NodeTypeClassifier + ?Sized,
{
    let mut builder = TripleIndexBuilder::new(classifier);
    for triple in triples {
        builder.ingest(&triple);
    }
    builder.finish()
}

/// Build an index from a fallible triple stream, stopping at the first error.
pub fn try_build<C>(
    triples: impl IntoIterator<Item = Result<UsageTriple, SourceError>>,
    classifier: &C,
) -> Result<RecommendationIndex, SourceError>
where
    C: NodeTypeClassifier + ?Sized,
{
    let mut builder = TripleIndexBuilder::new(classifier);
    for triple in triples {
        builder.ingest(&triple?);
    }
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeCatalog, NodeId, NodeType};

    fn catalog() -> NodeCatalog {
        let mut catalog = NodeCatalog::new();
        catalog.insert("reader", NodeType::Source);
        for id in ["filter", "join", "writer"] {
            catalog.insert(id, NodeType::Other);
        }
        catalog
    }

    fn ids(list: &[RecommendationEntry]) -> Vec<&str> {
        list.iter().map(|e| e.target_id.as_str()).collect()
    }

    fn single(id: &str) -> ContextKey {
        ContextKey::Single(NodeId::from(id))
    }

    fn pair(a: &str, b: &str) -> ContextKey {
        ContextKey::Pair(NodeId::from(a), NodeId::from(b))
    }

    #[test]
    fn lone_node_counts_towards_all_nodes_only() {
        let index = build(
            [
                UsageTriple::new(None, Some("filter"), None, 4),
                UsageTriple::new(None, Some("filter"), None, 6),
            ],
            &catalog(),
        );
        let all = index.list(&ContextKey::AllNodes, Direction::Successors);
        assert_eq!(ids(all), ["filter"]);
        assert_eq!(all[0].frequency(), 10);
        assert_eq!(all[0].sample_count, 1);
        assert!(index.list(&ContextKey::SourceNodes, Direction::Successors).is_empty());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn source_successor_without_context_is_a_start_node() {
        let index = build([UsageTriple::new(None, None, Some("reader"), 3)], &catalog());
        assert_eq!(
            ids(index.list(&ContextKey::SourceNodes, Direction::Successors)),
            ["reader"]
        );
        // a non-source successor is not
        let index = build([UsageTriple::new(None, None, Some("filter"), 3)], &catalog());
        assert!(index.is_empty());
    }

    #[test]
    fn source_node_without_predecessor_is_a_start_node() {
        let index = build(
            [UsageTriple::new(None, Some("reader"), Some("filter"), 2)],
            &catalog(),
        );
        assert_eq!(
            ids(index.list(&ContextKey::SourceNodes, Direction::Successors)),
            ["reader"]
        );
        assert_eq!(ids(index.list(&single("reader"), Direction::Successors)), ["filter"]);
        assert_eq!(
            ids(index.list(&single("filter"), Direction::Predecessors)),
            ["reader"]
        );
    }

    #[test]
    fn full_triple_feeds_pairs_and_singles() {
        let index = build(
            [UsageTriple::new(Some("reader"), Some("filter"), Some("writer"), 5)],
            &catalog(),
        );
        assert_eq!(
            ids(index.list(&pair("reader", "filter"), Direction::Successors)),
            ["writer"]
        );
        assert_eq!(
            ids(index.list(&pair("filter", "writer"), Direction::Predecessors)),
            ["reader"]
        );
        assert_eq!(ids(index.list(&single("reader"), Direction::Successors)), ["filter"]);
        assert_eq!(
            ids(index.list(&single("filter"), Direction::Predecessors)),
            ["reader"]
        );
        // a triple with a predecessor never marks a start node
        assert!(index.list(&ContextKey::SourceNodes, Direction::Successors).is_empty());
        assert!(index.list(&single("filter"), Direction::Successors).is_empty());
    }

    #[test]
    fn unknown_endpoints_are_excluded() {
        let index = build(
            [UsageTriple::new(Some("gone"), Some("filter"), Some("writer"), 5)],
            &catalog(),
        );
        // the unresolved predecessor degrades the triple to rule 4
        assert_eq!(ids(index.list(&single("filter"), Direction::Successors)), ["writer"]);
        assert!(index.list(&pair("gone", "filter"), Direction::Successors).is_empty());

        let index = build(
            [UsageTriple::new(None, Some("gone"), Some("writer"), 5)],
            &catalog(),
        );
        assert!(index.is_empty());
    }

    #[test]
    fn node_contexts_average_repeated_observations() {
        let index = build(
            [
                UsageTriple::new(None, Some("filter"), Some("writer"), 3),
                UsageTriple::new(None, Some("filter"), Some("join"), 1),
                UsageTriple::new(None, Some("filter"), Some("writer"), 5),
                UsageTriple::new(None, Some("filter"), Some("writer"), 10),
            ],
            &catalog(),
        );
        let list = index.list(&single("filter"), Direction::Successors);
        assert_eq!(ids(list), ["writer", "join"]);
        assert_eq!(list[0].frequency(), 6);
        assert_eq!(list[0].sample_count, 3);
    }

    #[test]
    fn maximal_counts_do_not_overflow() {
        let index = build(
            [
                UsageTriple::new(None, Some("filter"), None, u64::MAX),
                UsageTriple::new(None, Some("filter"), None, 1),
                UsageTriple::new(None, Some("join"), None, u64::MAX),
            ],
            &catalog(),
        );
        let all = index.list(&ContextKey::AllNodes, Direction::Successors);
        assert_eq!(ids(all), ["filter", "join"]);
        assert_eq!(all[0].frequency(), u64::MAX);
        assert!(all.iter().all(|e| e.total_frequency == u64::MAX));
    }

    #[test]
    fn try_build_stops_at_first_error() {
        let triples = vec![
            Ok(UsageTriple::new(None, Some("filter"), None, 1)),
            Err(SourceError::Parse {
                source_name: "test".into(),
                line: 2,
                message: "bad".into(),
            }),
        ];
        let err = try_build(triples, &catalog()).unwrap_err();
        assert!(matches!(err, SourceError::Parse { line: 2, .. }));
    }
}
