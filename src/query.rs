//! Successor/predecessor queries against a built snapshot.
//!
//! A query for one node first looks at the node's actual neighbors in the
//! workflow: for every connected neighbor the matching pair context is
//! consulted, which yields recommendations specific to the path the node
//! sits on. The node's own single context is unioned in afterwards, so pair
//! entries win over single entries for the same target.

use serde::Serialize;

use crate::error::QueryError;
use crate::index::entry::{RecommendationEntry, finalize, target_key, union_by};
use crate::index::{ContextKey, Direction};
use crate::node::{NodeId, NodeTypeClassifier};
use crate::snapshot::Snapshot;

/// Result of a query against a possibly absent snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// No snapshot has been published (never loaded, or no source available).
    NotLoaded,
    Loaded(T),
}

impl<T> Lookup<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Lookup::Loaded(_))
    }

    pub fn loaded(self) -> Option<T> {
        match self {
            Lookup::Loaded(value) => Some(value),
            Lookup::NotLoaded => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Loaded(value) => Lookup::Loaded(f(value)),
            Lookup::NotLoaded => Lookup::NotLoaded,
        }
    }
}

/// The ranked list one statistics source produced for a query.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRecommendations {
    pub source: String,
    pub entries: Vec<RecommendationEntry>,
}

impl AsRef<[RecommendationEntry]> for SourceRecommendations {
    fn as_ref(&self) -> &[RecommendationEntry] {
        &self.entries
    }
}

// ---------------------------------------------------------------------------
// Graph access
// ---------------------------------------------------------------------------

/// A connection seen from one port of the queried node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Neighbor {
    /// Connected to a node of the given type.
    Node(NodeId),
    /// Connected to something outside the visible scope.
    Unresolved,
}

/// Read access to the workflow the queried node lives in.
pub trait GraphNeighbors {
    /// Handle of a node instance.
    type Node;

    /// The node type id of an instance.
    fn node_id(&self, node: &Self::Node) -> NodeId;

    /// Connections of `node`, grouped per port: input ports (upstream) for
    /// [`Direction::Predecessors`], output ports (downstream) for
    /// [`Direction::Successors`].
    fn port_neighbors(&self, node: &Self::Node, side: Direction) -> Vec<Vec<Neighbor>>;
}

/// A graph without connections. Queries then only use single-node contexts,
/// which is what id-only callers get.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl GraphNeighbors for Detached {
    type Node = NodeId;

    fn node_id(&self, node: &NodeId) -> NodeId {
        node.clone()
    }

    fn port_neighbors(&self, _node: &NodeId, _side: Direction) -> Vec<Vec<Neighbor>> {
        Vec::new()
    }
}

/// A graph view whose node ids are resolved through a classifier, so legacy
/// ids in a workflow match the canonical ids an index was built with. Ids the
/// classifier does not know are passed through unchanged.
pub struct Canonical<'a, G: ?Sized, C: ?Sized> {
    graph: &'a G,
    classifier: &'a C,
}

impl<'a, G, C> Canonical<'a, G, C>
where
    G: GraphNeighbors + ?Sized,
    C: NodeTypeClassifier + ?Sized,
{
    pub fn new(graph: &'a G, classifier: &'a C) -> Self {
        Self { graph, classifier }
    }

    fn resolve(&self, id: NodeId) -> NodeId {
        match self.classifier.classify(id.as_str()) {
            Some(known) => known.id,
            None => id,
        }
    }
}

impl<G, C> GraphNeighbors for Canonical<'_, G, C>
where
    G: GraphNeighbors + ?Sized,
    C: NodeTypeClassifier + ?Sized,
{
    type Node = G::Node;

    fn node_id(&self, node: &G::Node) -> NodeId {
        self.resolve(self.graph.node_id(node))
    }

    fn port_neighbors(&self, node: &G::Node, side: Direction) -> Vec<Vec<Neighbor>> {
        self.graph
            .port_neighbors(node, side)
            .into_iter()
            .map(|port| {
                port.into_iter()
                    .map(|neighbor| match neighbor {
                        Neighbor::Node(id) => Neighbor::Node(self.resolve(id)),
                        Neighbor::Unresolved => Neighbor::Unresolved,
                    })
                    .collect()
            })
            .collect()
    }
}

/// Neighbor ids that give context to a query in `direction`, in port order.
///
/// Successors of a node depend on what feeds it, so a successor query reads
/// the upstream side; a predecessor query reads the downstream side.
/// Successor scans end at the first connection leaving the visible scope and
/// keep what was found before it. Predecessor scans skip such connections.
pub fn context_neighbors<G: GraphNeighbors + ?Sized>(
    graph: &G,
    node: &G::Node,
    direction: Direction,
) -> Vec<NodeId> {
    let mut ids = Vec::new();
    for port in graph.port_neighbors(node, direction.reverse()) {
        for neighbor in port {
            match (neighbor, direction) {
                (Neighbor::Node(id), _) => ids.push(id),
                (Neighbor::Unresolved, Direction::Successors) => return ids,
                (Neighbor::Unresolved, Direction::Predecessors) => {}
            }
        }
    }
    ids
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Recommend successors or predecessors for zero or one selected node.
///
/// With no node the start-node list of every source is returned as stored,
/// whatever `direction` is.
pub fn recommend<G: GraphNeighbors + ?Sized>(
    snapshot: Option<&Snapshot>,
    graph: &G,
    nodes: &[G::Node],
    direction: Direction,
) -> Result<Lookup<Vec<SourceRecommendations>>, QueryError> {
    let Some(snapshot) = snapshot else {
        return Ok(Lookup::NotLoaded);
    };

    match nodes {
        [] => Ok(Lookup::Loaded(per_source(snapshot, |index| {
            index
                .list(&ContextKey::SourceNodes, Direction::Successors)
                .to_vec()
        }))),
        [node] => {
            let id = graph.node_id(node);
            let neighbors = context_neighbors(graph, node, direction);
            Ok(Lookup::Loaded(per_source(snapshot, |index| {
                let mut merged = Vec::new();
                for neighbor in &neighbors {
                    let key = match direction {
                        Direction::Successors => ContextKey::Pair(neighbor.clone(), id.clone()),
                        Direction::Predecessors => ContextKey::Pair(id.clone(), neighbor.clone()),
                    };
                    union_by(&mut merged, index.list(&key, direction).iter().cloned(), target_key);
                }
                let single = ContextKey::Single(id.clone());
                union_by(&mut merged, index.list(&single, direction).iter().cloned(), target_key);
                merged.retain(|entry| entry.target_id != id);
                finalize(&mut merged);
                merged
            })))
        }
        _ => Err(QueryError::UnsupportedQuery { count: nodes.len() }),
    }
}

/// The overall most used nodes of every source, as stored.
pub fn most_frequently_used(snapshot: Option<&Snapshot>) -> Lookup<Vec<SourceRecommendations>> {
    match snapshot {
        Some(snapshot) => Lookup::Loaded(per_source(snapshot, |index| {
            index
                .list(&ContextKey::AllNodes, Direction::Successors)
                .to_vec()
        })),
        None => Lookup::NotLoaded,
    }
}

fn per_source(
    snapshot: &Snapshot,
    mut f: impl FnMut(&crate::index::RecommendationIndex) -> Vec<RecommendationEntry>,
) -> Vec<SourceRecommendations> {
    snapshot
        .sources()
        .iter()
        .map(|source| SourceRecommendations {
            source: source.name.clone(),
            entries: f(&source.index),
        })
        .collect()
}
