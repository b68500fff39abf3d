//! Node identities, usage triples, and node-type classification.
//!
//! A [`UsageTriple`] records how often a node was observed between a
//! predecessor and a successor in real workflows. Before a triple is indexed
//! every endpoint is passed through a [`NodeTypeClassifier`]; endpoints the
//! classifier cannot resolve (uninstalled or renamed node types) are treated
//! as unknown and silently left out of the rules that need them.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a node type (its factory id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Coarse node classification relevant to recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// A node without input ports; the entry point of a workflow.
    Source,
    /// Any other node.
    Other,
}

/// A triple endpoint the classifier could resolve.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KnownNode {
    /// Canonical id, which may differ from the raw id for legacy aliases.
    pub id: NodeId,
    pub node_type: NodeType,
}

impl KnownNode {
    pub fn new(id: impl Into<NodeId>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            node_type,
        }
    }

    pub fn is_source(&self) -> bool {
        self.node_type == NodeType::Source
    }
}

/// A historical usage record: `node` was seen after `predecessor` and before
/// `successor`, `count` times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageTriple {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predecessor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successor: Option<String>,
    pub count: u64,
}

impl UsageTriple {
    pub fn new(
        predecessor: Option<&str>,
        node: Option<&str>,
        successor: Option<&str>,
        count: u64,
    ) -> Self {
        Self {
            predecessor: predecessor.map(str::to_string),
            node: node.map(str::to_string),
            successor: successor.map(str::to_string),
            count,
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Resolves a raw node id to a known node, or `None` if the id is unknown.
///
/// Implementations must be pure: the same raw id always resolves the same way
/// for the lifetime of a reload.
pub trait NodeTypeClassifier: Send + Sync {
    fn classify(&self, raw_id: &str) -> Option<KnownNode>;
}

/// Plain closures returning a [`NodeType`] classify ids without renaming them.
impl<F> NodeTypeClassifier for F
where
    F: Fn(&str) -> Option<NodeType> + Send + Sync,
{
    fn classify(&self, raw_id: &str) -> Option<KnownNode> {
        self(raw_id).map(|node_type| KnownNode::new(raw_id, node_type))
    }
}

/// Table-driven classifier with support for legacy ids.
///
/// Lookup order: exact id, then alias table, then (if `accept_unlisted`)
/// any other id resolves to itself as [`NodeType::Other`].
#[derive(Debug, Clone, Default)]
pub struct NodeCatalog {
    types: HashMap<NodeId, NodeType>,
    aliases: HashMap<String, NodeId>,
    accept_unlisted: bool,
}

impl NodeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve ids missing from the catalog as [`NodeType::Other`].
    pub fn accepting_unlisted(mut self, accept: bool) -> Self {
        self.accept_unlisted = accept;
        self
    }

    pub fn insert(&mut self, id: impl Into<NodeId>, node_type: NodeType) {
        self.types.insert(id.into(), node_type);
    }

    /// Map a legacy id onto a current one. The target need not be listed yet.
    pub fn alias(&mut self, legacy: impl Into<String>, current: impl Into<NodeId>) {
        self.aliases.insert(legacy.into(), current.into());
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl NodeTypeClassifier for NodeCatalog {
    fn classify(&self, raw_id: &str) -> Option<KnownNode> {
        let id = NodeId::from(raw_id);
        if let Some(&node_type) = self.types.get(&id) {
            return Some(KnownNode { id, node_type });
        }
        if let Some(current) = self.aliases.get(raw_id) {
            if let Some(&node_type) = self.types.get(current) {
                return Some(KnownNode::new(current.clone(), node_type));
            }
            if self.accept_unlisted {
                return Some(KnownNode::new(current.clone(), NodeType::Other));
            }
            return None;
        }
        self.accept_unlisted.then(|| KnownNode::new(id, NodeType::Other))
    }
}
