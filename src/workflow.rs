//! Workflow graphs: node instances wired port to port.
//!
//! [`WorkflowGraph`] is the [`GraphNeighbors`] implementation used by the CLI
//! and tests. It is a petgraph `DiGraph` whose nodes are node instances plus
//! one boundary node standing for everything outside the visible scope
//! (e.g. the ports of an enclosing component). Connections to or from the
//! boundary show up as [`Neighbor::Unresolved`].
//!
//! Workflows load from JSON:
//!
//! ```text
//! {
//!   "nodes": [{"instance": 1, "factory": "csv-reader"}, {"instance": 2, "factory": "row-filter"}],
//!   "connections": [
//!     {"source": 1, "source_port": 0, "dest": 2, "dest_port": 0},
//!     {"dest": 1, "dest_port": 0}
//!   ]
//! }
//! ```
//!
//! A connection without `source` enters from the boundary; one without
//! `dest` leaves to it.

use std::collections::HashMap;
use std::path::Path;

use petgraph::Direction as EdgeDirection;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;
use crate::index::Direction;
use crate::node::NodeId;
use crate::query::{GraphNeighbors, Neighbor};

pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;

/// Serialized form of a workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Instance number, unique within the workflow.
    pub instance: u32,
    /// Node type id.
    pub factory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSpec {
    /// Upstream instance; `None` for the boundary.
    #[serde(default)]
    pub source: Option<u32>,
    #[serde(default)]
    pub source_port: usize,
    /// Downstream instance; `None` for the boundary.
    #[serde(default)]
    pub dest: Option<u32>,
    #[serde(default)]
    pub dest_port: usize,
}

#[derive(Debug, Clone)]
enum WorkflowNode {
    Instance { instance: u32, factory: NodeId },
    Boundary,
}

#[derive(Debug, Clone, Copy)]
struct Link {
    source_port: usize,
    dest_port: usize,
}

/// Handle of a node instance inside one [`WorkflowGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceHandle(NodeIndex);

/// A workflow as a port-labelled directed graph.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    graph: DiGraph<WorkflowNode, Link>,
    boundary: NodeIndex,
    instances: HashMap<u32, NodeIndex>,
}

impl Default for WorkflowGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowGraph {
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let boundary = graph.add_node(WorkflowNode::Boundary);
        Self {
            graph,
            boundary,
            instances: HashMap::new(),
        }
    }

    pub fn load(path: &Path) -> WorkflowResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| WorkflowError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let spec: WorkflowSpec =
            serde_json::from_str(&content).map_err(|e| WorkflowError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Self::from_spec(&spec)
    }

    pub fn from_spec(spec: &WorkflowSpec) -> WorkflowResult<Self> {
        let mut workflow = Self::new();
        for node in &spec.nodes {
            workflow.add_node(node.instance, node.factory.as_str())?;
        }
        for conn in &spec.connections {
            workflow.connect(conn.source, conn.source_port, conn.dest, conn.dest_port)?;
        }
        Ok(workflow)
    }

    pub fn add_node(
        &mut self,
        instance: u32,
        factory: impl Into<NodeId>,
    ) -> WorkflowResult<InstanceHandle> {
        if self.instances.contains_key(&instance) {
            return Err(WorkflowError::DuplicateInstance { instance });
        }
        let idx = self.graph.add_node(WorkflowNode::Instance {
            instance,
            factory: factory.into(),
        });
        self.instances.insert(instance, idx);
        Ok(InstanceHandle(idx))
    }

    /// Connect an output port to an input port. `None` on either side
    /// connects to the boundary.
    pub fn connect(
        &mut self,
        source: Option<u32>,
        source_port: usize,
        dest: Option<u32>,
        dest_port: usize,
    ) -> WorkflowResult<()> {
        if source.is_none() && dest.is_none() {
            return Err(WorkflowError::DanglingConnection);
        }
        let from = self.endpoint(source)?;
        let to = self.endpoint(dest)?;
        self.graph.add_edge(
            from,
            to,
            Link {
                source_port,
                dest_port,
            },
        );
        Ok(())
    }

    fn endpoint(&self, instance: Option<u32>) -> WorkflowResult<NodeIndex> {
        match instance {
            Some(instance) => self
                .instances
                .get(&instance)
                .copied()
                .ok_or(WorkflowError::InstanceNotFound { instance }),
            None => Ok(self.boundary),
        }
    }

    pub fn instance(&self, instance: u32) -> WorkflowResult<InstanceHandle> {
        self.endpoint(Some(instance)).map(InstanceHandle)
    }

    /// Number of node instances (the boundary is not counted).
    pub fn node_count(&self) -> usize {
        self.instances.len()
    }

    pub fn connection_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn neighbor_at(&self, idx: NodeIndex) -> Neighbor {
        match &self.graph[idx] {
            WorkflowNode::Instance { factory, .. } => Neighbor::Node(factory.clone()),
            WorkflowNode::Boundary => Neighbor::Unresolved,
        }
    }
}

impl GraphNeighbors for WorkflowGraph {
    type Node = InstanceHandle;

    fn node_id(&self, node: &InstanceHandle) -> NodeId {
        match &self.graph[node.0] {
            WorkflowNode::Instance { factory, .. } => factory.clone(),
            WorkflowNode::Boundary => NodeId::new(""),
        }
    }

    fn port_neighbors(&self, node: &InstanceHandle, side: Direction) -> Vec<Vec<Neighbor>> {
        let edge_direction = match side {
            Direction::Successors => EdgeDirection::Outgoing,
            Direction::Predecessors => EdgeDirection::Incoming,
        };

        // (port, edge index, neighbor); petgraph yields newest edges first
        let mut links: Vec<(usize, usize, Neighbor)> = self
            .graph
            .edges_directed(node.0, edge_direction)
            .map(|edge| {
                let (port, other) = match side {
                    Direction::Successors => (edge.weight().source_port, edge.target()),
                    Direction::Predecessors => (edge.weight().dest_port, edge.source()),
                };
                (port, edge.id().index(), self.neighbor_at(other))
            })
            .collect();
        links.sort_by_key(|&(port, order, _)| (port, order));

        let ports = links.last().map_or(0, |&(port, _, _)| port + 1);
        let mut grouped: Vec<Vec<Neighbor>> = vec![Vec::new(); ports];
        for (port, _, neighbor) in links {
            grouped[port].push(neighbor);
        }
        grouped
    }
}
