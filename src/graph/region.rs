//! Sealed graphs handed to the provisioning engine.

use crate::error::{Result, TopologyError};
use crate::models::{DependencyEdge, NodeHandle, ResourceKind, ResourceNode};
use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::HashMap;

/// Immutable dependency graph of one region. Produced by `GraphBuilder::seal`.
#[derive(Debug, Clone)]
pub struct RegionGraph {
    pub(crate) region: String,
    pub(crate) location: String,
    pub(crate) vnet: NodeHandle,
    pub(crate) graph: DiGraph<ResourceNode, ()>,
    pub(crate) index: HashMap<String, NodeHandle>,
    pub(crate) order: Vec<NodeHandle>,
}

impl RegionGraph {
    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// The region's VNet, the root every other node depends on.
    pub fn vnet(&self) -> NodeHandle {
        self.vnet
    }

    pub fn vnet_node(&self) -> &ResourceNode {
        &self.graph[self.vnet.node_index()]
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl ExactSizeIterator<Item = &ResourceNode> + '_ {
        self.graph.raw_nodes().iter().map(|n| &n.weight)
    }

    /// Edges in the order they were linked.
    pub fn edges(&self) -> impl ExactSizeIterator<Item = DependencyEdge> + '_ {
        self.graph.raw_edges().iter().map(|e| DependencyEdge {
            from: e.source().into(),
            to: e.target().into(),
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&ResourceNode> {
        self.graph.node_weight(handle.node_index())
    }

    pub fn handle(&self, name: &str) -> Option<NodeHandle> {
        self.index.get(name).copied()
    }

    pub fn find(&self, name: &str) -> Option<&ResourceNode> {
        self.handle(name).and_then(|h| self.node(h))
    }

    pub fn nodes_of_kind(&self, kind: ResourceKind) -> Vec<&ResourceNode> {
        self.nodes().filter(|n| n.kind == kind).collect()
    }

    /// Names of the nodes `name` directly depends on, in edge order.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        let Some(handle) = self.handle(name) else {
            return Vec::new();
        };
        let mut incoming: Vec<_> = self
            .graph
            .edges_directed(handle.node_index(), Direction::Incoming)
            .map(|e| (e.id(), e.source()))
            .collect();
        incoming.sort();
        incoming
            .into_iter()
            .map(|(_, from)| self.graph[from].name.as_str())
            .collect()
    }

    /// A creation order that respects every edge.
    pub fn topological_order(&self) -> &[NodeHandle] {
        &self.order
    }

    pub fn protected_count(&self) -> usize {
        self.nodes().filter(|n| n.protected).count()
    }
}

/// Reference to a VNet in a specific region graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VnetRef {
    pub region: String,
    pub vnet: String,
    pub handle: NodeHandle,
}

/// One direction of a VNet peering. Always created together with its reverse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeeringLink {
    pub node: ResourceNode,
    pub source: VnetRef,
    pub remote: VnetRef,
}

impl PeeringLink {
    pub fn name(&self) -> &str {
        &self.node.name
    }
}

/// Every region graph of a topology plus the peering links between them.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    pub(crate) regions: Vec<RegionGraph>,
    pub(crate) peerings: Vec<PeeringLink>,
}

impl ResourceGraph {
    pub fn regions(&self) -> &[RegionGraph] {
        &self.regions
    }

    pub fn peerings(&self) -> &[PeeringLink] {
        &self.peerings
    }

    pub fn region(&self, id: &str) -> Result<&RegionGraph> {
        self.regions
            .iter()
            .find(|r| r.region == id)
            .ok_or_else(|| TopologyError::UnknownRegion(id.to_string()))
    }

    pub fn peering(&self, name: &str) -> Option<&PeeringLink> {
        self.peerings.iter().find(|p| p.name() == name)
    }

    pub fn node_count(&self) -> usize {
        self.regions.iter().map(|r| r.node_count()).sum::<usize>() + self.peerings.len()
    }
}
