//! Append-only region graph builder.
//!
//! Components declare nodes and link them while a region is built. [`GraphBuilder::seal`]
//! checks the result and hands back an immutable [`RegionGraph`].

use super::RegionGraph;
use crate::error::{Result, TopologyError};
use crate::models::{NodeHandle, ResourceKind, ResourceNode};
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use regex::Regex;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::sync::OnceLock;

/// Names Azure accepts for every resource kind the planner emits.
static NAME_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_name_regex() -> &'static Regex {
    NAME_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,79}$").expect("Invalid Regex")
    })
}

/// Check a resource name before it is declared.
pub fn validate_name(name: &str) -> Result<()> {
    if get_name_regex().is_match(name) {
        Ok(())
    } else {
        Err(TopologyError::InvalidResourceName(name.to_string()))
    }
}

/// Mutable graph for one region, owned by that region's build pass.
#[derive(Debug)]
pub struct GraphBuilder {
    region: String,
    location: String,
    graph: DiGraph<ResourceNode, ()>,
    index: HashMap<String, NodeHandle>,
}

impl GraphBuilder {
    pub fn new(region: &str, location: &str) -> GraphBuilder {
        GraphBuilder {
            region: region.to_string(),
            location: location.to_string(),
            graph: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Register a node and return the handle later declarations use to refer to it.
    pub fn declare(&mut self, node: ResourceNode) -> Result<NodeHandle> {
        validate_name(&node.name)?;
        if self.index.contains_key(&node.name) {
            return Err(TopologyError::DuplicateResourceName(format!(
                "{} in region {}",
                node.name, self.region
            )));
        }
        log::debug!(
            "declare #{} {node} in {}",
            self.graph.node_count(),
            self.region
        );
        let name = node.name.clone();
        let handle = NodeHandle::from(self.graph.add_node(node));
        self.index.insert(name, handle);
        Ok(handle)
    }

    /// Record that `from` must exist before `to`. Repeated edges are kept once.
    pub fn link(&mut self, from: NodeHandle, to: NodeHandle) -> Result<()> {
        self.check_handle(from)?;
        self.check_handle(to)?;
        let (from, to) = (from.node_index(), to.node_index());
        if from == to {
            return Err(TopologyError::CyclicDependency(vec![self.graph[from]
                .name
                .clone()]));
        }
        if self.graph.find_edge(from, to).is_none() {
            log::trace!(
                "link {} -> {}",
                self.graph[from].name,
                self.graph[to].name
            );
            self.graph.add_edge(from, to, ());
        }
        Ok(())
    }

    /// Declare `node` and make it depend on each of `dependencies`.
    pub fn declare_after(
        &mut self,
        node: ResourceNode,
        dependencies: &[NodeHandle],
    ) -> Result<NodeHandle> {
        for dep in dependencies {
            self.check_handle(*dep)?;
        }
        let handle = self.declare(node)?;
        for dep in dependencies {
            self.link(*dep, handle)?;
        }
        Ok(handle)
    }

    pub fn node(&self, handle: NodeHandle) -> Result<&ResourceNode> {
        self.graph
            .node_weight(handle.node_index())
            .ok_or(TopologyError::UnknownNodeHandle(handle.index()))
    }

    pub fn name_of(&self, handle: NodeHandle) -> Result<&str> {
        Ok(&self.node(handle)?.name)
    }

    pub fn handle(&self, name: &str) -> Option<NodeHandle> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn check_handle(&self, handle: NodeHandle) -> Result<()> {
        if handle.index() < self.graph.node_count() {
            Ok(())
        } else {
            Err(TopologyError::UnknownNodeHandle(handle.index()))
        }
    }

    /// Verify the graph and freeze it.
    ///
    /// Fails with `CyclicDependency` if the edges do not form a DAG and with
    /// `UnanchoredNode` unless every node resolves to exactly one VNet.
    pub fn seal(self) -> Result<RegionGraph> {
        if is_cyclic_directed(&self.graph) {
            return Err(TopologyError::CyclicDependency(cycle_members(&self.graph)));
        }
        let order = topological_order(&self.graph);

        let vnet = self
            .graph
            .node_indices()
            .find(|ix| self.graph[*ix].kind == ResourceKind::VNet)
            .map(NodeHandle::from)
            .ok_or_else(|| TopologyError::UnanchoredNode(format!("no VNet in {}", self.region)))?;

        // Walking in topological order means every predecessor is already resolved.
        let mut anchors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); self.graph.node_count()];
        for handle in &order {
            let ix = handle.node_index();
            let node = &self.graph[ix];
            let mut predecessors = self.graph.neighbors_directed(ix, Direction::Incoming);
            let resolved: BTreeSet<usize> = if node.kind == ResourceKind::VNet {
                if predecessors.next().is_some() {
                    return Err(TopologyError::UnanchoredNode(node.name.clone()));
                }
                BTreeSet::from([ix.index()])
            } else {
                predecessors
                    .flat_map(|p| anchors[p.index()].iter().copied())
                    .collect()
            };
            if resolved.len() != 1 {
                return Err(TopologyError::UnanchoredNode(node.name.clone()));
            }
            anchors[ix.index()] = resolved;
        }

        log::info!(
            "Sealed region {}: {} nodes, {} edges",
            self.region,
            self.graph.node_count(),
            self.graph.edge_count()
        );

        Ok(RegionGraph {
            region: self.region,
            location: self.location,
            vnet,
            graph: self.graph,
            index: self.index,
            order,
        })
    }
}

/// Names of the nodes on one cycle, in declaration order.
///
/// Strongly connected components with more than one node are exactly the cycles;
/// the one holding the earliest declared node is reported.
fn cycle_members(graph: &DiGraph<ResourceNode, ()>) -> Vec<String> {
    tarjan_scc(graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|mut component| {
            component.sort();
            component
        })
        .min_by_key(|component| component[0])
        .unwrap_or_default()
        .into_iter()
        .map(|ix| graph[ix].name.clone())
        .collect()
}

/// Kahn's algorithm over an acyclic graph, always releasing the lowest pending
/// handle first so the order only depends on declaration order.
fn topological_order(graph: &DiGraph<ResourceNode, ()>) -> Vec<NodeHandle> {
    let mut indegree: Vec<usize> = graph
        .node_indices()
        .map(|ix| graph.neighbors_directed(ix, Direction::Incoming).count())
        .collect();

    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse(i)) = ready.pop() {
        order.push(NodeHandle(i));
        for next in graph.neighbors_directed(NodeIndex::new(i), Direction::Outgoing) {
            indegree[next.index()] -= 1;
            if indegree[next.index()] == 0 {
                ready.push(Reverse(next.index()));
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vnet_and_subnet() -> (GraphBuilder, NodeHandle, NodeHandle) {
        let mut graph = GraphBuilder::new("cus", "SouthCentralUS");
        let vnet = graph
            .declare(ResourceNode::new(ResourceKind::VNet, "vnet1"))
            .unwrap();
        let subnet = graph
            .declare_after(ResourceNode::new(ResourceKind::Subnet, "Food"), &[vnet])
            .unwrap();
        (graph, vnet, subnet)
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("vmFood0-nic").is_ok());
        assert!(validate_name("AzureFirewallSubnet").is_ok());
        assert!(validate_name("-leading-dash").is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name("").is_err());
        assert!(validate_name(&"a".repeat(81)).is_err());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let (mut graph, _, _) = vnet_and_subnet();
        let err = graph
            .declare(ResourceNode::new(ResourceKind::NIC, "Food"))
            .unwrap_err();
        assert!(matches!(err, TopologyError::DuplicateResourceName(_)));
    }

    #[test]
    fn test_link_unknown_handle() {
        let (mut graph, vnet, _) = vnet_and_subnet();
        let err = graph.link(vnet, NodeHandle(42)).unwrap_err();
        assert!(matches!(err, TopologyError::UnknownNodeHandle(42)));
    }

    #[test]
    fn test_duplicate_edges_kept_once() {
        let (mut graph, vnet, subnet) = vnet_and_subnet();
        graph.link(vnet, subnet).unwrap();
        let sealed = graph.seal().unwrap();
        assert_eq!(sealed.edge_count(), 1);
    }

    #[test]
    fn test_cycle_detected_on_seal() {
        let (mut graph, _, subnet) = vnet_and_subnet();
        let nic = graph
            .declare_after(ResourceNode::new(ResourceKind::NIC, "vm0-nic"), &[subnet])
            .unwrap();
        let vm = graph
            .declare_after(ResourceNode::new(ResourceKind::VM, "vm0"), &[nic])
            .unwrap();
        graph.link(vm, nic).unwrap();
        match graph.seal().unwrap_err() {
            TopologyError::CyclicDependency(names) => {
                assert_eq!(names, vec!["vm0-nic".to_string(), "vm0".to_string()]);
            }
            e => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn test_cycle_reports_only_its_members() {
        let (mut graph, _, subnet) = vnet_and_subnet();
        let nic = graph
            .declare_after(ResourceNode::new(ResourceKind::NIC, "vm0-nic"), &[subnet])
            .unwrap();
        let vm = graph
            .declare_after(ResourceNode::new(ResourceKind::VM, "vm0"), &[nic])
            .unwrap();
        graph
            .declare_after(ResourceNode::new(ResourceKind::BackendPool, "pool"), &[vm])
            .unwrap();
        graph.link(vm, nic).unwrap();
        match graph.seal().unwrap_err() {
            TopologyError::CyclicDependency(names) => assert_eq!(names, vec!["vm0-nic", "vm0"]),
            e => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn test_self_link_is_cycle() {
        let (mut graph, _, subnet) = vnet_and_subnet();
        assert!(matches!(
            graph.link(subnet, subnet).unwrap_err(),
            TopologyError::CyclicDependency(_)
        ));
    }

    #[test]
    fn test_unanchored_node_rejected() {
        let (mut graph, _, _) = vnet_and_subnet();
        graph
            .declare(ResourceNode::new(ResourceKind::NSG, "nsg-cus"))
            .unwrap();
        assert!(matches!(
            graph.seal().unwrap_err(),
            TopologyError::UnanchoredNode(name) if name == "nsg-cus"
        ));
    }

    #[test]
    fn test_second_vnet_rejected() {
        let (mut graph, _, subnet) = vnet_and_subnet();
        let other = graph
            .declare(ResourceNode::new(ResourceKind::VNet, "vnet2"))
            .unwrap();
        graph
            .declare_after(
                ResourceNode::new(ResourceKind::NIC, "shared-nic"),
                &[subnet, other],
            )
            .unwrap();
        assert!(matches!(
            graph.seal().unwrap_err(),
            TopologyError::UnanchoredNode(name) if name == "shared-nic"
        ));
    }

    #[test]
    fn test_topological_order_is_declaration_stable() {
        let (mut graph, vnet, subnet) = vnet_and_subnet();
        let other = graph
            .declare_after(ResourceNode::new(ResourceKind::Subnet, "Garden"), &[vnet])
            .unwrap();
        let nic = graph
            .declare_after(ResourceNode::new(ResourceKind::NIC, "vm0-nic"), &[other])
            .unwrap();
        let sealed = graph.seal().unwrap();
        assert_eq!(sealed.topological_order(), &[vnet, subnet, other, nic]);
    }
}
