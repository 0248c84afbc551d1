//! Provisioning engine hand-off.
//!
//! The planner never talks to a cloud. It replays a finished [`ResourceGraph`] into
//! an engine through three calls: `declare`, `link` and `commit`.
//!
//! ```text
//!  ResourceGraph ──hand_off──▶ ProvisioningEngine
//!    region graphs              declare(node) -> EngineHandle
//!    (topological order)        link(from, to)
//!    peering links              commit() -> ApplyResult
//! ```

mod dry_run;

pub use dry_run::DryRunEngine;

use crate::error::{Result, TopologyError};
use crate::graph::ResourceGraph;
use crate::models::{NodeHandle, ResourceKind, ResourceNode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Opaque reference an engine hands back for a declared node.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EngineHandle(pub u64);

/// Failure reported by an engine. Opaque to the planner.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of a single node
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ActionResult {
    pub node: String,
    pub kind: ResourceKind,
    pub message: String,
    pub error: Option<String>,
}

/// Result of committing a graph to an engine
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ApplyResult {
    pub succeeded: Vec<ActionResult>,
    pub failed: Vec<ActionResult>,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, node: &ResourceNode, message: String) {
        self.succeeded.push(ActionResult {
            node: node.name.clone(),
            kind: node.kind,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, node: &ResourceNode, error: String) {
        self.failed.push(ActionResult {
            node: node.name.clone(),
            kind: node.kind,
            message: String::new(),
            error: Some(error),
        });
    }
}

/// The external collaborator that turns declarations into real resources.
///
/// Implementations must honour `ResourceNode::protected` by refusing destructive
/// replacement without an explicit override.
pub trait ProvisioningEngine {
    /// Register a node and return a handle later calls can refer to it by.
    fn declare(&mut self, node: &ResourceNode) -> std::result::Result<EngineHandle, EngineError>;

    /// Record that `from` must exist before `to`.
    fn link(&mut self, from: EngineHandle, to: EngineHandle)
        -> std::result::Result<(), EngineError>;

    /// Hand over everything declared so far.
    fn commit(&mut self) -> std::result::Result<ApplyResult, EngineError>;
}

/// Replay `graph` into `engine` and commit.
///
/// Regions go first, each in topological order with a node's dependency edges
/// linked right after it is declared. Peering links follow, each linked from both
/// VNets it joins. Engine failures keep the name of the node being handed over.
pub fn hand_off<E: ProvisioningEngine>(
    graph: &ResourceGraph,
    engine: &mut E,
) -> Result<ApplyResult> {
    let mut declared: HashMap<&str, HashMap<NodeHandle, EngineHandle>> = HashMap::new();

    for region in graph.regions() {
        let mut incoming: HashMap<NodeHandle, Vec<NodeHandle>> = HashMap::new();
        for edge in region.edges() {
            incoming.entry(edge.to).or_default().push(edge.from);
        }

        let handles = declared.entry(region.region()).or_default();
        for handle in region.topological_order() {
            let node = region
                .node(*handle)
                .ok_or(TopologyError::UnknownNodeHandle(handle.index()))?;
            let engine_handle = engine
                .declare(node)
                .map_err(|e| engine_error(Some(node), e))?;
            handles.insert(*handle, engine_handle);

            for dep in incoming.get(handle).map(Vec::as_slice).unwrap_or_default() {
                let from = handles
                    .get(dep)
                    .copied()
                    .ok_or(TopologyError::UnknownNodeHandle(dep.index()))?;
                engine
                    .link(from, engine_handle)
                    .map_err(|e| engine_error(Some(node), e))?;
            }
        }
        log::info!(
            "Handed off region {}: {} nodes",
            region.region(),
            region.node_count()
        );
    }

    for peering in graph.peerings() {
        let node = &peering.node;
        let engine_handle = engine
            .declare(node)
            .map_err(|e| engine_error(Some(node), e))?;
        for vnet in [&peering.source, &peering.remote] {
            let from = declared
                .get(vnet.region.as_str())
                .and_then(|h| h.get(&vnet.handle))
                .copied()
                .ok_or_else(|| TopologyError::UnknownRegion(vnet.region.clone()))?;
            engine
                .link(from, engine_handle)
                .map_err(|e| engine_error(Some(node), e))?;
        }
    }

    let result = engine.commit().map_err(|e| engine_error(None, e))?;
    log::info!(
        "Commit: {} succeeded, {} failed",
        result.succeeded.len(),
        result.failed.len()
    );
    Ok(result)
}

fn engine_error(node: Option<&ResourceNode>, e: EngineError) -> TopologyError {
    TopologyError::Engine {
        node: node.map(|n| n.name.clone()),
        message: e.message,
    }
}
