//! Resource graph node model.

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Kind tag of a declared resource. Opaque to the planner beyond naming and checks.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    VNet,
    Subnet,
    NIC,
    VM,
    AvailabilitySet,
    NSG,
    NSGAssociation,
    LoadBalancer,
    BackendPool,
    Peering,
    PublicIp,
    Firewall,
    RouteTable,
    RouteTableAssociation,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Opaque reference to a node declared in a region graph.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NodeHandle(pub(crate) usize);

impl NodeHandle {
    pub fn index(&self) -> usize {
        self.0
    }

    pub(crate) fn node_index(self) -> NodeIndex {
        NodeIndex::new(self.0)
    }
}

impl From<NodeIndex> for NodeHandle {
    fn from(ix: NodeIndex) -> Self {
        NodeHandle(ix.index())
    }
}

/// "`from` must exist before `to` is created or updated".
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyEdge {
    pub from: NodeHandle,
    pub to: NodeHandle,
}

/// A declared resource: kind, stable name, attributes and the protected flag.
///
/// Attributes live in a `BTreeMap` so serialized output is stable across builds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResourceNode {
    pub kind: ResourceKind,
    pub name: String,
    pub attributes: BTreeMap<String, Value>,
    /// The engine must refuse destructive replacement without explicit override.
    pub protected: bool,
}

impl ResourceNode {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> ResourceNode {
        ResourceNode {
            kind,
            name: name.into(),
            attributes: BTreeMap::new(),
            protected: false,
        }
    }

    pub fn attr(mut self, key: &str, value: impl Into<Value>) -> ResourceNode {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn protect(mut self, protected: bool) -> ResourceNode {
        self.protected = protected;
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

impl fmt::Display for ResourceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)?;
        if self.protected {
            write!(f, " [protected]")?;
        }
        Ok(())
    }
}
