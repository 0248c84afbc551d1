//! Topology build error types.
//!
//! Every error is structural and raised while the graph is assembled. Any of them
//! aborts the whole build, so callers never see a partially built graph.

use thiserror::Error;

/// Errors raised while planning or assembling a topology.
#[derive(Error, Debug)]
pub enum TopologyError {
    // Address planning
    #[error("Capacity exceeded: '{segment}' needs a /{prefix_len} but {root} is fully allocated")]
    CapacityExceeded {
        segment: String,
        prefix_len: u8,
        root: String,
    },

    #[error("Invalid prefix /{prefix_len} for '{segment}' in {root}: {reason}")]
    InvalidPrefix {
        segment: String,
        prefix_len: u8,
        root: String,
        reason: String,
    },

    #[error("Invalid CIDR: {0}")]
    InvalidCidr(String),

    // Graph integrity
    #[error("Duplicate resource name: {0}")]
    DuplicateResourceName(String),

    #[error("Unknown subnet reference: {0}")]
    UnknownSubnetReference(String),

    #[error("Cyclic dependency between: {}", .0.join(", "))]
    CyclicDependency(Vec<String>),

    #[error("Insufficient tracked NICs for '{segment}': no NIC {requested} of {available}")]
    InsufficientTrackedNics {
        segment: String,
        requested: usize,
        available: usize,
    },

    #[error("Invalid resource name: '{0}'")]
    InvalidResourceName(String),

    #[error("Unknown node handle: #{0}")]
    UnknownNodeHandle(usize),

    #[error("Node '{0}' does not resolve to exactly one VNet")]
    UnanchoredNode(String),

    #[error("Duplicate region id: {0}")]
    DuplicateRegion(String),

    #[error("Invalid feature combination in region '{region}': {reason}")]
    InvalidFeature { region: String, reason: String },

    // Security policy
    #[error("Rule conflict in {nsg}: {reason}")]
    RuleConflict { nsg: String, reason: String },

    #[error("Rule '{rule}' priority {priority} outside 100..=4096")]
    PriorityOutOfRange { rule: String, priority: u32 },

    #[error("Invalid port range '{port}' in rule '{rule}'")]
    InvalidPortRange { rule: String, port: String },

    // Peering
    #[error("Duplicate peering: {0}")]
    DuplicatePeering(String),

    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    #[error("Invalid peering {name}: {reason}")]
    InvalidPeering { name: String, reason: String },

    // Hand-off and input
    #[error("Provisioning engine error at {}: {message}", .node.as_deref().unwrap_or("commit"))]
    Engine {
        node: Option<String>,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Error parsing {file}: path={path} error={message}")]
    Parse {
        file: String,
        path: String,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, TopologyError>;
