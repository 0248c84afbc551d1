//! Network security rule model.

use super::Ipv4;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Inbound,
    Outbound,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    Icmp,
    /// Any protocol, `*` in Azure.
    Any,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "Tcp"),
            Protocol::Udp => write!(f, "Udp"),
            Protocol::Icmp => write!(f, "Icmp"),
            Protocol::Any => write!(f, "*"),
        }
    }
}

/// One row of a region's policy table, written in segment names.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PolicyEntry {
    pub name: String,
    pub access: Access,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub protocol: Protocol,
    /// Source segments.
    pub sources: Vec<String>,
    /// Destination segments.
    pub destinations: Vec<String>,
    /// Destination ports: `*`, `80` or `1000-2000`.
    #[serde(default = "any_port")]
    pub ports: Vec<String>,
    /// Pinned priority; computed from the table position when unset.
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

fn any_port() -> Vec<String> {
    vec!["*".to_string()]
}

/// A resolved NSG rule, ready to attach to the NSG node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SecurityRule {
    pub name: String,
    pub priority: u32,
    pub direction: Direction,
    pub access: Access,
    pub protocol: Protocol,
    pub source_port_range: String,
    pub destination_port_ranges: Vec<String>,
    pub source_address_prefixes: Vec<Ipv4>,
    pub destination_address_prefixes: Vec<Ipv4>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
