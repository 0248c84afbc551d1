//! Domain models for the topology planner.
//!
//! This module contains the core data structures used throughout the application:
//! - [`Ipv4`] - IPv4 network block with CIDR arithmetic
//! - [`TopologySpec`], [`RegionSpec`], [`SegmentSpec`] - planner input
//! - [`PlannedSubnet`] - a subnet carved out by the address planner
//! - [`ResourceNode`], [`NodeHandle`], [`DependencyEdge`] - resource graph pieces
//! - [`PolicyEntry`], [`SecurityRule`] - NSG policy input and resolved rules

mod ipv4;
mod resource;
mod rule;
mod subnet;
mod topology;

// Re-export public types
pub use ipv4::{block_size, get_cidr_mask, num_az_hosts, Ipv4, MAX_LENGTH};
pub use resource::{DependencyEdge, NodeHandle, ResourceKind, ResourceNode};
pub use rule::{Access, Direction, PolicyEntry, Protocol, SecurityRule};
pub use subnet::{PlannedSubnet, SubnetPurpose};
pub use topology::{
    LoadBalancerSpec, PeeringOptions, PeeringRequest, RegionFeatures, RegionSpec, SegmentSpec,
    TopologySpec,
};
