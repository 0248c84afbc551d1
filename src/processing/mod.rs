//! Topology build steps.
//!
//! Each step appends to a region's [`GraphBuilder`](crate::graph::GraphBuilder) in
//! a fixed order:
//! - [`address_planner`] - carve the root block into subnets
//! - [`topology`] - VNet and subnet nodes, plus the subnet lookup
//! - [`fleet`] - NIC/VM fleets per segment, tracked NICs
//! - [`security_policy`] - NSG rules and subnet associations
//! - [`load_balancer`] - load balancers over tracked NICs
//! - [`routing`] - optional firewall and route table
//! - [`peering`] - cross-region VNet peering on sealed graphs

mod address_planner;
mod fleet;
mod load_balancer;
mod peering;
mod routing;
mod security_policy;
mod topology;

// Re-export public functions
pub use address_planner::{
    plan_addresses, plan_region, subnet_requests, AddressPlan, SubnetRequest,
};
pub use fleet::{build_fleet, Fleet, TrackedNicRegistry, TrackedNics};
pub use load_balancer::{build_load_balancer, LoadBalancer};
pub use peering::{add_peering, peer_regions, peering_name};
pub use routing::{build_routing, Routing};
pub use security_policy::{build_security_policy, compose_rules, Nsg};
pub use topology::{build_network, SubnetEntry, SubnetLookup};
