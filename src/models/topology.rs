//! Topology input model.
//!
//! [`TopologySpec`] is what the planner reads from the topology file: regions with
//! their ordered segments, plus the region pairs to peer.

use super::{Ipv4, PolicyEntry, Protocol};
use crate::config;
use serde::{Deserialize, Serialize};

/// Whole-build input: every region and the peering requests between them.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TopologySpec {
    pub regions: Vec<RegionSpec>,
    #[serde(default)]
    pub peerings: Vec<PeeringRequest>,
}

/// One region's network: root block, ordered segments and optional features.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegionSpec {
    /// Short region identifier used in generated names (e.g. "cus").
    pub id: String,
    /// Azure location tag (e.g. "SouthCentralUS").
    pub location: String,
    /// Resource group every node of the region lands in.
    #[serde(default)]
    pub resource_group: Option<String>,
    /// VNet name, `vnet-{id}` when unset.
    #[serde(default)]
    pub vnet_name: Option<String>,
    /// Root address block of the VNet.
    pub address_space: Ipv4,
    /// Subnet size for segments that do not set their own.
    #[serde(default = "default_subnet_prefix")]
    pub subnet_prefix: u8,
    /// Segments in allocation order.
    pub segments: Vec<SegmentSpec>,
    #[serde(default)]
    pub features: RegionFeatures,
    /// Mark VNet, subnets and NSG as protected against destructive changes.
    #[serde(default = "default_true")]
    pub protect_network: bool,
    /// Boot-diagnostics storage endpoint shared by every VM in the region.
    #[serde(default)]
    pub diagnostics_endpoint: Option<String>,
    /// NSG policy table, evaluated in the listed order.
    #[serde(default)]
    pub policy: Vec<PolicyEntry>,
    #[serde(default)]
    pub load_balancers: Vec<LoadBalancerSpec>,
}

impl RegionSpec {
    pub fn vnet_name(&self) -> String {
        self.vnet_name
            .clone()
            .unwrap_or_else(|| format!("vnet-{}", self.id))
    }

    pub fn resource_group(&self) -> String {
        self.resource_group
            .clone()
            .unwrap_or_else(|| format!("rg-{}", self.id))
    }

    pub fn nsg_name(&self) -> String {
        format!("nsg-{}", self.id)
    }
}

/// Optional per-region subnets and routing.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RegionFeatures {
    pub firewall_subnet: bool,
    pub gateway_subnet: bool,
    pub app_gateway_subnet: bool,
    /// Route internet-bound traffic through the firewall. Needs `firewall_subnet`.
    pub route_table: bool,
}

/// A business segment: one subnet and its VM fleet.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SegmentSpec {
    /// Subnet name, unique within the region.
    pub name: String,
    /// VM name prefix, unique within the region.
    pub vm_prefix: String,
    #[serde(default)]
    pub vm_count: usize,
    /// Place the fleet in a shared availability set.
    #[serde(default)]
    pub high_availability: bool,
    /// Track NICs for backend-pool membership.
    #[serde(default)]
    pub load_balanced: bool,
    /// Resist destructive changes to the fleet.
    #[serde(default)]
    pub protected: bool,
    /// Subnet size override.
    #[serde(default)]
    pub prefix_len: Option<u8>,
}

impl SegmentSpec {
    pub fn new(name: &str, vm_prefix: &str, vm_count: usize) -> SegmentSpec {
        SegmentSpec {
            name: name.to_string(),
            vm_prefix: vm_prefix.to_string(),
            vm_count,
            high_availability: false,
            load_balanced: false,
            protected: false,
            prefix_len: None,
        }
    }
}

/// Internal load balancer in front of a load-balanced segment.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoadBalancerSpec {
    pub name: String,
    /// Segment whose subnet hosts the frontend and whose tracked NICs form the pool.
    pub segment: String,
    /// Number of tracked NICs to place in the pool; all of them when unset.
    #[serde(default)]
    pub members: Option<usize>,
    #[serde(default = "default_lb_port")]
    pub frontend_port: u16,
    #[serde(default = "default_lb_port")]
    pub backend_port: u16,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default = "default_lb_sku")]
    pub sku: String,
}

/// Request to peer two regions; each direction carries its own flags.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PeeringRequest {
    pub source: String,
    pub dest: String,
    /// Flags for the source → dest link.
    #[serde(default)]
    pub forward: PeeringOptions,
    /// Flags for the dest → source link.
    #[serde(default)]
    pub reverse: PeeringOptions,
}

impl PeeringRequest {
    pub fn new(source: &str, dest: &str) -> PeeringRequest {
        PeeringRequest {
            source: source.to_string(),
            dest: dest.to_string(),
            forward: PeeringOptions::default(),
            reverse: PeeringOptions::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct PeeringOptions {
    pub allow_virtual_network_access: bool,
    pub allow_forwarded_traffic: bool,
    pub allow_gateway_transit: bool,
    pub use_remote_gateways: bool,
}

impl Default for PeeringOptions {
    fn default() -> Self {
        PeeringOptions {
            allow_virtual_network_access: true,
            allow_forwarded_traffic: false,
            allow_gateway_transit: false,
            use_remote_gateways: false,
        }
    }
}

fn default_subnet_prefix() -> u8 {
    config::DEFAULT_SUBNET_PREFIX
}

fn default_true() -> bool {
    true
}

fn default_lb_port() -> u16 {
    config::LB_DEFAULT_PORT
}

fn default_lb_sku() -> String {
    config::LB_DEFAULT_SKU.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_defaults() {
        let json = r#"{
            "id": "cus",
            "location": "SouthCentralUS",
            "address_space": "10.0.0.0/22",
            "segments": [{"name": "Suppliers", "vm_prefix": "vm", "vm_count": 3}]
        }"#;
        let region: RegionSpec = serde_json::from_str(json).unwrap();
        assert_eq!(region.subnet_prefix, 25);
        assert!(region.protect_network);
        assert_eq!(region.features, RegionFeatures::default());
        assert_eq!(region.vnet_name(), "vnet-cus");
        assert_eq!(region.resource_group(), "rg-cus");
        assert_eq!(region.segments[0].vm_count, 3);
        assert!(!region.segments[0].high_availability);
    }

    #[test]
    fn test_peering_options_default_to_access_only() {
        let req: PeeringRequest =
            serde_json::from_str(r#"{"source": "cus", "dest": "eus"}"#).unwrap();
        assert!(req.forward.allow_virtual_network_access);
        assert!(!req.forward.allow_gateway_transit);
        assert_eq!(req.forward, req.reverse);
    }

    #[test]
    fn test_load_balancer_defaults() {
        let lb: LoadBalancerSpec =
            serde_json::from_str(r#"{"name": "foodLb", "segment": "Food"}"#).unwrap();
        assert_eq!(lb.frontend_port, 80);
        assert_eq!(lb.sku, "Basic");
        assert_eq!(lb.protocol, Protocol::Tcp);
        assert!(lb.members.is_none());
    }
}
