//! VNet and subnet declaration.
//!
//! Turns an [`AddressPlan`] into the region's VNet node and one subnet node per
//! planned block, and builds the [`SubnetLookup`] every later step resolves
//! subnets through.

use super::AddressPlan;
use crate::error::{Result, TopologyError};
use crate::graph::GraphBuilder;
use crate::models::{
    num_az_hosts, Ipv4, NodeHandle, RegionSpec, ResourceKind, ResourceNode, SubnetPurpose,
};
use serde_json::json;
use std::collections::BTreeMap;

/// A declared subnet as seen by downstream builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubnetEntry {
    pub handle: NodeHandle,
    pub cidr: Ipv4,
    pub purpose: SubnetPurpose,
}

/// Read-only subnet index of one region, filled once by [`build_network`].
#[derive(Debug)]
pub struct SubnetLookup {
    vnet: NodeHandle,
    vnet_name: String,
    entries: BTreeMap<String, SubnetEntry>,
    order: Vec<String>,
}

impl SubnetLookup {
    pub fn vnet(&self) -> NodeHandle {
        self.vnet
    }

    pub fn vnet_name(&self) -> &str {
        &self.vnet_name
    }

    /// Resolve a subnet by name. Unplanned names are a build error.
    pub fn get(&self, name: &str) -> Result<&SubnetEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| TopologyError::UnknownSubnetReference(name.to_string()))
    }

    /// Subnets in plan order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SubnetEntry)> {
        self.order
            .iter()
            .map(|name| (name.as_str(), &self.entries[name]))
    }

    /// Workload subnets in plan order; reserved subnets are left out.
    pub fn workload(&self) -> impl Iterator<Item = (&str, &SubnetEntry)> {
        self.iter().filter(|(_, e)| !e.purpose.is_reserved())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Declare the VNet and its subnets, each subnet depending on the VNet.
pub fn build_network(
    region: &RegionSpec,
    plan: &AddressPlan,
    graph: &mut GraphBuilder,
) -> Result<SubnetLookup> {
    let vnet_name = region.vnet_name();
    let resource_group = region.resource_group();

    let vnet = graph.declare(
        ResourceNode::new(ResourceKind::VNet, &vnet_name)
            .attr("address_spaces", json!([plan.root().to_string()]))
            .attr("location", region.location.as_str())
            .attr("resource_group", resource_group.as_str())
            .protect(region.protect_network),
    )?;

    let mut entries = BTreeMap::new();
    let mut order = Vec::with_capacity(plan.subnets().len());
    for subnet in plan.subnets() {
        let mut node = ResourceNode::new(ResourceKind::Subnet, &subnet.name)
            .attr("address_prefixes", json!([subnet.cidr.to_string()]))
            .attr("virtual_network", vnet_name.as_str())
            .attr("resource_group", resource_group.as_str())
            .attr("purpose", json!(subnet.purpose))
            .protect(region.protect_network);
        if let Ok(hosts) = num_az_hosts(subnet.cidr.mask) {
            node = node.attr("usable_hosts", hosts);
        }

        let handle = graph.declare_after(node, &[vnet])?;
        entries.insert(
            subnet.name.clone(),
            SubnetEntry {
                handle,
                cidr: subnet.cidr,
                purpose: subnet.purpose,
            },
        );
        order.push(subnet.name.clone());
    }

    log::info!(
        "Region {}: declared {vnet_name} with {} subnets",
        region.id,
        order.len()
    );

    Ok(SubnetLookup {
        vnet,
        vnet_name,
        entries,
        order,
    })
}
