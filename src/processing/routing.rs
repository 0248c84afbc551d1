//! Optional firewall and route table.
//!
//! With `firewall_subnet` a region gets an Azure Firewall behind a static public IP.
//! With `route_table` as well, internet-bound traffic from every workload subnet is
//! steered through it.

use super::SubnetLookup;
use crate::config;
use crate::error::{Result, TopologyError};
use crate::graph::GraphBuilder;
use crate::models::{NodeHandle, RegionSpec, ResourceKind, ResourceNode};
use serde_json::json;

#[derive(Debug, Clone, Default)]
pub struct Routing {
    pub firewall: Option<NodeHandle>,
    pub route_table: Option<NodeHandle>,
    pub associations: Vec<NodeHandle>,
}

pub fn build_routing(
    region: &RegionSpec,
    lookup: &SubnetLookup,
    graph: &mut GraphBuilder,
) -> Result<Routing> {
    let features = &region.features;
    if features.route_table && !features.firewall_subnet {
        return Err(TopologyError::InvalidFeature {
            region: region.id.clone(),
            reason: "route_table needs firewall_subnet as next hop".to_string(),
        });
    }
    let mut routing = Routing::default();
    if !features.firewall_subnet {
        return Ok(routing);
    }

    let resource_group = region.resource_group();
    let fw_subnet = lookup.get(config::FIREWALL_SUBNET_NAME)?;

    let pip_name = format!("{}-fw-pip", region.id);
    let pip = ResourceNode::new(ResourceKind::PublicIp, &pip_name)
        .attr("location", region.location.as_str())
        .attr("resource_group", resource_group.as_str())
        .attr("sku", "Standard")
        .attr("allocation_method", "Static")
        .attr("ip_version", "IPv4");
    let pip = graph.declare_after(pip, &[lookup.vnet()])?;

    let fw_name = format!("{}-fw", region.id);
    let firewall = ResourceNode::new(ResourceKind::Firewall, &fw_name)
        .attr("location", region.location.as_str())
        .attr("resource_group", resource_group.as_str())
        .attr("threat_intel_mode", "Off")
        .attr(
            "ip_configuration",
            json!({
                "name": format!("{fw_name}-ipconfig"),
                "subnet": config::FIREWALL_SUBNET_NAME,
                "public_ip_address": pip_name,
            }),
        );
    let firewall = graph.declare_after(firewall, &[fw_subnet.handle, pip])?;
    routing.firewall = Some(firewall);

    if !features.route_table {
        log::info!("Region {}: firewall {fw_name} without route table", region.id);
        return Ok(routing);
    }

    let next_hop = fw_subnet
        .cidr
        .host(config::FIREWALL_HOST_OFFSET)
        .ok_or_else(|| TopologyError::InvalidFeature {
            region: region.id.clone(),
            reason: format!("firewall subnet {} too small for a next hop", fw_subnet.cidr),
        })?;

    let rt_name = format!("{}-rt", region.id);
    let route_table = ResourceNode::new(ResourceKind::RouteTable, &rt_name)
        .attr("location", region.location.as_str())
        .attr("resource_group", resource_group.as_str())
        .attr(
            "routes",
            json!([{
                "name": "InternetBound",
                "address_prefix": "0.0.0.0/0",
                "next_hop_type": "VirtualAppliance",
                "next_hop_in_ip_address": next_hop.to_string(),
            }]),
        );
    let route_table = graph.declare_after(route_table, &[firewall])?;
    routing.route_table = Some(route_table);

    for (subnet_name, subnet) in lookup.workload() {
        let association = ResourceNode::new(
            ResourceKind::RouteTableAssociation,
            format!("{rt_name}-{subnet_name}"),
        )
        .attr("subnet", subnet_name)
        .attr("route_table", rt_name.as_str());
        routing
            .associations
            .push(graph.declare_after(association, &[route_table, subnet.handle])?);
    }

    log::info!(
        "Region {}: {rt_name} via {next_hop} on {} subnets",
        region.id,
        routing.associations.len()
    );
    Ok(routing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegionFeatures;
    use crate::processing::{build_network, plan_region};

    fn region(features: RegionFeatures) -> RegionSpec {
        let mut region: RegionSpec = serde_json::from_str(
            r#"{
                "id": "cus",
                "location": "SouthCentralUS",
                "address_space": "10.0.0.0/22",
                "segments": [
                    {"name": "Suppliers", "vm_prefix": "vm"},
                    {"name": "Food", "vm_prefix": "vmFood"},
                    {"name": "Clothing", "vm_prefix": "vmClothing"},
                    {"name": "Farming", "vm_prefix": "vmFarming"},
                    {"name": "Garden", "vm_prefix": "vmGarden"}
                ]
            }"#,
        )
        .unwrap();
        region.features = features;
        region
    }

    fn build(region: &RegionSpec) -> (GraphBuilder, Result<Routing>) {
        let plan = plan_region(region).unwrap();
        let mut graph = GraphBuilder::new(&region.id, &region.location);
        let lookup = build_network(region, &plan, &mut graph).unwrap();
        let routing = build_routing(region, &lookup, &mut graph);
        (graph, routing)
    }

    #[test]
    fn test_route_through_firewall() {
        let region = region(RegionFeatures {
            firewall_subnet: true,
            route_table: true,
            ..Default::default()
        });
        let (graph, routing) = build(&region);
        let routing = routing.unwrap();
        assert!(routing.firewall.is_some());
        assert_eq!(routing.associations.len(), 5);

        let sealed = graph.seal().unwrap();
        let rt = sealed.find("cus-rt").unwrap();
        // Firewall subnet is 10.0.2.128/25, first usable host .132
        assert_eq!(rt.get("routes").unwrap()[0]["next_hop_in_ip_address"], "10.0.2.132");
        assert_eq!(sealed.dependencies_of("cus-rt"), vec!["cus-fw"]);
        assert_eq!(
            sealed.dependencies_of("cus-fw"),
            vec!["AzureFirewallSubnet", "cus-fw-pip"]
        );
        assert!(sealed.find("cus-rt-AzureFirewallSubnet").is_none());
        assert_eq!(sealed.dependencies_of("cus-rt-Garden"), vec!["cus-rt", "Garden"]);
    }

    #[test]
    fn test_firewall_without_route_table() {
        let region = region(RegionFeatures {
            firewall_subnet: true,
            ..Default::default()
        });
        let (graph, routing) = build(&region);
        let routing = routing.unwrap();
        assert!(routing.route_table.is_none());
        assert!(graph.handle("cus-fw").is_some());
    }

    #[test]
    fn test_no_features_no_nodes() {
        let region = region(RegionFeatures::default());
        let (graph, routing) = build(&region);
        assert!(routing.unwrap().firewall.is_none());
        assert_eq!(graph.len(), 6);
    }

    #[test]
    fn test_route_table_requires_firewall() {
        let region = region(RegionFeatures {
            route_table: true,
            ..Default::default()
        });
        let (_, routing) = build(&region);
        assert!(matches!(
            routing.unwrap_err(),
            TopologyError::InvalidFeature { .. }
        ));
    }
}
