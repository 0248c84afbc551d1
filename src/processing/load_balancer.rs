//! Load-balancer wiring.
//!
//! Places an internal load balancer on a segment's subnet and fills its backend
//! pool from the NICs that segment tracked.

use super::{SubnetLookup, TrackedNics};
use crate::config;
use crate::error::{Result, TopologyError};
use crate::graph::GraphBuilder;
use crate::models::{LoadBalancerSpec, NodeHandle, RegionSpec, ResourceKind, ResourceNode};
use serde_json::json;

#[derive(Debug, Clone)]
pub struct LoadBalancer {
    pub handle: NodeHandle,
    pub pool: NodeHandle,
    pub members: Vec<NodeHandle>,
}

/// Declare the load balancer, its backend pool and one NIC → pool edge per member.
///
/// Members are the first `spec.members` tracked NICs (all of them when unset). Asking
/// for zero members is an `InvalidFeature`; a pool that cannot be filled is
/// `InsufficientTrackedNics`.
pub fn build_load_balancer(
    region: &RegionSpec,
    spec: &LoadBalancerSpec,
    lookup: &SubnetLookup,
    tracked: &TrackedNics,
    graph: &mut GraphBuilder,
) -> Result<LoadBalancer> {
    let subnet = lookup.get(&spec.segment)?.handle;
    if spec.members == Some(0) {
        return Err(TopologyError::InvalidFeature {
            region: region.id.clone(),
            reason: format!("load balancer {} asks for an empty backend pool", spec.name),
        });
    }
    let count = spec.members.unwrap_or(tracked.len());
    if count == 0 {
        return Err(TopologyError::InsufficientTrackedNics {
            segment: spec.segment.clone(),
            requested: 0,
            available: tracked.len(),
        });
    }
    let members = (0..count)
        .map(|i| tracked.get(i))
        .collect::<Result<Vec<NodeHandle>>>()?;

    let pool_name = format!("{}-pool", spec.name);
    let probe_name = format!("{}-probe", spec.name);
    let frontend_name = format!("{}-frontend", spec.name);

    let lb = ResourceNode::new(ResourceKind::LoadBalancer, &spec.name)
        .attr("location", region.location.as_str())
        .attr("resource_group", region.resource_group())
        .attr("sku", spec.sku.as_str())
        .attr(
            "frontend_ip_configuration",
            json!({
                "name": frontend_name,
                "subnet": spec.segment,
                "private_ip_address_allocation": "Dynamic",
                "private_ip_address_version": "IPv4",
            }),
        )
        .attr(
            "probe",
            json!({
                "name": probe_name,
                "protocol": spec.protocol,
                "port": spec.backend_port,
                "interval_in_seconds": config::LB_PROBE_INTERVAL_SECS,
            }),
        )
        .attr(
            "rule",
            json!({
                "name": format!("{}-rule", spec.name),
                "protocol": spec.protocol,
                "frontend_port": spec.frontend_port,
                "backend_port": spec.backend_port,
                "frontend_ip_configuration": frontend_name,
                "backend_address_pool": pool_name,
                "probe": probe_name,
            }),
        );
    let handle = graph.declare_after(lb, &[subnet])?;

    let member_names = members
        .iter()
        .map(|nic| graph.name_of(*nic).map(str::to_string))
        .collect::<Result<Vec<String>>>()?;
    let pool = ResourceNode::new(ResourceKind::BackendPool, &pool_name)
        .attr("load_balancer", spec.name.as_str())
        .attr("ip_configuration_name", config::NIC_IP_CONFIG_NAME)
        .attr("members", json!(member_names));
    let pool = graph.declare_after(pool, &[handle])?;
    for nic in &members {
        graph.link(*nic, pool)?;
    }

    log::info!(
        "Region {}: {} fronting {} NICs of {}",
        region.id,
        spec.name,
        members.len(),
        spec.segment
    );
    Ok(LoadBalancer {
        handle,
        pool,
        members,
    })
}
