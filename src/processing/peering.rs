//! Cross-region VNet peering.
//!
//! A peering request always yields two links, one per direction, each with its own
//! flags. Names derive from the ordered region pair, so rebuilding the same
//! topology yields the same peering identities.

use crate::config;
use crate::error::{Result, TopologyError};
use crate::graph::{PeeringLink, RegionGraph, ResourceGraph, VnetRef};
use crate::models::{Ipv4, PeeringOptions, PeeringRequest, ResourceKind, ResourceNode};

/// Name of the source → dest peering.
pub fn peering_name(source: &str, dest: &str) -> String {
    format!("peer-{source}-{dest}")
}

fn vnet_ref(region: &RegionGraph) -> VnetRef {
    VnetRef {
        region: region.region().to_string(),
        vnet: region.vnet_node().name.clone(),
        handle: region.vnet(),
    }
}

fn has_gateway(region: &RegionGraph) -> bool {
    region
        .find(config::GATEWAY_SUBNET_NAME)
        .is_some_and(|n| n.kind == ResourceKind::Subnet)
}

/// Address blocks the region's VNet announces.
fn address_spaces(region: &RegionGraph) -> Result<Vec<Ipv4>> {
    region
        .vnet_node()
        .get("address_spaces")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(|v| v.as_str())
        .map(Ipv4::new)
        .collect()
}

/// The first pair of blocks the two VNets share, if any.
fn overlapping_space(source: &RegionGraph, dest: &RegionGraph) -> Result<Option<(Ipv4, Ipv4)>> {
    let remote = address_spaces(dest)?;
    Ok(address_spaces(source)?.into_iter().find_map(|ours| {
        remote
            .iter()
            .find(|theirs| ours.overlaps(theirs))
            .map(|theirs| (ours, *theirs))
    }))
}

fn check_options(
    name: &str,
    options: &PeeringOptions,
    remote: &RegionGraph,
    remote_options: &PeeringOptions,
) -> Result<()> {
    let invalid = |reason: &str| TopologyError::InvalidPeering {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if options.use_remote_gateways && options.allow_gateway_transit {
        return Err(invalid(
            "use_remote_gateways and allow_gateway_transit are exclusive",
        ));
    }
    if options.use_remote_gateways {
        if !has_gateway(remote) {
            return Err(invalid("remote region has no gateway subnet"));
        }
        if !remote_options.allow_gateway_transit {
            return Err(invalid("remote side does not allow gateway transit"));
        }
    }
    Ok(())
}

fn link(
    name: String,
    source: &RegionGraph,
    remote: &RegionGraph,
    options: &PeeringOptions,
) -> PeeringLink {
    let source_vnet = source.vnet_node();
    let mut node = ResourceNode::new(ResourceKind::Peering, &name)
        .attr("virtual_network", source_vnet.name.as_str())
        .attr("remote_virtual_network", remote.vnet_node().name.as_str())
        .attr("remote_region", remote.region())
        .attr(
            "allow_virtual_network_access",
            options.allow_virtual_network_access,
        )
        .attr("allow_forwarded_traffic", options.allow_forwarded_traffic)
        .attr("allow_gateway_transit", options.allow_gateway_transit)
        .attr("use_remote_gateways", options.use_remote_gateways);
    if let Some(rg) = source_vnet.get_str("resource_group") {
        node = node.attr("resource_group", rg);
    }
    PeeringLink {
        node,
        source: vnet_ref(source),
        remote: vnet_ref(remote),
    }
}

/// Build both directions of a peering between two sealed region graphs.
///
/// Both names are checked against `existing` before anything is produced, so a
/// failed request never leaves a half-formed pair behind.
pub fn peer_regions(
    source: &RegionGraph,
    dest: &RegionGraph,
    request: &PeeringRequest,
    existing: &[PeeringLink],
) -> Result<[PeeringLink; 2]> {
    let forward = peering_name(source.region(), dest.region());
    let reverse = peering_name(dest.region(), source.region());

    if source.region() == dest.region() {
        return Err(TopologyError::InvalidPeering {
            name: forward,
            reason: "a region cannot peer with itself".to_string(),
        });
    }
    for name in [&forward, &reverse] {
        if existing.iter().any(|p| p.name() == name.as_str()) {
            return Err(TopologyError::DuplicatePeering(name.clone()));
        }
    }
    if let Some((ours, theirs)) = overlapping_space(source, dest)? {
        return Err(TopologyError::InvalidPeering {
            name: forward,
            reason: format!("address space {ours} overlaps {theirs}"),
        });
    }
    check_options(&forward, &request.forward, dest, &request.reverse)?;
    check_options(&reverse, &request.reverse, source, &request.forward)?;

    log::info!("Peering {forward} and {reverse}");
    Ok([
        link(forward, source, dest, &request.forward),
        link(reverse, dest, source, &request.reverse),
    ])
}

/// Resolve a request against the assembled graph and add both links to it.
pub fn add_peering(graph: &mut ResourceGraph, request: &PeeringRequest) -> Result<()> {
    let pair = {
        let source = graph.region(&request.source)?;
        let dest = graph.region(&request.dest)?;
        peer_regions(source, dest, request, graph.peerings())?
    };
    graph.peerings.extend(pair);
    Ok(())
}
