// cargo watch -x 'fmt' -x 'run'  // 'run -- topology.json'

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod input;
pub mod models;
pub mod output;
pub mod processing;

use std::collections::HashSet;

pub use engine::{hand_off, ApplyResult, DryRunEngine, EngineHandle, ProvisioningEngine};
pub use error::{Result, TopologyError};
pub use graph::{RegionGraph, ResourceGraph};
pub use input::read_topology_spec;
pub use models::{RegionSpec, TopologySpec};

use graph::GraphBuilder;
use processing::{
    build_fleet, build_load_balancer, build_network, build_routing, build_security_policy,
    plan_region, TrackedNicRegistry,
};

/// Build and seal the dependency graph of one region.
///
/// Steps run in a fixed order: addresses, VNet and subnets, fleets, NSG, load
/// balancers, routing. The first error aborts the region.
pub fn build_region(spec: &RegionSpec) -> Result<RegionGraph> {
    log::info!(
        "Building region {} ({}) in {}",
        spec.id,
        spec.location,
        spec.address_space
    );
    let plan = plan_region(spec)?;
    let mut graph = GraphBuilder::new(&spec.id, &spec.location);
    let lookup = build_network(spec, &plan, &mut graph)?;

    let mut tracked = TrackedNicRegistry::new();
    for segment in &spec.segments {
        let fleet = build_fleet(spec, segment, &lookup, &mut graph)?;
        tracked.insert(fleet.tracked);
    }

    build_security_policy(spec, &lookup, &mut graph)?;

    for lb in &spec.load_balancers {
        build_load_balancer(spec, lb, &lookup, &tracked.segment(&lb.segment), &mut graph)?;
    }

    build_routing(spec, &lookup, &mut graph)?;

    graph.seal()
}

/// Build every region, then peer them as requested.
pub fn build_topology(spec: &TopologySpec) -> Result<ResourceGraph> {
    let mut seen = HashSet::new();
    for region in &spec.regions {
        if !seen.insert(region.id.as_str()) {
            return Err(TopologyError::DuplicateRegion(region.id.clone()));
        }
    }

    let mut graph = ResourceGraph::default();
    for region in &spec.regions {
        graph.regions.push(build_region(region)?);
    }
    for request in &spec.peerings {
        processing::add_peering(&mut graph, request)?;
    }

    log::info!(
        "Topology built: {} regions, {} peering links, {} nodes",
        graph.regions().len(),
        graph.peerings().len(),
        graph.node_count()
    );
    Ok(graph)
}
