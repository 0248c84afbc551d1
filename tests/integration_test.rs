//! Integration tests for azure-topology-planner
//!
//! These tests build the two-region marketplace topology end to end and check the
//! planning scenarios through the public API.

use azure_topology_planner::graph::{GraphBuilder, ResourceGraph};
use azure_topology_planner::models::{
    Ipv4, PeeringRequest, RegionSpec, ResourceKind, SecurityRule, SegmentSpec,
};
use azure_topology_planner::output::to_json;
use azure_topology_planner::processing::{
    build_fleet, build_network, plan_addresses, plan_region, SubnetRequest,
};
use azure_topology_planner::{
    build_region, build_topology, hand_off, read_topology_spec, DryRunEngine, TopologyError,
    TopologySpec,
};
use std::collections::HashSet;

const MARKETPLACE: &str = "src/tests/test_data/marketplace_topology.json";

fn marketplace_spec() -> TopologySpec {
    read_topology_spec(MARKETPLACE).expect("Failed to read topology spec")
}

fn marketplace() -> ResourceGraph {
    build_topology(&marketplace_spec()).expect("Failed to build topology")
}

fn eus_region(segment: SegmentSpec) -> RegionSpec {
    let mut region: RegionSpec = serde_json::from_str(
        r#"{"id": "eus", "location": "EastUS2", "address_space": "10.1.0.0/22", "segments": []}"#,
    )
    .expect("Failed to parse region");
    region.segments.push(segment);
    region
}

#[test]
fn test_scenario_a_six_segments_in_order() {
    let root = Ipv4::new("10.0.0.0/22").unwrap();
    let names = ["Suppliers", "Food", "Clothing", "Farming", "Garden", "Extra"];
    let requests: Vec<SubnetRequest> = names
        .iter()
        .map(|n| SubnetRequest::workload(n, 25))
        .collect();
    let plan = plan_addresses(root, &requests).expect("Failed to plan addresses");

    let cidrs: Vec<String> = plan.subnets().iter().map(|s| s.cidr.to_string()).collect();
    assert_eq!(
        cidrs,
        vec![
            "10.0.0.0/25",
            "10.0.0.128/25",
            "10.0.1.0/25",
            "10.0.1.128/25",
            "10.0.2.0/25",
            "10.0.2.128/25",
        ]
    );
    let planned: Vec<&str> = plan.subnets().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(planned, names);
}

#[test]
fn test_scenario_b_high_availability_fleet() {
    let mut segment = SegmentSpec::new("Food2", "vmFood2", 3);
    segment.high_availability = true;
    let graph = build_region(&eus_region(segment)).expect("Failed to build region");

    assert_eq!(graph.nodes_of_kind(ResourceKind::AvailabilitySet).len(), 1);
    let vms = graph.nodes_of_kind(ResourceKind::VM);
    assert_eq!(vms.len(), 3);
    for vm in vms {
        assert!(graph.dependencies_of(&vm.name).contains(&"vmFood2-avset"));
    }
}

#[test]
fn test_scenario_c_capacity_exceeded() {
    let root = Ipv4::new("10.0.0.0/22").unwrap();
    let requests: Vec<SubnetRequest> = (0..9)
        .map(|i| SubnetRequest::workload(&format!("Segment{i}"), 25))
        .collect();

    // A /22 holds exactly eight /25 blocks.
    let plan = plan_addresses(root, &requests[..8]).expect("Eight /25 must fit");
    assert_eq!(plan.allocated(), 1024);

    match plan_addresses(root, &requests).unwrap_err() {
        TopologyError::CapacityExceeded { segment, .. } => assert_eq!(segment, "Segment8"),
        e => panic!("Unexpected error {e}"),
    }
}

#[test]
fn test_scenario_d_duplicate_peering() {
    let mut spec = marketplace_spec();
    spec.peerings.push(PeeringRequest::new("eus", "cus"));
    match build_topology(&spec).unwrap_err() {
        TopologyError::DuplicatePeering(name) => assert_eq!(name, "peer-eus-cus"),
        e => panic!("Unexpected error {e}"),
    }
}

#[test]
fn test_scenario_e_tracked_nics() {
    let mut segment = SegmentSpec::new("Food", "vmFood", 2);
    segment.load_balanced = true;
    let region = eus_region(segment);

    let plan = plan_region(&region).unwrap();
    let mut graph = GraphBuilder::new(&region.id, &region.location);
    let lookup = build_network(&region, &plan, &mut graph).unwrap();
    let fleet = build_fleet(&region, &region.segments[0], &lookup, &mut graph).unwrap();

    assert_eq!(fleet.tracked.len(), 2);
    assert_eq!(graph.name_of(fleet.tracked.get(0).unwrap()).unwrap(), "vmFood0-nic");
    assert_eq!(graph.name_of(fleet.tracked.get(1).unwrap()).unwrap(), "vmFood1-nic");
    assert!(matches!(
        fleet.tracked.get(2).unwrap_err(),
        TopologyError::InsufficientTrackedNics {
            requested: 2,
            available: 2,
            ..
        }
    ));
}

#[test]
fn test_marketplace_subnets_disjoint_and_contained() {
    for region in marketplace_spec().regions {
        let plan = plan_region(&region).expect("Failed to plan region");
        plan.verify().expect("Plan overlaps or leaves the root block");
        for subnet in plan.subnets() {
            assert!(region.address_space.contains(&subnet.cidr));
        }
    }
}

#[test]
fn test_marketplace_graph_is_anchored_dag() {
    let graph = marketplace();
    assert_eq!(graph.regions().len(), 2);

    for region in graph.regions() {
        let order = region.topological_order();
        assert_eq!(order.len(), region.node_count());
        let position: Vec<usize> = {
            let mut pos = vec![0; order.len()];
            for (i, h) in order.iter().enumerate() {
                pos[h.index()] = i;
            }
            pos
        };
        for edge in region.edges() {
            assert!(position[edge.from.index()] < position[edge.to.index()]);
        }

        // The VNet is the only root.
        for node in region.nodes() {
            let deps = region.dependencies_of(&node.name);
            if node.kind == ResourceKind::VNet {
                assert!(deps.is_empty());
            } else {
                assert!(!deps.is_empty(), "{} has no dependency", node.name);
            }
        }
    }
}

#[test]
fn test_marketplace_security_rules() {
    let graph = marketplace();
    for region in graph.regions() {
        let nsg = region
            .find(&format!("nsg-{}", region.region()))
            .expect("Region has no NSG");
        assert!(nsg.protected);
        let rules: Vec<SecurityRule> =
            serde_json::from_value(nsg.get("security_rules").unwrap().clone())
                .expect("Failed to read rules");

        let priorities: HashSet<u32> = rules.iter().map(|r| r.priority).collect();
        assert_eq!(priorities.len(), rules.len());
        assert_eq!(rules[0].name, "FoodMerchantTraffic");
        assert_eq!(rules[0].priority, 200);
        assert_eq!(rules[1].name, "MerchantTraffic");
        assert_eq!(rules[1].priority, 210);
        assert_eq!(rules[1].destination_port_ranges, vec!["80"]);
    }

    let cus = graph.region("cus").unwrap();
    assert_eq!(cus.nodes_of_kind(ResourceKind::NSGAssociation).len(), 5);
    assert!(cus.find("nsg-cus-AzureFirewallSubnet").is_none());
}

#[test]
fn test_marketplace_routing_and_load_balancer() {
    let graph = marketplace();

    let cus = graph.region("cus").unwrap();
    let routes = cus.find("cus-rt").unwrap().get("routes").unwrap();
    assert_eq!(routes[0]["next_hop_in_ip_address"], "10.0.2.132");
    assert!(graph.region("eus").unwrap().find("eus-fw").is_none());

    let eus = graph.region("eus").unwrap();
    assert_eq!(
        eus.dependencies_of("foodLb-pool"),
        vec!["foodLb", "vmFood20-nic", "vmFood21-nic"]
    );
    assert_eq!(
        eus.find("AppGatewaySubnet")
            .unwrap()
            .get("address_prefixes")
            .unwrap()[0],
        "10.1.2.128/25"
    );
    assert_eq!(
        eus.find("vmGarden20").unwrap().get("boot_diagnostics").unwrap()["storage_uri"],
        "https://stgbootdiageus.blob.core.windows.net/"
    );
}

#[test]
fn test_marketplace_peering_pair() {
    let graph = marketplace();
    assert_eq!(graph.peerings().len(), 2);
    let forward = graph.peering("peer-eus-cus").unwrap();
    let reverse = graph.peering("peer-cus-eus").unwrap();
    assert_eq!(forward.source.vnet, reverse.remote.vnet);
    assert_eq!(forward.remote.vnet, reverse.source.vnet);
    for link in [forward, reverse] {
        assert_eq!(link.node.get("allow_virtual_network_access").unwrap(), true);
        assert_eq!(link.node.get("allow_forwarded_traffic").unwrap(), false);
    }
}

#[test]
fn test_rebuild_is_byte_identical() {
    let first = to_json(&marketplace()).unwrap();
    let second = to_json(&marketplace()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_dry_run_hand_off() {
    let graph = marketplace();
    let mut engine = DryRunEngine::new();
    let result = hand_off(&graph, &mut engine).expect("Hand-off failed");

    assert!(result.is_success());
    assert_eq!(result.succeeded.len(), graph.node_count());
    assert_eq!(engine.declared().len(), graph.node_count());
    assert_eq!(engine.declared()[0].name, "vnet-cus");
    let last = &engine.declared()[engine.declared().len() - 1];
    assert_eq!(last.kind, ResourceKind::Peering);
}
