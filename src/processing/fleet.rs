//! Segment VM fleets.
//!
//! Expands a segment's VM count into NIC and VM nodes, with an optional shared
//! availability set. NICs of load-balanced segments come back as [`TrackedNics`]
//! instead of being pushed into shared state.

use super::SubnetLookup;
use crate::config;
use crate::error::{Result, TopologyError};
use crate::graph::GraphBuilder;
use crate::models::{NodeHandle, RegionSpec, ResourceKind, ResourceNode, SegmentSpec};
use serde_json::json;
use std::collections::BTreeMap;

/// NICs recorded for backend-pool membership, in creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedNics {
    segment: String,
    nics: Vec<NodeHandle>,
}

impl TrackedNics {
    pub fn empty(segment: &str) -> TrackedNics {
        TrackedNics {
            segment: segment.to_string(),
            nics: Vec::new(),
        }
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn len(&self) -> usize {
        self.nics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nics.is_empty()
    }

    pub fn as_slice(&self) -> &[NodeHandle] {
        &self.nics
    }

    /// The `index`-th tracked NIC. Asking past the end is an error, never a skip.
    pub fn get(&self, index: usize) -> Result<NodeHandle> {
        self.nics
            .get(index)
            .copied()
            .ok_or_else(|| TopologyError::InsufficientTrackedNics {
                segment: self.segment.clone(),
                requested: index,
                available: self.nics.len(),
            })
    }

    /// The first `count` tracked NICs.
    pub fn first(&self, count: usize) -> Result<&[NodeHandle]> {
        if count > self.nics.len() {
            return Err(TopologyError::InsufficientTrackedNics {
                segment: self.segment.clone(),
                requested: count - 1,
                available: self.nics.len(),
            });
        }
        Ok(&self.nics[..count])
    }
}

/// Tracked NICs of every segment of one region, keyed by segment name.
#[derive(Debug, Default)]
pub struct TrackedNicRegistry {
    segments: BTreeMap<String, TrackedNics>,
}

impl TrackedNicRegistry {
    pub fn new() -> TrackedNicRegistry {
        TrackedNicRegistry::default()
    }

    pub fn insert(&mut self, tracked: TrackedNics) {
        self.segments.insert(tracked.segment.clone(), tracked);
    }

    /// Tracked NICs of `segment`; an empty list when it tracked none.
    pub fn segment(&self, segment: &str) -> TrackedNics {
        self.segments
            .get(segment)
            .cloned()
            .unwrap_or_else(|| TrackedNics::empty(segment))
    }
}

/// Nodes declared for one segment.
#[derive(Debug, Clone)]
pub struct Fleet {
    pub segment: String,
    pub availability_set: Option<NodeHandle>,
    pub nics: Vec<NodeHandle>,
    pub vms: Vec<NodeHandle>,
    pub tracked: TrackedNics,
}

/// Declare the availability set, NICs and VMs of one segment.
pub fn build_fleet(
    region: &RegionSpec,
    segment: &SegmentSpec,
    lookup: &SubnetLookup,
    graph: &mut GraphBuilder,
) -> Result<Fleet> {
    let subnet = lookup.get(&segment.name)?.handle;
    let resource_group = region.resource_group();
    let mut fleet = Fleet {
        segment: segment.name.clone(),
        availability_set: None,
        nics: Vec::with_capacity(segment.vm_count),
        vms: Vec::with_capacity(segment.vm_count),
        tracked: TrackedNics::empty(&segment.name),
    };

    if segment.vm_count == 0 {
        log::warn!("Segment {} has no VMs, nothing to build", segment.name);
        return Ok(fleet);
    }

    let availability_set = if segment.high_availability {
        let avset_name = format!("{}-avset", segment.vm_prefix);
        let node = ResourceNode::new(ResourceKind::AvailabilitySet, &avset_name)
            .attr("location", region.location.as_str())
            .attr("resource_group", resource_group.as_str())
            .attr("managed", true)
            .protect(segment.protected);
        Some((avset_name, graph.declare_after(node, &[subnet])?))
    } else {
        None
    };
    fleet.availability_set = availability_set.as_ref().map(|(_, h)| *h);

    for index in 0..segment.vm_count {
        let vm_name = format!("{}{index}", segment.vm_prefix);
        let nic_name = format!("{vm_name}-nic");

        let nic = ResourceNode::new(ResourceKind::NIC, &nic_name)
            .attr("location", region.location.as_str())
            .attr("resource_group", resource_group.as_str())
            .attr(
                "ip_configuration",
                json!({
                    "name": config::NIC_IP_CONFIG_NAME,
                    "primary": true,
                    "private_ip_address_allocation": "Dynamic",
                    "private_ip_address_version": "IPv4",
                    "subnet": segment.name,
                }),
            )
            .protect(segment.protected);
        let nic = graph.declare_after(nic, &[subnet])?;

        let mut vm = vm_node(region, &vm_name, &nic_name).protect(segment.protected);
        let mut dependencies = vec![nic];
        if let Some((avset_name, avset)) = &availability_set {
            vm = vm.attr("availability_set", avset_name.as_str());
            dependencies.push(*avset);
        }
        let vm = graph.declare_after(vm, &dependencies)?;

        fleet.nics.push(nic);
        fleet.vms.push(vm);
    }

    if segment.load_balanced {
        fleet.tracked.nics = fleet.nics.clone();
    }

    log::info!(
        "Segment {}: {} VMs{}{}",
        segment.name,
        fleet.vms.len(),
        if segment.high_availability { ", availability set" } else { "" },
        if segment.load_balanced { ", NICs tracked" } else { "" },
    );
    Ok(fleet)
}

/// VM node with the fleet-wide defaults.
fn vm_node(region: &RegionSpec, vm_name: &str, nic_name: &str) -> ResourceNode {
    let mut vm = ResourceNode::new(ResourceKind::VM, vm_name)
        .attr("location", region.location.as_str())
        .attr("resource_group", region.resource_group())
        .attr("vm_size", config::VM_SIZE)
        .attr("network_interfaces", json!([nic_name]))
        .attr("computer_name", vm_name)
        .attr(
            "os_profile_linux_config",
            json!({ "disable_password_authentication": false }),
        )
        .attr(
            "storage_image_reference",
            json!({
                "publisher": config::IMAGE_PUBLISHER,
                "offer": config::IMAGE_OFFER,
                "sku": config::IMAGE_SKU,
                "version": config::IMAGE_VERSION,
            }),
        )
        .attr(
            "storage_os_disk",
            json!({
                "name": format!("{vm_name}-osdisk"),
                "caching": config::OS_DISK_CACHING,
                "create_option": "FromImage",
                "os_type": config::OS_TYPE,
                "disk_size_gb": config::OS_DISK_SIZE_GB,
                "managed_disk_type": config::OS_DISK_TYPE,
            }),
        );
    if let Some(endpoint) = &region.diagnostics_endpoint {
        vm = vm.attr(
            "boot_diagnostics",
            json!({ "enabled": true, "storage_uri": endpoint }),
        );
    }
    vm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{build_network, plan_region};

    fn region(segment: SegmentSpec, diagnostics: Option<&str>) -> RegionSpec {
        let mut region: RegionSpec = serde_json::from_str(
            r#"{
                "id": "eus",
                "location": "EastUS2",
                "address_space": "10.1.0.0/22",
                "segments": []
            }"#,
        )
        .unwrap();
        region.segments.push(segment);
        region.diagnostics_endpoint = diagnostics.map(str::to_string);
        region
    }

    fn build(region: &RegionSpec) -> (GraphBuilder, Fleet) {
        let plan = plan_region(region).unwrap();
        let mut graph = GraphBuilder::new(&region.id, &region.location);
        let lookup = build_network(region, &plan, &mut graph).unwrap();
        let fleet = build_fleet(region, &region.segments[0], &lookup, &mut graph).unwrap();
        (graph, fleet)
    }

    #[test]
    fn test_high_availability_fleet() {
        let mut segment = SegmentSpec::new("Food2", "vmFood2", 3);
        segment.high_availability = true;
        let region = region(segment, None);
        let (graph, fleet) = build(&region);
        assert!(fleet.availability_set.is_some());
        assert_eq!(fleet.vms.len(), 3);

        let sealed = graph.seal().unwrap();
        assert_eq!(sealed.nodes_of_kind(ResourceKind::AvailabilitySet).len(), 1);
        assert_eq!(sealed.nodes_of_kind(ResourceKind::VM).len(), 3);
        for i in 0..3 {
            let vm = format!("vmFood2{i}");
            assert_eq!(
                sealed.dependencies_of(&vm),
                vec![format!("vmFood2{i}-nic").as_str(), "vmFood2-avset"]
            );
            assert_eq!(
                sealed.find(&vm).unwrap().get_str("availability_set"),
                Some("vmFood2-avset")
            );
        }
    }

    #[test]
    fn test_nics_depend_on_subnet_and_names_are_indexed() {
        let region = region(SegmentSpec::new("Suppliers2", "vmSupplier2", 2), None);
        let (graph, fleet) = build(&region);
        assert!(fleet.availability_set.is_none());
        let sealed = graph.seal().unwrap();
        assert_eq!(sealed.dependencies_of("vmSupplier20-nic"), vec!["Suppliers2"]);
        assert_eq!(sealed.dependencies_of("vmSupplier21"), vec!["vmSupplier21-nic"]);
        assert!(sealed.find("vmSupplier22").is_none());
    }

    #[test]
    fn test_zero_vms_is_noop() {
        let mut segment = SegmentSpec::new("Garden", "vmGarden", 0);
        segment.high_availability = true;
        segment.load_balanced = true;
        let region = region(segment, None);
        let (graph, fleet) = build(&region);
        assert!(fleet.vms.is_empty());
        assert!(fleet.availability_set.is_none());
        assert!(fleet.tracked.is_empty());
        // VNet and the one subnet only.
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_load_balanced_tracks_nics_in_order() {
        let mut segment = SegmentSpec::new("Food", "vmFood", 2);
        segment.load_balanced = true;
        let region = region(segment, None);
        let (graph, fleet) = build(&region);

        assert_eq!(fleet.tracked.len(), 2);
        assert_eq!(fleet.tracked.get(0).unwrap(), fleet.nics[0]);
        assert_eq!(fleet.tracked.get(1).unwrap(), fleet.nics[1]);
        assert_eq!(graph.name_of(fleet.tracked.get(0).unwrap()).unwrap(), "vmFood0-nic");
        match fleet.tracked.get(2).unwrap_err() {
            TopologyError::InsufficientTrackedNics {
                segment,
                requested,
                available,
            } => {
                assert_eq!(segment, "Food");
                assert_eq!(requested, 2);
                assert_eq!(available, 2);
            }
            e => panic!("unexpected error {e}"),
        }
        assert!(fleet.tracked.first(3).is_err());
        assert_eq!(fleet.tracked.first(2).unwrap().len(), 2);
    }

    #[test]
    fn test_untracked_segment_tracks_nothing() {
        let region = region(SegmentSpec::new("Clothing", "vmClothing", 1), None);
        let (_, fleet) = build(&region);
        assert!(fleet.tracked.is_empty());
        assert!(fleet.tracked.get(0).is_err());
    }

    #[test]
    fn test_vm_defaults_and_boot_diagnostics() {
        let mut segment = SegmentSpec::new("Farming", "vmFarming", 1);
        segment.protected = true;
        let region = region(segment, Some("https://stgbootdiag.blob.core.windows.net/"));
        let (graph, _) = build(&region);
        let sealed = graph.seal().unwrap();
        let vm = sealed.find("vmFarming0").unwrap();
        assert!(vm.protected);
        assert!(sealed.find("vmFarming0-nic").unwrap().protected);
        assert_eq!(vm.get_str("vm_size"), Some("Standard_B1ms"));
        assert_eq!(
            vm.get("os_profile_linux_config").unwrap()["disable_password_authentication"],
            false
        );
        assert_eq!(vm.get("storage_os_disk").unwrap()["managed_disk_type"], "Standard_LRS");
        assert_eq!(vm.get("storage_os_disk").unwrap()["name"], "vmFarming0-osdisk");
        assert_eq!(
            vm.get("boot_diagnostics").unwrap()["storage_uri"],
            "https://stgbootdiag.blob.core.windows.net/"
        );
    }

    #[test]
    fn test_no_boot_diagnostics_without_endpoint() {
        let region = region(SegmentSpec::new("Farming", "vmFarming", 1), None);
        let (graph, _) = build(&region);
        let vm = graph.node(graph.handle("vmFarming0").unwrap()).unwrap();
        assert!(vm.get("boot_diagnostics").is_none());
    }

    #[test]
    fn test_registry_returns_empty_for_untracked() {
        let mut registry = TrackedNicRegistry::new();
        registry.insert(TrackedNics {
            segment: "Food".to_string(),
            nics: vec![NodeHandle(3)],
        });
        assert_eq!(registry.segment("Food").len(), 1);
        assert!(registry.segment("Garden").is_empty());
    }
}
