//! Address planning.
//!
//! Partitions a region's root block into disjoint subnets, one block per request,
//! walking the address space in request order.

use crate::config;
use crate::error::{Result, TopologyError};
use crate::models::{block_size, Ipv4, PlannedSubnet, RegionSpec, SubnetPurpose, MAX_LENGTH};
use itertools::Itertools;
use std::collections::HashSet;
use std::net::Ipv4Addr;

/// One subnet the planner has to place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetRequest {
    pub name: String,
    pub prefix_len: u8,
    pub purpose: SubnetPurpose,
}

impl SubnetRequest {
    pub fn workload(name: &str, prefix_len: u8) -> SubnetRequest {
        SubnetRequest {
            name: name.to_string(),
            prefix_len,
            purpose: SubnetPurpose::Workload,
        }
    }
}

/// Result of planning a region: subnets in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressPlan {
    root: Ipv4,
    subnets: Vec<PlannedSubnet>,
}

impl AddressPlan {
    pub fn root(&self) -> Ipv4 {
        self.root
    }

    pub fn subnets(&self) -> &[PlannedSubnet] {
        &self.subnets
    }

    pub fn get(&self, name: &str) -> Option<&PlannedSubnet> {
        self.subnets.iter().find(|s| s.name == name)
    }

    /// CIDR planned for `name`, or `UnknownSubnetReference`.
    pub fn cidr(&self, name: &str) -> Result<Ipv4> {
        self.get(name)
            .map(|s| s.cidr)
            .ok_or_else(|| TopologyError::UnknownSubnetReference(name.to_string()))
    }

    /// Addresses handed out, alignment gaps excluded.
    pub fn allocated(&self) -> u64 {
        self.subnets.iter().map(|s| s.cidr.size()).sum()
    }

    /// Check the plan's invariants: every subnet inside the root, no two overlapping.
    pub fn verify(&self) -> Result<()> {
        if let Some(outside) = self.subnets.iter().find(|s| !self.root.contains(&s.cidr)) {
            return Err(TopologyError::InvalidCidr(format!(
                "{} ({}) lies outside {}",
                outside.name, outside.cidr, self.root
            )));
        }
        if let Some((a, b)) = self
            .subnets
            .iter()
            .tuple_combinations()
            .find(|(a, b)| a.cidr.overlaps(&b.cidr))
        {
            return Err(TopologyError::InvalidCidr(format!(
                "{} ({}) overlaps {} ({})",
                a.name, a.cidr, b.name, b.cidr
            )));
        }
        Ok(())
    }
}

/// The subnet requests of a region: segments in declared order, then the reserved
/// subnets its feature flags ask for.
pub fn subnet_requests(region: &RegionSpec) -> Vec<SubnetRequest> {
    let mut requests: Vec<SubnetRequest> = region
        .segments
        .iter()
        .map(|s| SubnetRequest::workload(&s.name, s.prefix_len.unwrap_or(region.subnet_prefix)))
        .collect();

    let reserved = [
        (
            region.features.firewall_subnet,
            config::FIREWALL_SUBNET_NAME,
            SubnetPurpose::Firewall,
        ),
        (
            region.features.gateway_subnet,
            config::GATEWAY_SUBNET_NAME,
            SubnetPurpose::Gateway,
        ),
        (
            region.features.app_gateway_subnet,
            config::APP_GATEWAY_SUBNET_NAME,
            SubnetPurpose::AppGateway,
        ),
    ];
    requests.extend(
        reserved
            .into_iter()
            .filter(|(enabled, _, _)| *enabled)
            .map(|(_, name, purpose)| SubnetRequest {
                name: name.to_string(),
                prefix_len: region.subnet_prefix,
                purpose,
            }),
    );
    requests
}

/// Plan every subnet of a region inside its root block.
pub fn plan_region(region: &RegionSpec) -> Result<AddressPlan> {
    plan_addresses(region.address_space, &subnet_requests(region))
}

/// Assign each request the next free block of its size, in list order.
///
/// The cursor is aligned up to each block's size; space skipped by alignment is not
/// revisited, so identical input always gives identical output.
pub fn plan_addresses(root: Ipv4, requests: &[SubnetRequest]) -> Result<AddressPlan> {
    root.require_aligned()?;

    let root_start = u32::from(root.lo()) as u64;
    let root_end = root_start + root.size();
    let mut cursor = root_start;
    let mut seen = HashSet::new();
    let mut subnets = Vec::with_capacity(requests.len());

    for request in requests {
        if !seen.insert(request.name.as_str()) {
            return Err(TopologyError::DuplicateResourceName(request.name.clone()));
        }
        check_prefix(root, request)?;

        let size = block_size(request.prefix_len)?;
        let start = cursor.div_ceil(size) * size;
        let end = start + size;
        if end > root_end {
            return Err(TopologyError::CapacityExceeded {
                segment: request.name.clone(),
                prefix_len: request.prefix_len,
                root: root.to_string(),
            });
        }

        let cidr = Ipv4::from_network(Ipv4Addr::from(start as u32), request.prefix_len)?;
        log::debug!("planned {} -> {cidr} ({:?})", request.name, request.purpose);
        subnets.push(PlannedSubnet {
            name: request.name.clone(),
            cidr,
            purpose: request.purpose,
        });
        cursor = end;
    }

    let plan = AddressPlan { root, subnets };
    plan.verify()?;
    log::info!(
        "Planned {} subnets in {root}: {}/{} addresses allocated",
        plan.subnets.len(),
        plan.allocated(),
        root.size()
    );
    Ok(plan)
}

fn check_prefix(root: Ipv4, request: &SubnetRequest) -> Result<()> {
    let reason = if request.prefix_len > MAX_LENGTH {
        Some(format!("longer than /{MAX_LENGTH}"))
    } else if request.prefix_len < root.mask {
        Some(format!("larger than the /{} root block", root.mask))
    } else if request.prefix_len > config::MAX_SUBNET_PREFIX {
        Some(format!(
            "smaller than the /{} Azure minimum",
            config::MAX_SUBNET_PREFIX
        ))
    } else {
        None
    };
    match reason {
        Some(reason) => Err(TopologyError::InvalidPrefix {
            segment: request.name.clone(),
            prefix_len: request.prefix_len,
            root: root.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
