//! Planned subnet model.

use super::Ipv4;
use serde::{Deserialize, Serialize};

/// What a subnet is for. Only workload subnets take NSG and route-table associations.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubnetPurpose {
    Workload,
    Firewall,
    Gateway,
    AppGateway,
}

impl SubnetPurpose {
    /// Reserved subnets rely on routing-level isolation instead of an NSG.
    pub fn is_reserved(&self) -> bool {
        *self != SubnetPurpose::Workload
    }
}

/// A subnet carved out of the region's root block by the address planner.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlannedSubnet {
    /// Name of the subnet.
    pub name: String,
    /// CIDR block of the subnet.
    pub cidr: Ipv4,
    pub purpose: SubnetPurpose,
}
