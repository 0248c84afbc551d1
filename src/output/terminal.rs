//! Terminal output utilities.
//!
//! Provides formatting helpers and a coloured per-region summary.

use crate::engine::ApplyResult;
use crate::graph::{RegionGraph, ResourceGraph};
use crate::models::ResourceKind;
use colored::Colorize;

/// Format a value as a quoted, right-aligned field.
///
/// # Arguments
/// * `value` - The value to format
/// * `width` - The minimum width of the field
///
/// # Returns
/// A quoted, right-aligned string
pub fn format_field<T: ToString>(value: T, width: usize) -> String {
    let value_str = value.to_string();
    let quoted = format!("\"{value_str}\"");
    let quoted_len = quoted.len();

    if quoted_len >= width {
        quoted
    } else {
        format!("{quoted:>width$}")
    }
}

/// Node counts of one region, e.g. `"vnet-cus" "10.0.0.0/22" "6_subnets" "10_vms"`.
pub fn region_summary(region: &RegionGraph) -> String {
    let count = |kind| region.nodes_of_kind(kind).len();
    let address_space = region
        .vnet_node()
        .get("address_spaces")
        .and_then(|v| v.get(0))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    format!(
        "{vnet} {cidr} {subnets} {vms} {lbs} {nodes} {protected}",
        vnet = format_field(&region.vnet_node().name, 12),
        cidr = format_field(address_space, 16),
        subnets = format_field(format!("{}_subnets", count(ResourceKind::Subnet)), 13),
        vms = format_field(format!("{}_vms", count(ResourceKind::VM)), 9),
        lbs = format_field(format!("{}_lbs", count(ResourceKind::LoadBalancer)), 8),
        nodes = format_field(format!("{}_nodes", region.node_count()), 11),
        protected = format_field(format!("{}_protected", region.protected_count()), 15),
    )
}

pub fn print_summary(graph: &ResourceGraph) {
    for region in graph.regions() {
        println!(
            "#{}# {} {}",
            "REGION".on_blue(),
            region.region().bold(),
            region_summary(region)
        );
    }
    for peering in graph.peerings() {
        println!(
            "#{}# {} {} -> {}",
            "PEER".on_green(),
            peering.name().bold(),
            peering.source.vnet,
            peering.remote.vnet
        );
    }
}

pub fn print_apply_result(result: &ApplyResult) {
    let status = if result.is_success() {
        "OK".on_green()
    } else {
        "FAILED".on_red()
    };
    println!(
        "#{status}# dry run: {} planned, {} failed",
        result.succeeded.len(),
        result.failed.len()
    );
    for failed in &result.failed {
        println!(
            "  {} {}",
            failed.node.red(),
            failed.error.as_deref().unwrap_or_default()
        );
    }
}
