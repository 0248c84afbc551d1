//! CSV-style node table for a built topology.

use crate::graph::{PeeringLink, RegionGraph, ResourceGraph};
use crate::models::{ResourceKind, ResourceNode};
use colored::Colorize;

use super::terminal::format_field;

/// One printed row per node, in creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePrintRow {
    pub j: usize,
    pub region: String,
    pub kind: String,
    pub name: String,
    pub detail: String,
    pub depends_on: String,
    pub protected: bool,
}

/// The attribute most worth seeing for each kind.
fn node_detail(node: &ResourceNode) -> String {
    let key = match node.kind {
        ResourceKind::VNet => "address_spaces",
        ResourceKind::Subnet => "address_prefixes",
        ResourceKind::VM => "vm_size",
        ResourceKind::NSG => "security_rules",
        ResourceKind::BackendPool => "members",
        ResourceKind::RouteTable => "routes",
        ResourceKind::Peering => "remote_virtual_network",
        _ => "location",
    };
    match node.get(key) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(items)) if key == "security_rules" => {
            format!("{}_rules", items.len())
        }
        Some(serde_json::Value::Array(items)) if key == "routes" => {
            format!("{}_routes", items.len())
        }
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().unwrap_or_default())
            .collect::<Vec<_>>()
            .join(" "),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Rows for one region, numbered from `start`.
pub fn region_rows(region: &RegionGraph, start: usize) -> Vec<NodePrintRow> {
    region
        .topological_order()
        .iter()
        .enumerate()
        .filter_map(|(i, h)| region.node(*h).map(|n| (i, n)))
        .map(|(i, node)| NodePrintRow {
            j: start + i,
            region: region.region().to_string(),
            kind: node.kind.to_string(),
            name: node.name.clone(),
            detail: node_detail(node),
            depends_on: region.dependencies_of(&node.name).join(" "),
            protected: node.protected,
        })
        .collect()
}

/// Rows for the peering links, numbered from `start`. Each row sits in its source
/// region and depends on both VNets it joins.
pub fn peering_rows(peerings: &[PeeringLink], start: usize) -> Vec<NodePrintRow> {
    peerings
        .iter()
        .enumerate()
        .map(|(i, peering)| NodePrintRow {
            j: start + i,
            region: peering.source.region.clone(),
            kind: peering.node.kind.to_string(),
            name: peering.name().to_string(),
            detail: format!("{}/{}", peering.remote.region, peering.remote.vnet),
            depends_on: format!(
                "{}/{} {}/{}",
                peering.source.region,
                peering.source.vnet,
                peering.remote.region,
                peering.remote.vnet
            ),
            protected: peering.node.protected,
        })
        .collect()
}

/// Print every region's nodes, then the peering links, as CSV to stdout.
pub fn graph_print(graph: &ResourceGraph) {
    log::info!("#Start graph_print() nodes={}", graph.node_count());

    println!(
        "{},{},{},{},{},{},{}",
        format_field("cnt", 6),
        format_field("region", 8),
        format_field("kind", 24),
        format_field("name", 24),
        format_field("detail", 18),
        format_field("depends_on", 30),
        format_field("protected", 11),
    );
    let mut rows = Vec::new();
    for region in graph.regions() {
        let start = rows.len();
        rows.extend(region_rows(region, start));
    }
    let start = rows.len();
    rows.extend(peering_rows(graph.peerings(), start));
    for row in &rows {
        print_csv_row(row);
    }
}

fn print_csv_row(row: &NodePrintRow) {
    let protected = if row.protected {
        "protected".yellow()
    } else {
        "".normal()
    };
    println!(
        r#"{j},{region},{kind},{name},{detail},{depends_on},{protected}"#,
        j = format_field(row.j, 6),
        region = format_field(&row.region, 8),
        kind = format_field(&row.kind, 24),
        name = format_field(&row.name, 24),
        detail = format_field(&row.detail, 18),
        depends_on = format_field(&row.depends_on, 30),
    );
}
