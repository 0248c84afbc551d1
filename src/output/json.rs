//! JSON export of a built topology.
//!
//! Handles are meaningless outside one build, so the export names both ends of
//! every edge and lists each region's creation order by name.

use crate::error::Result;
use crate::graph::{RegionGraph, ResourceGraph};
use crate::models::{NodeHandle, ResourceNode};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize, Debug)]
pub struct GraphDocument<'a> {
    pub regions: Vec<RegionDocument<'a>>,
    pub peerings: Vec<PeeringDocument<'a>>,
}

#[derive(Serialize, Debug)]
pub struct RegionDocument<'a> {
    pub region: &'a str,
    pub location: &'a str,
    pub vnet: &'a str,
    pub order: Vec<&'a str>,
    pub nodes: Vec<&'a ResourceNode>,
    pub edges: Vec<EdgeDocument<'a>>,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct EdgeDocument<'a> {
    pub from: &'a str,
    pub to: &'a str,
}

#[derive(Serialize, Debug)]
pub struct PeeringDocument<'a> {
    pub node: &'a ResourceNode,
    pub source_region: &'a str,
    pub source_vnet: &'a str,
    pub remote_region: &'a str,
    pub remote_vnet: &'a str,
}

fn region_document(region: &RegionGraph) -> RegionDocument<'_> {
    let name = |h: NodeHandle| region.node(h).map_or("", |n| n.name.as_str());
    RegionDocument {
        region: region.region(),
        location: region.location(),
        vnet: region.vnet_node().name.as_str(),
        order: region.topological_order().iter().map(|h| name(*h)).collect(),
        nodes: region.nodes().collect(),
        edges: region
            .edges()
            .map(|e| EdgeDocument {
                from: name(e.from),
                to: name(e.to),
            })
            .collect(),
    }
}

pub fn graph_document(graph: &ResourceGraph) -> GraphDocument<'_> {
    GraphDocument {
        regions: graph.regions().iter().map(region_document).collect(),
        peerings: graph
            .peerings()
            .iter()
            .map(|p| PeeringDocument {
                node: &p.node,
                source_region: &p.source.region,
                source_vnet: &p.source.vnet,
                remote_region: &p.remote.region,
                remote_vnet: &p.remote.vnet,
            })
            .collect(),
    }
}

/// Pretty-printed export. Identical input gives byte-identical output.
pub fn to_json(graph: &ResourceGraph) -> Result<String> {
    Ok(serde_json::to_string_pretty(&graph_document(graph))?)
}

/// Dated export file name, same scheme as the subnet cache files.
pub fn graph_file_name() -> String {
    let now = chrono::Utc::now().with_timezone(&chrono_tz::Pacific::Auckland);
    format!("topology_graph_{}.json", now.format("%Y-%m-%d"))
}

/// Write the export into `dir` and return the file written.
pub fn write_graph_json(graph: &ResourceGraph, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let file = dir.as_ref().join(graph_file_name());
    let json = to_json(graph)?;
    log::info!("Writing graph to {} ({} bytes)", file.display(), json.len());
    std::fs::write(&file, json)?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> ResourceGraph {
        let spec = crate::read_topology_spec("src/tests/test_data/marketplace_topology.json")
            .expect("Error reading topology spec");
        crate::build_topology(&spec).expect("Error building topology")
    }

    #[test]
    fn test_edges_exported_by_name() {
        let graph = graph();
        let doc = graph_document(&graph);
        let cus = &doc.regions[0];
        assert_eq!(cus.vnet, "vnet-cus");
        assert_eq!(cus.order[0], "vnet-cus");
        assert!(cus.edges.contains(&EdgeDocument {
            from: "vnet-cus",
            to: "Suppliers"
        }));
        assert_eq!(doc.peerings.len(), 2);
        assert_eq!(doc.peerings[0].source_vnet, "vnet-eus");
    }

    #[test]
    fn test_export_is_deterministic() {
        assert_eq!(to_json(&graph()).unwrap(), to_json(&graph()).unwrap());
    }

    #[test]
    fn test_graph_file_name() {
        let name = graph_file_name();
        assert!(name.starts_with("topology_graph_"));
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), "topology_graph_2024-01-01.json".len());
    }
}
