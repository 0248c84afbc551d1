//! Topology file loading.

use crate::error::{Result, TopologyError};
use crate::models::TopologySpec;
use std::path::Path;

/// Read and parse a topology file.
///
/// Parse errors carry the JSON path of the offending value, e.g.
/// `regions[1].address_space`.
pub fn read_topology_spec(path: impl AsRef<Path>) -> Result<TopologySpec> {
    let path = path.as_ref();
    log::info!("Reading topology spec: {}", path.display());
    let json = std::fs::read_to_string(path)?;
    parse_topology_spec(&json, &path.display().to_string())
}

/// Parse topology JSON. `source` names the input in error messages.
pub fn parse_topology_spec(json: &str, source: &str) -> Result<TopologySpec> {
    let mut deserializer = serde_json::Deserializer::from_str(json);
    let spec: TopologySpec = serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        log::error!("Error parsing {source} at {}", e.path());
        TopologyError::Parse {
            file: source.to_string(),
            path: e.path().to_string(),
            message: e.inner().to_string(),
        }
    })?;
    log::debug!(
        "{source}: {} regions, {} peering requests",
        spec.regions.len(),
        spec.peerings.len()
    );
    Ok(spec)
}
