//! Resource dependency graphs.
//!
//! - [`builder`] - append-only per-region builder with `declare`/`link` and sealing
//! - [`region`] - the immutable region graph and the multi-region resource graph

mod builder;
mod region;

pub use builder::{validate_name, GraphBuilder};
pub use region::{PeeringLink, RegionGraph, ResourceGraph, VnetRef};
