//! Output for built topologies.
//!
//! - [`json`] - dated JSON export with edges by name
//! - [`table`] - CSV-style node table
//! - [`terminal`] - terminal output with colors

mod json;
mod table;
mod terminal;

pub use json::{graph_document, graph_file_name, to_json, write_graph_json, GraphDocument};
pub use table::{graph_print, peering_rows, region_rows, NodePrintRow};
pub use terminal::{format_field, print_apply_result, print_summary, region_summary};
