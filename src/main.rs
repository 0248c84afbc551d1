use azure_topology_planner::config;
use azure_topology_planner::output::{
    graph_print, print_apply_result, print_summary, write_graph_json,
};
use azure_topology_planner::{build_topology, hand_off, read_topology_spec, DryRunEngine};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    log4rs::init_file(config::LOG_CONFIG_FILE, Default::default())
        .map_err(|e| format!("Error initializing log4rs: {e}"))?;
    dotenv::dotenv().ok();
    //
    log::info!("#Start main()");

    let spec_file = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(config::ENV_TOPOLOGY_SPEC).ok())
        .unwrap_or_else(|| config::DEFAULT_SPEC_FILE.to_string());
    let output_dir = std::env::var(config::ENV_OUTPUT_DIR).unwrap_or_else(|_| ".".to_string());

    let spec = read_topology_spec(&spec_file)?;
    let graph = build_topology(&spec)?;

    graph_print(&graph);
    print_summary(&graph);

    let file = write_graph_json(&graph, &output_dir)?;
    log::info!("Graph written to {}", file.display());

    let mut engine = DryRunEngine::new();
    let result = hand_off(&graph, &mut engine)?;
    print_apply_result(&result);

    log::info!("#End main()");
    Ok(())
}
