//! Compiles a planner document into an experiment document.
//!
//! ```text
//! plan_experiment [planner.yaml] [enclave-name] [output.yaml]
//! ```
//!
//! Without arguments the bundled `data/planner.yaml` is planned and the
//! result printed to stdout.

use std::sync::Arc;

use anyhow::Context;
use chaosnet_core::ClientDefaults;
use chaosnet_planner::{Planner, PlannerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

const BUNDLED_PLANNER: &str = include_str!("data/planner.yaml");
const DEFAULT_ENCLAVE: &str = "chaos-devnet";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match args.first() {
        Some(path) => PlannerConfig::from_yaml_file(path)
            .with_context(|| format!("reading planner document {}", path))?,
        None => PlannerConfig::from_yaml_str(BUNDLED_PLANNER).context("parsing the bundled planner document")?,
    };
    let enclave = args.get(1).map(String::as_str).unwrap_or(DEFAULT_ENCLAVE);

    let mut planner = Planner::new(config, Arc::new(ClientDefaults::standard()));
    let plan = planner.build_plan().context("planning the experiment")?;
    info!(
        nodes = plan.topology.len(),
        tests = plan.tests.len(),
        bootnode = ?plan.bootnode,
        "Plan ready"
    );

    let document = plan.to_experiment_config(enclave).to_yaml()?;
    match args.get(2) {
        Some(output) => {
            std::fs::write(output, document).with_context(|| format!("writing {}", output))?;
            info!("Experiment document written to {}", output);
        }
        None => print!("{}", document),
    }
    Ok(())
}
