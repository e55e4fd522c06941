//! Plans an experiment and runs it against the in-memory platforms.
//!
//! ```text
//! simulated_run [planner.yaml] [artifact-dir]
//! ```
//!
//! Waits and grace periods from the document are dropped so the run
//! finishes immediately. Artifacts go to `test-artifacts.json` in the given
//! directory, or the current one.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chaosnet_artifacts::JsonFileArtifactSink;
use chaosnet_core::{ClientDefaults, PodPhase};
use chaosnet_enclave::EnclaveConfig;
use chaosnet_planner::{Planner, PlannerConfig};
use chaosnet_sequencer::{ExperimentService, SequencerConfig};
use chaosnet_testing::{SimulatedDeployment, SubmissionScript};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const BUNDLED_PLANNER: &str = include_str!("data/planner.yaml");
const ENCLAVE: &str = "simulated-devnet";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match args.first() {
        Some(path) => PlannerConfig::from_yaml_file(path)
            .with_context(|| format!("reading planner document {}", path))?,
        None => PlannerConfig::from_yaml_str(BUNDLED_PLANNER)?,
    };
    let artifact_dir = args.get(1).map(String::as_str).unwrap_or(".");

    let plan = Planner::new(config, Arc::new(ClientDefaults::standard()))
        .build_plan()
        .context("planning the experiment")?;
    let mut document = plan.to_experiment_config(ENCLAVE);
    document.wait_before_injection = None;
    for test in &mut document.tests {
        test.health.grace_period = None;
    }

    let deployment = SimulatedDeployment::new();
    // once the queued scripts run out, submitted faults fail their pods
    for _ in 1..document.tests.len() {
        deployment.faults.script(SubmissionScript::pending_for(2));
    }
    deployment
        .faults
        .set_default_script(SubmissionScript::completes().with_pod_phase(PodPhase::Failed));

    let sink = JsonFileArtifactSink::new(artifact_dir).await?;
    let mut collaborators = deployment.collaborators();
    collaborators.sink = Arc::new(sink.clone());

    let service = ExperimentService::new(document, collaborators)
        .with_enclave_config(EnclaveConfig::new(ENCLAVE).with_settle_delay(Duration::ZERO))
        .with_sequencer_config(SequencerConfig::default().with_poll_interval(Duration::from_millis(10)));

    let cancel = service.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling the experiment");
            cancel.cancel();
        }
    });

    let report = service.start_experiment().await?;
    for artifact in &report.artifacts {
        let failed: Vec<&str> = artifact.failed_pods().map(|o| o.pod_name.as_str()).collect();
        println!(
            "{:<60} {:<4} under test: {:>2}  unhealthy: {}",
            artifact.test_name,
            if artifact.passed { "PASS" } else { "FAIL" },
            artifact.pods_under_test.len(),
            if failed.is_empty() { "-".to_string() } else { failed.join(", ") }
        );
    }
    info!(
        run_id = %report.run_id,
        executed = report.tests_executed(),
        planned = report.tests_planned,
        stopped_early = report.stopped_early,
        "Artifacts written to {}",
        sink.path().display()
    );
    Ok(())
}
