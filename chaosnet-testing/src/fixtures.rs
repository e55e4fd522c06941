//! Ready-made inputs and a wired set of fakes for scenario tests.

use std::sync::Arc;
use std::time::Duration;

use chaosnet_artifacts::InMemoryArtifactSink;
use chaosnet_core::fault::{NetworkLatencyFault, PodRestartFault};
use chaosnet_core::{
    ConsensusClientType, ExecutionClientType, ExpressionSelector, FaultSpec, GenesisParams, HealthCheckConfig,
    NetworkConfig, Participant, PlanStep, SuiteTest,
};
use chaosnet_enclave::EnclaveConfig;
use chaosnet_sequencer::{Collaborators, SequencerConfig};

use crate::cluster::InMemoryCluster;
use crate::fault_platform::ScriptedFaultPlatform;
use crate::orchestrator::InMemoryOrchestrator;

/// A planner document exercising every stage: three declared clients per
/// layer, validator sidecars, a fixed seed and two targeting dimensions.
pub const PLANNER_YAML: &str = r#"
execution:
  - type: geth
  - type: besu
  - type: nethermind
consensus:
  - type: lighthouse
    has_sidecar: true
  - type: teku
    has_sidecar: true
  - type: prysm
    has_sidecar: true
target_network_topology:
  target_as_percent_of_network: 0.5
network_params:
  num_validator_keys_per_node: 32
kurtosis_package: github.com/ethpandaops/ethereum-package
kubernetes_namespace: kt-chaosnet
seed: 7
fault_config:
  fault_type: NetworkLatency
  target_client: geth
  fault_targeting_dimensions:
    - MatchingNode
    - MatchingClient
  fault_attack_size_dimensions:
    - AttackOneMatching
    - AttackAllMatching
  fault_config_dimensions:
    - delay: 500ms
      jitter: 100ms
      correlation: 50
      duration: 30s
"#;

/// Installs a test-friendly subscriber once per test binary.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// One participant group per entry, in order.
pub fn network_config(groups: &[(ExecutionClientType, ConsensusClientType, usize)]) -> NetworkConfig {
    let participants = groups
        .iter()
        .map(|(el, cl, count)| Participant::new(*el, *cl).with_count(*count).with_separate_vc())
        .collect();
    let params = GenesisParams {
        num_validator_keys_per_node: 32,
        ..GenesisParams::default()
    };
    NetworkConfig::new(participants, params)
}

/// geth/teku, besu/lighthouse and nethermind/prysm, one node each.
pub fn three_node_network() -> NetworkConfig {
    network_config(&[
        (ExecutionClientType::Geth, ConsensusClientType::Teku, 1),
        (ExecutionClientType::Besu, ConsensusClientType::Lighthouse, 1),
        (ExecutionClientType::Nethermind, ConsensusClientType::Prysm, 1),
    ])
}

fn service_ids(pods: &[&str]) -> Vec<ExpressionSelector> {
    vec![ExpressionSelector::service_ids(
        pods.iter().map(|p| p.to_string()).collect(),
    )]
}

pub fn pod_restart(pods: &[&str]) -> FaultSpec {
    FaultSpec::PodRestart(PodRestartFault {
        selector: service_ids(pods),
    })
}

pub fn network_latency(pods: &[&str]) -> FaultSpec {
    FaultSpec::NetworkLatency(NetworkLatencyFault {
        selector: service_ids(pods),
        delay: Duration::from_millis(250),
        jitter: Duration::from_millis(50),
        correlation: 25,
        duration: Duration::from_secs(60),
    })
}

/// One inject step per fault followed by a single wait step.
pub fn suite_test(name: &str, faults: Vec<FaultSpec>, health: HealthCheckConfig) -> SuiteTest {
    let mut plan_steps: Vec<PlanStep> = faults
        .into_iter()
        .map(|fault| PlanStep::inject(format!("inject {}", fault.kind()), fault))
        .collect();
    plan_steps.push(PlanStep::wait_for_faults());
    SuiteTest {
        test_name: name.to_string(),
        plan_steps,
        health,
    }
}

/// Lifecycle settings with no settle delay.
pub fn fast_enclave_config(enclave: &str) -> EnclaveConfig {
    EnclaveConfig::new(enclave).with_settle_delay(Duration::ZERO)
}

/// Sequencer settings polling every millisecond.
pub fn fast_sequencer_config() -> SequencerConfig {
    SequencerConfig::default().with_poll_interval(Duration::from_millis(1))
}

/// The fakes, wired together: builds register pods in the cluster and
/// fault effects change pod phases there.
#[derive(Debug, Clone)]
pub struct SimulatedDeployment {
    pub orchestrator: InMemoryOrchestrator,
    pub faults: ScriptedFaultPlatform,
    pub cluster: InMemoryCluster,
    pub sink: InMemoryArtifactSink,
}

impl Default for SimulatedDeployment {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDeployment {
    pub fn new() -> Self {
        let cluster = InMemoryCluster::new();
        Self {
            orchestrator: InMemoryOrchestrator::new().with_cluster(cluster.clone()),
            faults: ScriptedFaultPlatform::new().with_cluster(cluster.clone()),
            cluster,
            sink: InMemoryArtifactSink::new(),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            orchestrator: Arc::new(self.orchestrator.clone()),
            faults: Arc::new(self.faults.clone()),
            cluster: Arc::new(self.cluster.clone()),
            sink: Arc::new(self.sink.clone()),
        }
    }
}
