use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

use chaosnet_core::{
    BuildEvent, BuildSubscription, ChaosError, ClientDefaults, NetworkConfig, OrchestrationPlatform, Result,
    Topology,
};

use crate::cluster::InMemoryCluster;

const PLATFORM: &str = "orchestration";

/// One call received by [`InMemoryOrchestrator`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorCall {
    EnclaveExists(String),
    CreateEnclave(String),
    DestroyEnclave(String),
    RunningServiceNames(String),
    BuildNetwork(String),
}

impl OrchestratorCall {
    /// Whether the call changes platform state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::CreateEnclave(_) | Self::DestroyEnclave(_) | Self::BuildNetwork(_)
        )
    }
}

#[derive(Debug)]
struct OrchestratorState {
    enclaves: BTreeMap<String, Vec<String>>,
    scripted_builds: VecDeque<Vec<BuildEvent>>,
    calls: Vec<OrchestratorCall>,
    reachable: bool,
}

impl OrchestratorState {
    fn record(&mut self, call: OrchestratorCall) -> Result<()> {
        debug!(?call, "orchestrator call");
        self.calls.push(call);
        if !self.reachable {
            return Err(ChaosError::platform(
                PLATFORM,
                "dial tcp 127.0.0.1:9710: connect: connection refused",
            ));
        }
        Ok(())
    }
}

/// Enclaves kept in memory. A successful build sets the enclave's services
/// to the node services of the requested network plus its additional
/// services; when a cluster is attached it also gets one running pod per
/// node service.
#[derive(Debug, Clone)]
pub struct InMemoryOrchestrator {
    state: Arc<Mutex<OrchestratorState>>,
    defaults: Arc<ClientDefaults>,
    cluster: Option<InMemoryCluster>,
}

impl Default for InMemoryOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOrchestrator {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(OrchestratorState {
                enclaves: BTreeMap::new(),
                scripted_builds: VecDeque::new(),
                calls: Vec::new(),
                reachable: true,
            })),
            defaults: Arc::new(ClientDefaults::standard()),
            cluster: None,
        }
    }

    pub fn with_defaults(mut self, defaults: Arc<ClientDefaults>) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_cluster(mut self, cluster: InMemoryCluster) -> Self {
        self.cluster = Some(cluster);
        self
    }

    /// Seeds an enclave that already runs `services`.
    pub fn with_enclave<S: Into<String>>(self, enclave: &str, services: impl IntoIterator<Item = S>) -> Self {
        self.state
            .lock()
            .enclaves
            .insert(enclave.to_string(), services.into_iter().map(Into::into).collect());
        self
    }

    /// Events for the next build. Unscripted builds succeed.
    pub fn script_build(&self, events: Vec<BuildEvent>) {
        self.state.lock().scripted_builds.push_back(events);
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().reachable = reachable;
    }

    pub fn calls(&self) -> Vec<OrchestratorCall> {
        self.state.lock().calls.clone()
    }

    pub fn mutations(&self) -> Vec<OrchestratorCall> {
        self.calls().into_iter().filter(OrchestratorCall::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn has_enclave(&self, enclave: &str) -> bool {
        self.state.lock().enclaves.contains_key(enclave)
    }

    pub fn enclave_services(&self, enclave: &str) -> Option<Vec<String>> {
        self.state.lock().enclaves.get(enclave).cloned()
    }
}

/// The event sequence of an uneventful build.
pub fn successful_build_events(node_count: usize) -> Vec<BuildEvent> {
    let steps = vec![
        "Uploading the devnet package".to_string(),
        "Generating genesis".to_string(),
        format!("Launching {} participants", node_count),
    ];
    let mut events: Vec<BuildEvent> = (1..=steps.len())
        .map(|n| BuildEvent::Progress {
            current_step_info: steps[..n].to_vec(),
        })
        .collect();
    events.push(BuildEvent::Info("Genesis validators root computed".to_string()));
    events.push(BuildEvent::InstructionResult(format!("{} participants started", node_count)));
    events.push(BuildEvent::RunFinished {
        successful: true,
        output: "devnet started".to_string(),
    });
    events
}

/// Same reading as the build consumer: the first error or terminal event
/// decides.
fn build_succeeds(events: &[BuildEvent]) -> bool {
    for event in events {
        match event {
            BuildEvent::Error(_) => return false,
            BuildEvent::RunFinished { successful, .. } => return *successful,
            _ => {}
        }
    }
    false
}

#[async_trait]
impl OrchestrationPlatform for InMemoryOrchestrator {
    async fn enclave_exists(&self, enclave: &str) -> Result<bool> {
        let mut state = self.state.lock();
        state.record(OrchestratorCall::EnclaveExists(enclave.to_string()))?;
        Ok(state.enclaves.contains_key(enclave))
    }

    async fn create_enclave(&self, enclave: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.record(OrchestratorCall::CreateEnclave(enclave.to_string()))?;
        if state.enclaves.contains_key(enclave) {
            return Err(ChaosError::platform(
                PLATFORM,
                format!("enclave {} already exists", enclave),
            ));
        }
        state.enclaves.insert(enclave.to_string(), Vec::new());
        Ok(())
    }

    async fn destroy_enclave(&self, enclave: &str) -> Result<()> {
        let services = {
            let mut state = self.state.lock();
            state.record(OrchestratorCall::DestroyEnclave(enclave.to_string()))?;
            state.enclaves.remove(enclave).ok_or_else(|| {
                ChaosError::platform(PLATFORM, format!("enclave {} does not exist", enclave))
            })?
        };
        if let Some(cluster) = &self.cluster {
            for service in &services {
                cluster.remove_pod(service);
            }
        }
        Ok(())
    }

    async fn running_service_names(&self, enclave: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        state.record(OrchestratorCall::RunningServiceNames(enclave.to_string()))?;
        state
            .enclaves
            .get(enclave)
            .cloned()
            .ok_or_else(|| ChaosError::platform(PLATFORM, format!("enclave {} does not exist", enclave)))
    }

    async fn build_network(&self, enclave: &str, network: &NetworkConfig) -> Result<BuildSubscription> {
        let topology = Topology::from_network_config(network, &self.defaults)?;

        let (events, succeeded) = {
            let mut state = self.state.lock();
            state.record(OrchestratorCall::BuildNetwork(enclave.to_string()))?;
            if !state.enclaves.contains_key(enclave) {
                return Err(ChaosError::platform(
                    PLATFORM,
                    format!("enclave {} does not exist", enclave),
                ));
            }
            let events = state
                .scripted_builds
                .pop_front()
                .unwrap_or_else(|| successful_build_events(topology.len()));
            let succeeded = build_succeeds(&events);
            if succeeded {
                let mut services: Vec<String> = topology
                    .nodes()
                    .iter()
                    .flat_map(|node| topology.node_service_names(node))
                    .collect();
                services.extend(network.additional_services.iter().cloned());
                state.enclaves.insert(enclave.to_string(), services);
            }
            (events, succeeded)
        };

        if succeeded {
            if let Some(cluster) = &self.cluster {
                cluster.add_topology(&topology);
            }
        }

        let (tx, subscription) = BuildSubscription::channel(events.len());
        for event in events {
            if tx.try_send(event).is_err() {
                break;
            }
        }
        Ok(subscription)
    }
}
