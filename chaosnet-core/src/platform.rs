//! # Collaborator Interfaces
//!
//! The orchestrator never creates enclaves, submits chaos resources or lists
//! pods itself. It sequences calls to these three traits; deployments plug
//! in real backends and tests plug in in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

use crate::clients::Labels;
use crate::fault::FaultSpec;
use crate::network::NetworkConfig;
use crate::Result;

/// One event of a network build, in platform order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    Progress {
        current_step_info: Vec<String>,
    },
    Info(String),
    Warning(String),
    InstructionResult(String),
    Error(String),
    RunFinished {
        successful: bool,
        output: String,
    },
}

impl BuildEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RunFinished { .. })
    }
}

/// Ordered stream of build events for one build.
///
/// Dropping or closing the subscription tells the producer to stop.
#[derive(Debug)]
pub struct BuildSubscription {
    events: mpsc::Receiver<BuildEvent>,
}

impl BuildSubscription {
    pub fn new(events: mpsc::Receiver<BuildEvent>) -> Self {
        Self { events }
    }

    /// Creates a subscription and the sender feeding it.
    pub fn channel(buffer: usize) -> (mpsc::Sender<BuildEvent>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self::new(rx))
    }

    /// Next event, or `None` once the producer is gone.
    pub async fn next(&mut self) -> Option<BuildEvent> {
        self.events.recv().await
    }

    pub fn close(&mut self) {
        self.events.close();
    }
}

#[async_trait]
pub trait OrchestrationPlatform: Send + Sync {
    async fn enclave_exists(&self, enclave: &str) -> Result<bool>;

    async fn create_enclave(&self, enclave: &str) -> Result<()>;

    /// Returns before teardown has finished on the platform side.
    async fn destroy_enclave(&self, enclave: &str) -> Result<()>;

    /// Every user service in the enclave, node services and auxiliaries alike.
    async fn running_service_names(&self, enclave: &str) -> Result<Vec<String>>;

    async fn build_network(&self, enclave: &str, network: &NetworkConfig) -> Result<BuildSubscription>;
}

/// Opaque id of a submitted fault.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaultHandle(pub String);

impl fmt::Display for FaultHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultStatus {
    Pending,
    Complete,
    Error(String),
}

#[async_trait]
pub trait FaultInjectionPlatform: Send + Sync {
    async fn submit_fault(&self, fault: &FaultSpec) -> Result<FaultHandle>;

    async fn fault_status(&self, handle: &FaultHandle) -> Result<FaultStatus>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodInfo {
    pub name: String,
    pub labels: Labels,
    pub phase: PodPhase,
}

#[async_trait]
pub trait ClusterInspector: Send + Sync {
    /// Names of pods whose label `key` equals `value`.
    async fn pods_matching_label(&self, key: &str, value: &str) -> Result<Vec<String>>;

    /// `Ok(None)` when the pod does not exist.
    async fn get_pod(&self, name: &str) -> Result<Option<PodInfo>>;
}
