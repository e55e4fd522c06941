//! Network build parameters handed to the orchestration platform.

use serde::{Deserialize, Serialize};

use crate::clients::{ConsensusClient, ExecutionClient, Labels, ValidatorClient};
use crate::defaults::ClientDefaults;
use crate::types::{ConsensusClientType, ExecutionClientType};
use crate::Result;

fn default_count() -> usize {
    1
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A group of identical nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub el_type: ExecutionClientType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub el_image: Option<String>,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub el_extra_labels: Labels,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub el_min_cpu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub el_min_mem: Option<u32>,

    pub cl_type: ConsensusClientType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cl_image: Option<String>,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub cl_extra_labels: Labels,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cl_min_cpu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cl_min_mem: Option<u32>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub use_separate_vc: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vc_type: Option<ConsensusClientType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vc_image: Option<String>,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub vc_extra_labels: Labels,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vc_min_cpu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vc_min_mem: Option<u32>,

    #[serde(default = "default_count")]
    pub count: usize,
}

impl Participant {
    pub fn new(el_type: ExecutionClientType, cl_type: ConsensusClientType) -> Self {
        Self {
            el_type,
            el_image: None,
            el_extra_labels: Labels::new(),
            el_min_cpu: None,
            el_min_mem: None,
            cl_type,
            cl_image: None,
            cl_extra_labels: Labels::new(),
            cl_min_cpu: None,
            cl_min_mem: None,
            use_separate_vc: false,
            vc_type: None,
            vc_image: None,
            vc_extra_labels: Labels::new(),
            vc_min_cpu: None,
            vc_min_mem: None,
            count: 1,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_separate_vc(mut self) -> Self {
        self.use_separate_vc = true;
        self
    }

    pub(crate) fn from_clients(execution: &ExecutionClient, consensus: &ConsensusClient) -> Self {
        let mut participant = Self::new(execution.client_type, consensus.client_type);
        participant.el_image = execution.image.clone();
        participant.el_extra_labels = execution.extra_labels.clone();
        participant.el_min_cpu = execution.cpu_required;
        participant.el_min_mem = execution.memory_required;
        participant.cl_image = consensus.image.clone();
        participant.cl_extra_labels = consensus.extra_labels.clone();
        participant.cl_min_cpu = consensus.cpu_required;
        participant.cl_min_mem = consensus.memory_required;
        participant.use_separate_vc = consensus.has_validator_sidecar;
        if let Some(validator) = consensus.validator.as_ref().filter(|_| consensus.has_validator_sidecar) {
            participant.vc_type = validator.client_type;
            participant.vc_image = validator.image.clone();
            participant.vc_extra_labels = validator.extra_labels.clone();
            participant.vc_min_cpu = validator.cpu_required;
            participant.vc_min_mem = validator.memory_required;
        }
        participant
    }

    /// Expands this participant into back-filled client descriptors.
    pub fn to_clients(&self, defaults: &ClientDefaults) -> Result<(ExecutionClient, ConsensusClient)> {
        let mut execution = ExecutionClient::new(self.el_type);
        execution.image = self.el_image.clone();
        execution.extra_labels = self.el_extra_labels.clone();
        execution.cpu_required = self.el_min_cpu;
        execution.memory_required = self.el_min_mem;
        execution.apply_defaults(defaults)?;

        let mut consensus = ConsensusClient::new(self.cl_type);
        consensus.image = self.cl_image.clone();
        consensus.extra_labels = self.cl_extra_labels.clone();
        consensus.cpu_required = self.cl_min_cpu;
        consensus.memory_required = self.cl_min_mem;
        consensus.has_validator_sidecar = self.use_separate_vc;
        if self.use_separate_vc {
            consensus.validator = Some(ValidatorClient {
                client_type: self.vc_type,
                image: self.vc_image.clone(),
                cpu_required: self.vc_min_cpu,
                memory_required: self.vc_min_mem,
                extra_labels: self.vc_extra_labels.clone(),
            });
        }
        consensus.apply_defaults(defaults)?;
        Ok((execution, consensus))
    }
}

/// Genesis and chain parameters. Only the per-node key count is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preregistered_validator_keys_mnemonic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preregistered_validator_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds_per_slot: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_delay: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_churn: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ejection_balance: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eth1_follow_distance: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capella_fork_epoch: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deneb_fork_epoch: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub electra_fork_epoch: Option<u64>,
    #[serde(default)]
    pub num_validator_keys_per_node: u32,
}

/// Parameters consumed by the devnet package when building a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub network_params: GenesisParams,
    #[serde(default)]
    pub additional_services: Vec<String>,
    #[serde(default)]
    pub parallel_keystore_generation: bool,
    #[serde(default)]
    pub persistent: bool,
    #[serde(default)]
    pub disable_peer_scoring: bool,
}

impl NetworkConfig {
    /// Standard shape for generated plans: dashboards on, peer scoring off.
    pub fn new(participants: Vec<Participant>, network_params: GenesisParams) -> Self {
        Self {
            participants,
            network_params,
            additional_services: vec!["prometheus_grafana".to_string(), "dora".to_string()],
            parallel_keystore_generation: false,
            persistent: false,
            disable_peer_scoring: true,
        }
    }

    pub fn node_count(&self) -> usize {
        self.participants.iter().map(|p| p.count).sum()
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
