use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use chaosnet_core::{
    ChaosError, ClientDefaults, ConsensusClient, ConsensusClientType, ExecutionClient,
    ExecutionClientType, GenesisParams, Result, ValidatorClient,
};

pub const DEFAULT_TARGET_NODE_MULTIPLIER: u32 = 1;

/// One set of fault parameters. Values are YAML scalars so both `50` and
/// `"50"` are accepted.
pub type FaultParamDimension = BTreeMap<String, serde_yaml::Value>;

/// A declared execution client version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionClientVersion {
    #[serde(rename = "type")]
    pub client_type: ExecutionClientType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub el_image: Option<String>,
}

impl ExecutionClientVersion {
    pub fn to_client(&self, defaults: &ClientDefaults) -> Result<ExecutionClient> {
        let mut client = ExecutionClient::new(self.client_type);
        client.image = self.el_image.clone();
        client.apply_defaults(defaults)?;
        Ok(client)
    }
}

/// A declared consensus client version, optionally with a validator sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusClientVersion {
    #[serde(rename = "type")]
    pub client_type: ConsensusClientType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cl_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vc_type: Option<ConsensusClientType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vc_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_sidecar: Option<bool>,
}

impl ConsensusClientVersion {
    /// Builds the back-filled client. Validator fields given without
    /// `has_sidecar: true` are a sidecar invariant error.
    pub fn to_client(&self, defaults: &ClientDefaults) -> Result<ConsensusClient> {
        let mut client = ConsensusClient::new(self.client_type);
        client.image = self.cl_image.clone();
        client.has_validator_sidecar = self.has_sidecar.unwrap_or(false);
        if client.has_validator_sidecar || self.vc_type.is_some() || self.vc_image.is_some() {
            let mut validator = ValidatorClient::new(self.vc_type);
            validator.image = self.vc_image.clone();
            client.validator = Some(validator);
        }
        client.apply_defaults(defaults)?;
        Ok(client)
    }
}

/// Sizing policy for the generated network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetNetworkTopology {
    /// How many nodes per counterpart client run the target client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_node_multiplier: Option<u32>,
    /// Share of the network, in `[0, 1)`, that should run the target client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_as_percent_of_network: Option<f64>,
}

impl TargetNetworkTopology {
    pub fn multiplier(&self) -> u32 {
        self.target_node_multiplier
            .unwrap_or(DEFAULT_TARGET_NODE_MULTIPLIER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootnodeConfig {
    pub execution: ExecutionClientType,
    pub consensus: ConsensusClientType,
}

/// The fault section of a planner document. Vocabulary fields stay strings
/// until [`crate::vocabulary::validate_fault_config`] checks them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerFaultConfig {
    pub fault_type: String,
    pub target_client: String,
    #[serde(
        default,
        with = "chaosnet_core::duration::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub wait_before_first_test: Option<Duration>,
    #[serde(default)]
    pub fault_config_dimensions: Vec<FaultParamDimension>,
    #[serde(default)]
    pub fault_targeting_dimensions: Vec<String>,
    #[serde(default)]
    pub fault_attack_size_dimensions: Vec<String>,
}

/// Declarative input of the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub execution: Vec<ExecutionClientVersion>,
    pub consensus: Vec<ConsensusClientVersion>,
    #[serde(default)]
    pub target_network_topology: TargetNetworkTopology,
    #[serde(default)]
    pub network_params: GenesisParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootnode: Option<BootnodeConfig>,
    /// Seeds padding selection; plans are reproducible when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub kurtosis_package: String,
    #[serde(default)]
    pub kubernetes_namespace: String,
    pub fault_config: PlannerFaultConfig,
}

impl PlannerConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.target_network_topology.target_node_multiplier = Some(multiplier);
        self
    }

    pub fn with_target_percent(mut self, percent: f64) -> Self {
        self.target_network_topology.target_as_percent_of_network = Some(percent);
        self
    }

    pub fn execution_version(&self, client: ExecutionClientType) -> Option<&ExecutionClientVersion> {
        self.execution.iter().find(|v| v.client_type == client)
    }

    pub fn consensus_version(&self, client: ConsensusClientType) -> Option<&ConsensusClientVersion> {
        self.consensus.iter().find(|v| v.client_type == client)
    }

    /// Back-filled execution catalog, in declaration order.
    pub fn execution_catalog(&self, defaults: &ClientDefaults) -> Result<Vec<ExecutionClient>> {
        self.execution.iter().map(|v| v.to_client(defaults)).collect()
    }

    /// Back-filled consensus catalog, in declaration order.
    pub fn consensus_catalog(&self, defaults: &ClientDefaults) -> Result<Vec<ConsensusClient>> {
        self.consensus.iter().map(|v| v.to_client(defaults)).collect()
    }

    pub(crate) fn ensure_unique_catalogs(&self) -> Result<()> {
        for (i, version) in self.execution.iter().enumerate() {
            if self.execution[..i].iter().any(|v| v.client_type == version.client_type) {
                return Err(ChaosError::configuration(format!(
                    "execution client {} is declared more than once",
                    version.client_type
                )));
            }
        }
        for (i, version) in self.consensus.iter().enumerate() {
            if self.consensus[..i].iter().any(|v| v.client_type == version.client_type) {
                return Err(ChaosError::configuration(format!(
                    "consensus client {} is declared more than once",
                    version.client_type
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"
execution:
  - type: geth
    el_image: ethereum/client-go:v1.14.0
  - type: reth
consensus:
  - type: lighthouse
    has_sidecar: true
  - type: prysm
    vc_type: prysm
    has_sidecar: true
target_network_topology:
  target_node_multiplier: 2
  target_as_percent_of_network: 0.25
network_params:
  num_validator_keys_per_node: 32
kurtosis_package: github.com/ethpandaops/ethereum-package
kubernetes_namespace: kt-devnet
fault_config:
  fault_type: ClockSkew
  target_client: geth
  wait_before_first_test: 300s
  fault_config_dimensions:
    - skew: -2m
      duration: 1m
      grace_period: 30s
  fault_targeting_dimensions:
    - MatchingNode
  fault_attack_size_dimensions:
    - AttackOneMatching
"#;

    #[test]
    fn test_parse_planner_document() {
        let config = PlannerConfig::from_yaml_str(DOCUMENT).unwrap();
        assert_eq!(config.execution.len(), 2);
        assert_eq!(config.target_network_topology.multiplier(), 2);
        assert_eq!(config.fault_config.wait_before_first_test, Some(Duration::from_secs(300)));
        assert_eq!(
            config.fault_config.fault_config_dimensions[0]["skew"].as_str(),
            Some("-2m")
        );
        assert_eq!(config.network_params.num_validator_keys_per_node, 32);
        assert!(config.bootnode.is_none());
    }

    #[test]
    fn test_validator_fields_without_sidecar_flag_are_rejected() {
        let version = ConsensusClientVersion {
            client_type: ConsensusClientType::Teku,
            cl_image: None,
            vc_type: None,
            vc_image: Some("consensys/teku:24.1".to_string()),
            has_sidecar: Some(false),
        };
        let result = version.to_client(&ClientDefaults::standard());
        assert!(matches!(result, Err(ChaosError::SidecarInvariant { .. })));
    }

    #[test]
    fn test_duplicate_catalog_entries_are_rejected() {
        let mut config = PlannerConfig::from_yaml_str(DOCUMENT).unwrap();
        config.execution.push(config.execution[0].clone());
        assert!(config.ensure_unique_catalogs().is_err());
    }
}
