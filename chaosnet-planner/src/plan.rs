use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use chaosnet_core::{
    ChaosError, ClientDefaults, ExperimentConfig, NetworkConfig, Node, Result, SuiteTest, Topology,
};

use crate::composer::{pad_nodes, pair_target_nodes, ClientCatalog};
use crate::config::PlannerConfig;
use crate::params::parse_dimensions;
use crate::sizing::calculate_network_size;
use crate::suite::compile_suite;
use crate::vocabulary::{validate_fault_config, ValidatedFaultConfig};

/// Index reserved for the bootnode when one is declared.
pub const BOOTNODE_INDEX: usize = 1;

/// A composed experiment: the network to build and the tests to run on it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentPlan {
    pub topology: Topology,
    pub network_config: NetworkConfig,
    pub tests: Vec<SuiteTest>,
    pub bootnode: Option<usize>,
    pub wait_before_first_test: Option<Duration>,
    pub package_id: String,
    pub namespace: String,
}

impl ExperimentPlan {
    /// Experiment document for a fresh enclave. Generated networks always
    /// start a new devnet.
    pub fn to_experiment_config(&self, enclave_name: impl Into<String>) -> ExperimentConfig {
        ExperimentConfig {
            enclave_name: enclave_name.into(),
            enclave_namespace: self.namespace.clone(),
            package_id: self.package_id.clone(),
            start_new_devnet: true,
            wait_before_injection: self.wait_before_first_test,
            network_config: self.network_config.clone(),
            tests: self.tests.clone(),
        }
    }
}

/// Turns a [`PlannerConfig`] into an [`ExperimentPlan`].
pub struct Planner {
    config: PlannerConfig,
    defaults: Arc<ClientDefaults>,
    rng: StdRng,
}

impl Planner {
    pub fn new(config: PlannerConfig, defaults: Arc<ClientDefaults>) -> Self {
        let rng = match config.seed {
            Some(seed) => rand::SeedableRng::seed_from_u64(seed),
            None => rand::SeedableRng::from_entropy(),
        };
        Self { config, defaults, rng }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Validates, sizes, pairs and pads. Returns the topology and the
    /// bootnode index, if any.
    pub fn compose_topology(&mut self, fault: &ValidatedFaultConfig) -> Result<(Topology, Option<usize>)> {
        self.config.ensure_unique_catalogs()?;
        let catalog = ClientCatalog {
            execution: self.config.execution_catalog(&self.defaults)?,
            consensus: self.config.consensus_catalog(&self.defaults)?,
        };
        let votes = self.config.network_params.num_validator_keys_per_node;
        let target = fault.target;

        let mut nodes = Vec::new();
        let bootnode = match &self.config.bootnode {
            Some(boot) => {
                let execution = catalog
                    .execution
                    .iter()
                    .find(|c| c.client_type == boot.execution)
                    .ok_or_else(|| undeclared_bootnode_client(boot.execution.as_str()))?;
                let consensus = catalog
                    .consensus
                    .iter()
                    .find(|c| c.client_type == boot.consensus)
                    .ok_or_else(|| undeclared_bootnode_client(boot.consensus.as_str()))?;
                nodes.push(Node::new(BOOTNODE_INDEX, execution.clone(), consensus.clone()).with_votes(votes));
                Some(BOOTNODE_INDEX)
            }
            None => None,
        };
        let first_index = nodes.len() + 1;

        let size = calculate_network_size(
            &self.config.target_network_topology,
            catalog.counterpart_count(target),
        )?;
        let multiplier = self.config.target_network_topology.multiplier();
        nodes.extend(pair_target_nodes(&catalog, target, multiplier, first_index, votes)?);
        nodes.extend(pad_nodes(
            &mut self.rng,
            &catalog,
            target,
            size.target - size.base,
            first_index + size.base,
            votes,
        )?);

        let topology = Topology::from_nodes(nodes);
        info!(
            target = %target,
            base = size.base,
            padded = size.target - size.base,
            bootnode = bootnode.is_some(),
            "composed topology {}",
            topology
        );
        Ok((topology, bootnode))
    }

    /// Runs every planning stage and compiles the test suite.
    pub fn build_plan(&mut self) -> Result<ExperimentPlan> {
        let fault = validate_fault_config(&self.config)?;
        let dimensions = parse_dimensions(fault.fault_type, &self.config.fault_config.fault_config_dimensions)?;
        let (topology, bootnode) = self.compose_topology(&fault)?;

        let tests = compile_suite(&fault, &dimensions, &topology, bootnode, &self.defaults)?;
        let network_config = NetworkConfig::new(topology.to_participants(), self.config.network_params.clone());
        info!(
            fault = %fault.fault_type,
            target = %fault.target,
            nodes = topology.len(),
            tests = tests.len(),
            "built experiment plan"
        );

        Ok(ExperimentPlan {
            topology,
            network_config,
            tests,
            bootnode,
            wait_before_first_test: self.config.fault_config.wait_before_first_test,
            package_id: self.config.kurtosis_package.clone(),
            namespace: self.config.kubernetes_namespace.clone(),
        })
    }
}

fn undeclared_bootnode_client(client: &str) -> ChaosError {
    ChaosError::configuration(format!("bootnode client {} has no declared version", client))
}
