//! Default container images, resource requests and data directories per
//! client type.
//!
//! [`ClientDefaults`] is an immutable value. Share it with `Arc` and build a
//! modified copy with the `with_*` methods when a test needs fixtures.

use std::collections::HashMap;

use crate::types::{ClientRole, ConsensusClientType, ExecutionClientType};

pub const DEFAULT_CPU_MILLICORES: u32 = 1000;
pub const DEFAULT_MEMORY_MB: u32 = 1024;

/// Resource request for one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDefaults {
    pub cpu_millicores: u32,
    pub memory_mb: u32,
}

impl Default for ResourceDefaults {
    fn default() -> Self {
        Self {
            cpu_millicores: DEFAULT_CPU_MILLICORES,
            memory_mb: DEFAULT_MEMORY_MB,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientDefaults {
    execution_images: HashMap<ExecutionClientType, String>,
    beacon_images: HashMap<ConsensusClientType, String>,
    validator_images: HashMap<ConsensusClientType, String>,
    execution_resources: ResourceDefaults,
    beacon_resources: ResourceDefaults,
    validator_resources: ResourceDefaults,
    data_root: String,
}

impl ClientDefaults {
    /// Defaults matching the public ethereum-package images.
    pub fn standard() -> Self {
        use ConsensusClientType as Cl;
        use ExecutionClientType as El;

        let execution_images = [
            (El::Geth, "ethereum/client-go:latest"),
            (El::Erigon, "ethpandaops/erigon:devel"),
            (El::Nethermind, "nethermindeth/nethermind:master"),
            (El::Besu, "hyperledger/besu:latest"),
            (El::Reth, "ghcr.io/paradigmxyz/reth"),
            (El::Ethereumjs, "ethpandaops/ethereumjs:master"),
            (El::NimbusEth1, "ethpandaops/nimbus-eth1:master"),
        ];
        let beacon_images = [
            (Cl::Lighthouse, "sigp/lighthouse:latest"),
            (Cl::Teku, "consensys/teku:latest"),
            (Cl::Nimbus, "statusim/nimbus-eth2:multiarch-latest"),
            (Cl::Prysm, "gcr.io/prysmaticlabs/prysm/beacon-chain:latest"),
            (Cl::Lodestar, "chainsafe/lodestar:latest"),
            (Cl::Grandine, "ethpandaops/grandine:master"),
        ];
        let validator_images = [
            (Cl::Lighthouse, "sigp/lighthouse:latest"),
            (Cl::Teku, "consensys/teku:latest"),
            (Cl::Nimbus, "statusim/nimbus-validator-client:multiarch-latest"),
            (Cl::Prysm, "gcr.io/prysmaticlabs/prysm/validator:latest"),
            (Cl::Lodestar, "chainsafe/lodestar:latest"),
            (Cl::Grandine, "ethpandaops/grandine:master"),
        ];

        Self {
            execution_images: execution_images
                .into_iter()
                .map(|(t, image)| (t, image.to_string()))
                .collect(),
            beacon_images: beacon_images
                .into_iter()
                .map(|(t, image)| (t, image.to_string()))
                .collect(),
            validator_images: validator_images
                .into_iter()
                .map(|(t, image)| (t, image.to_string()))
                .collect(),
            execution_resources: ResourceDefaults::default(),
            beacon_resources: ResourceDefaults::default(),
            validator_resources: ResourceDefaults::default(),
            data_root: "/data".to_string(),
        }
    }

    pub fn with_execution_image(mut self, client: ExecutionClientType, image: impl Into<String>) -> Self {
        self.execution_images.insert(client, image.into());
        self
    }

    pub fn with_beacon_image(mut self, client: ConsensusClientType, image: impl Into<String>) -> Self {
        self.beacon_images.insert(client, image.into());
        self
    }

    pub fn with_validator_image(mut self, client: ConsensusClientType, image: impl Into<String>) -> Self {
        self.validator_images.insert(client, image.into());
        self
    }

    pub fn with_resources(mut self, role: ClientRole, resources: ResourceDefaults) -> Self {
        match role {
            ClientRole::Execution => self.execution_resources = resources,
            ClientRole::Consensus => self.beacon_resources = resources,
            ClientRole::Validator => self.validator_resources = resources,
        }
        self
    }

    pub fn with_data_root(mut self, root: impl Into<String>) -> Self {
        self.data_root = root.into();
        self
    }

    pub fn execution_image(&self, client: ExecutionClientType) -> Option<&str> {
        self.execution_images.get(&client).map(String::as_str)
    }

    pub fn beacon_image(&self, client: ConsensusClientType) -> Option<&str> {
        self.beacon_images.get(&client).map(String::as_str)
    }

    pub fn validator_image(&self, client: ConsensusClientType) -> Option<&str> {
        self.validator_images.get(&client).map(String::as_str)
    }

    pub fn resources(&self, role: ClientRole) -> ResourceDefaults {
        match role {
            ClientRole::Execution => self.execution_resources,
            ClientRole::Consensus => self.beacon_resources,
            ClientRole::Validator => self.validator_resources,
        }
    }

    /// Directory holding a client's chain data inside its container, e.g.
    /// `/data/geth/execution-data`.
    pub fn data_dir(&self, role: ClientRole, client: &str) -> String {
        let leaf = match role {
            ClientRole::Execution => "execution-data",
            ClientRole::Consensus => "beacon-data",
            ClientRole::Validator => "validator-data",
        };
        format!("{}/{}/{}", self.data_root.trim_end_matches('/'), client, leaf)
    }
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self::standard()
    }
}
