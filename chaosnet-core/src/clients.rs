//! Client descriptors and default back-fill.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::defaults::ClientDefaults;
use crate::types::{ClientRole, ConsensusClientType, ExecutionClientType};
use crate::{ChaosError, Result};

/// Pod label naming the platform-assigned service identifier.
pub const LABEL_SERVICE_ID: &str = "kurtosistech.com/id";
/// Pod label naming the role of a service.
pub const LABEL_SERVICE_TYPE: &str = "ethereum-package.service-type";
/// Pod label naming the client implementation of a service.
pub const LABEL_CLIENT_TYPE: &str = "ethereum-package.client-type";

pub type Labels = BTreeMap<String, String>;

fn default_labels(role: ClientRole, client: &str) -> Labels {
    let mut labels = Labels::new();
    labels.insert(LABEL_SERVICE_TYPE.to_string(), role.service_type_label().to_string());
    labels.insert(LABEL_CLIENT_TYPE.to_string(), client.to_string());
    labels
}

fn merge_default_labels(labels: &mut Labels, role: ClientRole, client: &str) {
    for (key, value) in default_labels(role, client) {
        labels.entry(key).or_insert(value);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionClient {
    #[serde(rename = "type")]
    pub client_type: ExecutionClientType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_required: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_required: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_labels: Labels,
}

impl ExecutionClient {
    pub fn new(client_type: ExecutionClientType) -> Self {
        Self {
            client_type,
            image: None,
            cpu_required: None,
            memory_required: None,
            extra_labels: Labels::new(),
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Fills every unset field from `defaults` and attaches the default
    /// role/type labels without overriding user labels.
    pub fn apply_defaults(&mut self, defaults: &ClientDefaults) -> Result<()> {
        if self.image.is_none() {
            let image = defaults.execution_image(self.client_type).ok_or_else(|| {
                ChaosError::configuration(format!(
                    "no default image for execution client {}",
                    self.client_type
                ))
            })?;
            self.image = Some(image.to_string());
        }
        let resources = defaults.resources(ClientRole::Execution);
        self.cpu_required.get_or_insert(resources.cpu_millicores);
        self.memory_required.get_or_insert(resources.memory_mb);
        merge_default_labels(&mut self.extra_labels, ClientRole::Execution, self.client_type.as_str());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorClient {
    /// Defaults to the owning consensus client's type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub client_type: Option<ConsensusClientType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_required: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_required: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_labels: Labels,
}

impl ValidatorClient {
    pub fn new(client_type: Option<ConsensusClientType>) -> Self {
        Self {
            client_type,
            image: None,
            cpu_required: None,
            memory_required: None,
            extra_labels: Labels::new(),
        }
    }
}

/// A beacon node, optionally with a validator sidecar.
///
/// `validator` is `Some` exactly when `has_validator_sidecar` is true.
/// [`ConsensusClient::apply_defaults`] rejects a client that breaks this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusClient {
    #[serde(rename = "type")]
    pub client_type: ConsensusClientType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub has_validator_sidecar: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<ValidatorClient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_required: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_required: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_labels: Labels,
}

impl ConsensusClient {
    pub fn new(client_type: ConsensusClientType) -> Self {
        Self {
            client_type,
            image: None,
            has_validator_sidecar: false,
            validator: None,
            cpu_required: None,
            memory_required: None,
            extra_labels: Labels::new(),
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Declares a validator sidecar. `None` inherits this client's type.
    pub fn with_sidecar(mut self, validator_type: Option<ConsensusClientType>) -> Self {
        self.has_validator_sidecar = true;
        self.validator = Some(ValidatorClient::new(validator_type));
        self
    }

    /// Type of the sidecar, if any, after inheritance.
    pub fn validator_type(&self) -> Option<ConsensusClientType> {
        self.validator
            .as_ref()
            .map(|vc| vc.client_type.unwrap_or(self.client_type))
    }

    pub fn apply_defaults(&mut self, defaults: &ClientDefaults) -> Result<()> {
        if self.image.is_none() {
            let image = defaults.beacon_image(self.client_type).ok_or_else(|| {
                ChaosError::configuration(format!(
                    "no default beacon image for consensus client {}",
                    self.client_type
                ))
            })?;
            self.image = Some(image.to_string());
        }
        let resources = defaults.resources(ClientRole::Consensus);
        self.cpu_required.get_or_insert(resources.cpu_millicores);
        self.memory_required.get_or_insert(resources.memory_mb);
        merge_default_labels(&mut self.extra_labels, ClientRole::Consensus, self.client_type.as_str());

        if !self.has_validator_sidecar {
            if self.validator.is_some() {
                return Err(ChaosError::SidecarInvariant {
                    client: self.client_type.to_string(),
                    reason: "has_validator_sidecar is false but a validator client is set".to_string(),
                });
            }
            return Ok(());
        }

        let owner = self.client_type;
        let validator = self.validator.get_or_insert_with(|| ValidatorClient::new(None));
        let validator_type = *validator.client_type.get_or_insert(owner);
        if validator.image.is_none() {
            let image = defaults.validator_image(validator_type).ok_or_else(|| {
                ChaosError::configuration(format!(
                    "no default validator image for client {}",
                    validator_type
                ))
            })?;
            validator.image = Some(image.to_string());
        }
        let resources = defaults.resources(ClientRole::Validator);
        validator.cpu_required.get_or_insert(resources.cpu_millicores);
        validator.memory_required.get_or_insert(resources.memory_mb);
        merge_default_labels(&mut validator.extra_labels, ClientRole::Validator, validator_type.as_str());
        Ok(())
    }
}
