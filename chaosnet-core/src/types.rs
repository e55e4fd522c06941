//! # Core Types
//!
//! Closed vocabularies for client implementations and service roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{ChaosError, Result};

/// Execution-layer client implementations.
///
/// # Examples
///
/// ```rust
/// use chaosnet_core::ExecutionClientType;
///
/// let geth: ExecutionClientType = "geth".parse().unwrap();
/// assert_eq!(geth.as_str(), "geth");
/// assert!("lighthouse".parse::<ExecutionClientType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionClientType {
    Geth,
    Erigon,
    Nethermind,
    Besu,
    Reth,
    Ethereumjs,
    NimbusEth1,
}

impl ExecutionClientType {
    pub const ALL: [ExecutionClientType; 7] = [
        Self::Geth,
        Self::Erigon,
        Self::Nethermind,
        Self::Besu,
        Self::Reth,
        Self::Ethereumjs,
        Self::NimbusEth1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Geth => "geth",
            Self::Erigon => "erigon",
            Self::Nethermind => "nethermind",
            Self::Besu => "besu",
            Self::Reth => "reth",
            Self::Ethereumjs => "ethereumjs",
            Self::NimbusEth1 => "nimbus-eth1",
        }
    }
}

impl fmt::Display for ExecutionClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionClientType {
    type Err = ChaosError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                ChaosError::configuration(format!("'{}' is not an execution client type", s))
            })
    }
}

/// Consensus-layer client implementations. Validator sidecars reuse this
/// vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsensusClientType {
    Lighthouse,
    Teku,
    Nimbus,
    Prysm,
    Lodestar,
    Grandine,
}

impl ConsensusClientType {
    pub const ALL: [ConsensusClientType; 6] = [
        Self::Lighthouse,
        Self::Teku,
        Self::Nimbus,
        Self::Prysm,
        Self::Lodestar,
        Self::Grandine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lighthouse => "lighthouse",
            Self::Teku => "teku",
            Self::Nimbus => "nimbus",
            Self::Prysm => "prysm",
            Self::Lodestar => "lodestar",
            Self::Grandine => "grandine",
        }
    }
}

impl fmt::Display for ConsensusClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsensusClientType {
    type Err = ChaosError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                ChaosError::configuration(format!("'{}' is not a consensus client type", s))
            })
    }
}

/// Role a service plays inside a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientRole {
    Execution,
    Consensus,
    Validator,
}

impl ClientRole {
    pub const ALL: [ClientRole; 3] = [Self::Execution, Self::Consensus, Self::Validator];

    /// Short token used in platform service names (`el`, `cl`, `vc`).
    pub fn short_token(&self) -> &'static str {
        match self {
            Self::Execution => "el",
            Self::Consensus => "cl",
            Self::Validator => "vc",
        }
    }

    /// Value of the service-type label attached to pods of this role.
    pub fn service_type_label(&self) -> &'static str {
        match self {
            Self::Execution => "execution-client",
            Self::Consensus => "consensus-client",
            Self::Validator => "validator-client",
        }
    }

    pub(crate) fn from_token(token: &str) -> Option<Self> {
        match token {
            "el" | "execution" => Some(Self::Execution),
            "cl" | "consensus" => Some(Self::Consensus),
            "vc" | "validator" => Some(Self::Validator),
            _ => None,
        }
    }
}

impl fmt::Display for ClientRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Execution => f.write_str("execution"),
            Self::Consensus => f.write_str("consensus"),
            Self::Validator => f.write_str("validator"),
        }
    }
}

/// A client identifier resolved against both vocabularies.
///
/// Names never collide across layers (`nimbus` vs `nimbus-eth1`), so at most
/// one side matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientKind {
    Execution(ExecutionClientType),
    Consensus(ConsensusClientType),
}

impl ClientKind {
    /// Resolves a raw client identifier. Exactly one vocabulary must match.
    pub fn resolve(name: &str) -> Result<Self> {
        let execution = name.parse::<ExecutionClientType>().ok();
        let consensus = name.parse::<ConsensusClientType>().ok();
        match (execution, consensus) {
            (Some(el), None) => Ok(Self::Execution(el)),
            (None, Some(cl)) => Ok(Self::Consensus(cl)),
            (Some(_), Some(_)) => Err(ChaosError::configuration(format!(
                "client '{}' is ambiguous between execution and consensus",
                name
            ))),
            (None, None) => Err(ChaosError::configuration(format!(
                "the target client '{}' is not a valid execution or consensus client type",
                name
            ))),
        }
    }

    pub fn role(&self) -> ClientRole {
        match self {
            Self::Execution(_) => ClientRole::Execution,
            Self::Consensus(_) => ClientRole::Consensus,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Execution(el) => el.as_str(),
            Self::Consensus(cl) => cl.as_str(),
        }
    }
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hyphenated_execution_type_round_trips() {
        let nimbus: ExecutionClientType = "nimbus-eth1".parse().unwrap();
        assert_eq!(nimbus, ExecutionClientType::NimbusEth1);
        assert_eq!(nimbus.to_string(), "nimbus-eth1");

        let yaml = serde_yaml::to_string(&nimbus).unwrap();
        assert_eq!(yaml.trim(), "nimbus-eth1");
    }

    #[test]
    fn test_client_kind_resolution() {
        assert_eq!(
            ClientKind::resolve("geth").unwrap(),
            ClientKind::Execution(ExecutionClientType::Geth)
        );
        assert_eq!(
            ClientKind::resolve("nimbus").unwrap(),
            ClientKind::Consensus(ConsensusClientType::Nimbus)
        );
        assert!(matches!(
            ClientKind::resolve("solana"),
            Err(ChaosError::ConfigurationInvalid { .. })
        ));
    }

    #[test]
    fn test_role_tokens() {
        assert_eq!(ClientRole::from_token("el"), Some(ClientRole::Execution));
        assert_eq!(ClientRole::from_token("validator"), Some(ClientRole::Validator));
        assert_eq!(ClientRole::from_token("bn"), None);
        assert_eq!(ClientRole::Consensus.service_type_label(), "consensus-client");
    }
}
