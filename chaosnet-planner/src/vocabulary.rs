//! Closed vocabularies of the fault section and their validation.

use std::fmt;
use std::str::FromStr;

use chaosnet_core::{ChaosError, ClientKind, Result};

use crate::config::PlannerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultType {
    ClockSkew,
    RestartFailures,
    IoLatency,
    NetworkLatency,
    PacketDrop,
}

impl FaultType {
    pub const ALL: [FaultType; 5] = [
        Self::ClockSkew,
        Self::RestartFailures,
        Self::IoLatency,
        Self::NetworkLatency,
        Self::PacketDrop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClockSkew => "ClockSkew",
            Self::RestartFailures => "RestartFailures",
            Self::IoLatency => "IOLatency",
            Self::NetworkLatency => "NetworkLatency",
            Self::PacketDrop => "PacketDrop",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetingDimension {
    /// Every service of each chosen node.
    MatchingNode,
    /// Only the target client's services of each chosen node.
    MatchingClient,
}

impl TargetingDimension {
    pub const ALL: [TargetingDimension; 2] = [Self::MatchingNode, Self::MatchingClient];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MatchingNode => "MatchingNode",
            Self::MatchingClient => "MatchingClient",
        }
    }
}

/// How many of the N nodes running the target client are attacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttackSize {
    One,
    Minority,
    Superminority,
    Majority,
    Supermajority,
    All,
}

impl AttackSize {
    pub const ALL: [AttackSize; 6] = [
        Self::One,
        Self::Minority,
        Self::Superminority,
        Self::Majority,
        Self::Supermajority,
        Self::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::One => "AttackOneMatching",
            Self::Minority => "AttackMinorityMatching",
            Self::Superminority => "AttackSuperminorityMatching",
            Self::Majority => "AttackMajorityMatching",
            Self::Supermajority => "AttackSupermajorityMatching",
            Self::All => "AttackAllMatching",
        }
    }

    /// Number of nodes to attack out of `n`, or `None` when no count
    /// satisfies the size's bounds.
    ///
    /// Minority is the largest `k >= 1` with `k/n < 1/3`; the other sizes
    /// pick the smallest `k` inside their band.
    pub fn node_count(&self, n: usize) -> Option<usize> {
        if n == 0 {
            return None;
        }
        let k = match self {
            Self::One => 1,
            Self::Minority => n.div_ceil(3).checked_sub(1).filter(|k| *k >= 1)?,
            Self::Superminority => n.div_ceil(3),
            Self::Majority => n / 2 + 1,
            Self::Supermajority => (2 * n).div_ceil(3),
            Self::All => n,
        };
        let in_band = match self {
            Self::One | Self::All => true,
            Self::Minority => 3 * k < n,
            Self::Superminority => 3 * k >= n && 2 * k < n,
            Self::Majority => 2 * k > n && 3 * k < 2 * n,
            Self::Supermajority => 3 * k >= 2 * n && k < n,
        };
        (in_band && k <= n).then_some(k)
    }
}

macro_rules! closed_vocabulary {
    ($ty:ident, $what:literal) => {
        impl FromStr for $ty {
            type Err = ChaosError;

            fn from_str(s: &str) -> Result<Self> {
                Self::ALL.iter().copied().find(|v| v.as_str() == s).ok_or_else(|| {
                    let supported: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                    ChaosError::configuration(format!(
                        "the {} '{}' is not supported. Supported: {}",
                        $what,
                        s,
                        supported.join(", ")
                    ))
                })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

closed_vocabulary!(FaultType, "fault type");
closed_vocabulary!(TargetingDimension, "fault targeting dimension");
closed_vocabulary!(AttackSize, "attack size dimension");

/// The fault section after vocabulary checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFaultConfig {
    pub fault_type: FaultType,
    pub target: ClientKind,
    pub targeting: Vec<TargetingDimension>,
    pub attack_sizes: Vec<AttackSize>,
}

/// Checks the fault section against the closed vocabularies and confirms the
/// target client is declared in the catalog of its role.
pub fn validate_fault_config(config: &PlannerConfig) -> Result<ValidatedFaultConfig> {
    let fault = &config.fault_config;
    let fault_type: FaultType = fault.fault_type.parse()?;

    if fault.fault_targeting_dimensions.is_empty() {
        return Err(ChaosError::configuration("at least one fault targeting dimension is required"));
    }
    let targeting = fault
        .fault_targeting_dimensions
        .iter()
        .map(|s| s.parse())
        .collect::<Result<Vec<TargetingDimension>>>()?;

    if fault.fault_attack_size_dimensions.is_empty() {
        return Err(ChaosError::configuration("at least one attack size dimension is required"));
    }
    let attack_sizes = fault
        .fault_attack_size_dimensions
        .iter()
        .map(|s| s.parse())
        .collect::<Result<Vec<AttackSize>>>()?;

    let target = ClientKind::resolve(&fault.target_client)?;
    let declared = match target {
        ClientKind::Execution(el) => config.execution_version(el).is_some(),
        ClientKind::Consensus(cl) => config.consensus_version(cl).is_some(),
    };
    if !declared {
        return Err(ChaosError::configuration(format!(
            "no version found for {} client type: {}",
            target.role(),
            target
        )));
    }

    Ok(ValidatedFaultConfig {
        fault_type,
        target,
        targeting,
        attack_sizes,
    })
}
