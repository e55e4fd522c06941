//! Platform service identifiers.
//!
//! Node services are named `<role>-<index>-<client>-<paired>`, for example
//! `el-03-geth-lighthouse` or `vc-1-nimbus-nimbus-eth1`. Client names may
//! contain hyphens, so the tail is split by matching against the closed
//! client vocabularies rather than by position.

use std::fmt;
use std::str::FromStr;

use crate::types::{ClientRole, ConsensusClientType, ExecutionClientType};
use crate::{ChaosError, Result};

/// A parsed node service identifier.
///
/// For `el` services `execution` is the client and `consensus` the paired
/// client; for `cl` and `vc` services it is the other way around (a `vc`
/// carries the validator's type in `consensus`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceName {
    pub role: ClientRole,
    pub index: usize,
    pub execution: ExecutionClientType,
    pub consensus: ConsensusClientType,
}

impl ServiceName {
    pub fn new(
        role: ClientRole,
        index: usize,
        execution: ExecutionClientType,
        consensus: ConsensusClientType,
    ) -> Self {
        Self {
            role,
            index,
            execution,
            consensus,
        }
    }

    /// Renders the name with the index zero-padded to the digit count of
    /// `node_count`.
    pub fn render(&self, node_count: usize) -> String {
        let width = index_width(node_count);
        let (client, paired) = match self.role {
            ClientRole::Execution => (self.execution.as_str(), self.consensus.as_str()),
            ClientRole::Consensus | ClientRole::Validator => {
                (self.consensus.as_str(), self.execution.as_str())
            }
        };
        format!(
            "{}-{:0width$}-{}-{}",
            self.role.short_token(),
            self.index,
            client,
            paired,
            width = width
        )
    }

    /// Cheap check separating node services from auxiliary ones (grafana,
    /// dora, ...). Anything passing still goes through strict parsing.
    pub fn looks_like_node_service(name: &str) -> bool {
        let mut parts = name.splitn(3, '-');
        let role = parts.next().and_then(ClientRole::from_token);
        let index = parts
            .next()
            .map(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(false);
        role.is_some() && index && parts.next().is_some()
    }

    fn unrecognized(name: &str) -> ChaosError {
        ChaosError::UnrecognizedServiceName {
            name: name.to_string(),
        }
    }
}

/// Number of decimal digits in `node_count` (at least one).
pub fn index_width(node_count: usize) -> usize {
    node_count.max(1).to_string().len()
}

impl FromStr for ServiceName {
    type Err = ChaosError;

    fn from_str(name: &str) -> Result<Self> {
        let mut parts = name.splitn(3, '-');
        let role = parts
            .next()
            .and_then(ClientRole::from_token)
            .ok_or_else(|| Self::unrecognized(name))?;
        let index_part = parts.next().ok_or_else(|| Self::unrecognized(name))?;
        if index_part.is_empty() || !index_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Self::unrecognized(name));
        }
        let index: usize = index_part.parse().map_err(|_| Self::unrecognized(name))?;
        let tail = parts.next().ok_or_else(|| Self::unrecognized(name))?;

        // try every hyphen as the boundary between client and paired client
        for (pos, _) in tail.match_indices('-') {
            let (client, paired) = (&tail[..pos], &tail[pos + 1..]);
            let parsed = match role {
                ClientRole::Execution => client
                    .parse::<ExecutionClientType>()
                    .ok()
                    .zip(paired.parse::<ConsensusClientType>().ok()),
                ClientRole::Consensus | ClientRole::Validator => paired
                    .parse::<ExecutionClientType>()
                    .ok()
                    .zip(client.parse::<ConsensusClientType>().ok()),
            };
            if let Some((execution, consensus)) = parsed {
                return Ok(Self::new(role, index, execution, consensus));
            }
        }
        Err(Self::unrecognized(name))
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(0))
    }
}
