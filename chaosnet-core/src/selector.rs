//! Chaos target selection.
//!
//! Maps an abstract [`TargetDescription`] onto the label-selector vocabulary
//! of the fault-injection platform. Resolution only reads the topology; it
//! never talks to the cluster.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clients::{Labels, LABEL_CLIENT_TYPE, LABEL_SERVICE_ID, LABEL_SERVICE_TYPE};
use crate::topology::Topology;
use crate::types::{ClientKind, ClientRole};
use crate::{ChaosError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpressionOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

impl fmt::Display for ExpressionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::In => "In",
            Self::NotIn => "NotIn",
            Self::Exists => "Exists",
            Self::DoesNotExist => "DoesNotExist",
        };
        f.write_str(s)
    }
}

/// One label requirement, in the shape the fault platform expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpressionSelector {
    pub key: String,
    pub operator: ExpressionOperator,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl ExpressionSelector {
    pub fn new(key: impl Into<String>, operator: ExpressionOperator, values: Vec<String>) -> Self {
        Self {
            key: key.into(),
            operator,
            values,
        }
    }

    pub fn service_ids(ids: Vec<String>) -> Self {
        Self::new(LABEL_SERVICE_ID, ExpressionOperator::In, ids)
    }

    /// Whether a pod carrying `labels` satisfies this requirement.
    pub fn matches(&self, labels: &Labels) -> bool {
        let value = labels.get(&self.key);
        match self.operator {
            ExpressionOperator::In => value.is_some_and(|v| self.values.contains(v)),
            ExpressionOperator::NotIn => value.map_or(true, |v| !self.values.contains(v)),
            ExpressionOperator::Exists => value.is_some(),
            ExpressionOperator::DoesNotExist => value.is_none(),
        }
    }

    /// True for the only shape that names individual pods: `kurtosistech.com/id In [...]`.
    pub fn is_service_id_equality(&self) -> bool {
        self.key == LABEL_SERVICE_ID && self.operator == ExpressionOperator::In
    }
}

const WHOLE_NODE_ROLES: &[ClientRole] = &ClientRole::ALL;
const EXECUTION_ROLES: &[ClientRole] = &[ClientRole::Execution];
const CONSENSUS_ROLES: &[ClientRole] = &[ClientRole::Consensus, ClientRole::Validator];

/// How much of a chosen node a target covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetScope {
    /// Every service the node runs.
    WholeNode,
    /// Only the services of one client. A consensus client includes its
    /// validator sidecar.
    Client(ClientKind),
}

/// What a fault should hit, before it is turned into label selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetDescription {
    /// Every service of a role across the network.
    Role(ClientRole),
    /// Every service running the given client implementation.
    ClientType(ClientKind),
    /// Explicit node indices.
    Nodes { indices: Vec<usize>, scope: TargetScope },
}

impl fmt::Display for TargetDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role(role) => write!(f, "all {} clients", role),
            Self::ClientType(kind) => write!(f, "all {} clients", kind),
            Self::Nodes { indices, scope } => {
                let list: Vec<String> = indices.iter().map(ToString::to_string).collect();
                match scope {
                    TargetScope::WholeNode => write!(f, "node(s) #{}", list.join(", #")),
                    TargetScope::Client(kind) => write!(f, "{} on node(s) #{}", kind, list.join(", #")),
                }
            }
        }
    }
}

/// A resolved target: a human description plus the selectors to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosTargetSelector {
    pub description: String,
    pub selector: Vec<ExpressionSelector>,
}

impl ChaosTargetSelector {
    pub fn new(description: impl Into<String>, selector: Vec<ExpressionSelector>) -> Self {
        Self {
            description: description.into(),
            selector,
        }
    }

    /// A pod is selected when it satisfies every requirement.
    pub fn matches(&self, labels: &Labels) -> bool {
        !self.selector.is_empty() && self.selector.iter().all(|s| s.matches(labels))
    }
}

impl TargetDescription {
    pub fn resolve(&self, topology: &Topology) -> Result<ChaosTargetSelector> {
        let description = self.to_string();
        let selector = match self {
            Self::Role(role) => ExpressionSelector::new(
                LABEL_SERVICE_TYPE,
                ExpressionOperator::In,
                vec![role.service_type_label().to_string()],
            ),
            Self::ClientType(kind) => ExpressionSelector::new(
                LABEL_CLIENT_TYPE,
                ExpressionOperator::In,
                vec![kind.as_str().to_string()],
            ),
            Self::Nodes { indices, scope } => {
                if indices.is_empty() {
                    return Err(ChaosError::configuration("target names no nodes"));
                }
                let mut ids = Vec::new();
                for index in indices {
                    let node = topology.node(*index).ok_or_else(|| {
                        ChaosError::configuration(format!("node #{} is not part of the topology", index))
                    })?;
                    let roles = match scope {
                        TargetScope::WholeNode => WHOLE_NODE_ROLES,
                        TargetScope::Client(ClientKind::Execution(el)) => {
                            if node.execution.client_type != *el {
                                return Err(ChaosError::configuration(format!(
                                    "node #{} does not run {}",
                                    index, el
                                )));
                            }
                            EXECUTION_ROLES
                        }
                        TargetScope::Client(ClientKind::Consensus(cl)) => {
                            if node.consensus.client_type != *cl {
                                return Err(ChaosError::configuration(format!(
                                    "node #{} does not run {}",
                                    index, cl
                                )));
                            }
                            CONSENSUS_ROLES
                        }
                    };
                    ids.extend(roles.iter().filter_map(|role| topology.service_name(node, *role)));
                }
                ExpressionSelector::service_ids(ids)
            }
        };
        Ok(ChaosTargetSelector::new(description, vec![selector]))
    }
}
