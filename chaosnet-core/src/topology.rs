//! # Topology Model
//!
//! A [`Topology`] is the ordered list of nodes that make up a devnet. It is
//! built either from declared build parameters or from the service names a
//! running enclave reports, and the two can be compared with
//! [`Topology::is_equal`].
//!
//! Equality only looks at each node's fingerprint (index, execution type and
//! consensus type). Images and resource requests are not part of it because
//! a running enclave does not report them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::clients::{ConsensusClient, ExecutionClient, ValidatorClient};
use crate::defaults::ClientDefaults;
use crate::network::{NetworkConfig, Participant};
use crate::service::ServiceName;
use crate::types::{ClientRole, ConsensusClientType, ExecutionClientType};
use crate::{ChaosError, Result};

/// One execution + consensus (+ validator) pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub index: usize,
    pub execution: ExecutionClient,
    pub consensus: ConsensusClient,
    #[serde(default)]
    pub consensus_votes: u32,
}

/// The part of a node that takes part in topology equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeFingerprint {
    pub index: usize,
    pub execution: ExecutionClientType,
    pub consensus: ConsensusClientType,
}

impl fmt::Display for NodeFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}/{}", self.index, self.execution, self.consensus)
    }
}

impl Node {
    pub fn new(index: usize, execution: ExecutionClient, consensus: ConsensusClient) -> Self {
        Self {
            index,
            execution,
            consensus,
            consensus_votes: 0,
        }
    }

    pub fn with_votes(mut self, votes: u32) -> Self {
        self.consensus_votes = votes;
        self
    }

    pub fn fingerprint(&self) -> NodeFingerprint {
        NodeFingerprint {
            index: self.index,
            execution: self.execution.client_type,
            consensus: self.consensus.client_type,
        }
    }

    pub fn has_client(&self, client: &str) -> bool {
        self.execution.client_type.as_str() == client || self.consensus.client_type.as_str() == client
    }

    /// Identifier of this node's service for `role`, if it runs one.
    pub fn service_name(&self, role: ClientRole) -> Option<ServiceName> {
        let consensus = match role {
            ClientRole::Execution | ClientRole::Consensus => self.consensus.client_type,
            ClientRole::Validator => self.consensus.validator_type()?,
        };
        Some(ServiceName::new(role, self.index, self.execution.client_type, consensus))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    nodes: Vec<Node>,
}

impl Topology {
    pub fn from_nodes(mut nodes: Vec<Node>) -> Self {
        nodes.sort_by_key(|n| n.index);
        Self { nodes }
    }

    /// Expands participant groups into nodes in declaration order, indices
    /// starting at 1, with defaults back-filled.
    pub fn from_network_config(config: &NetworkConfig, defaults: &ClientDefaults) -> Result<Self> {
        let votes = config.network_params.num_validator_keys_per_node;
        let mut nodes = Vec::with_capacity(config.node_count());
        for participant in &config.participants {
            for _ in 0..participant.count {
                let (execution, consensus) = participant.to_clients(defaults)?;
                nodes.push(Node::new(nodes.len() + 1, execution, consensus).with_votes(votes));
            }
        }
        Ok(Self { nodes })
    }

    /// Reconstructs a topology from the service names of a running enclave.
    ///
    /// Every name must parse. Each index needs exactly one execution and one
    /// consensus service; a validator service attaches a sidecar to its
    /// index's consensus client. Images and resources are unknown and left
    /// unset.
    pub fn from_observed_services<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut els: BTreeMap<usize, ServiceName> = BTreeMap::new();
        let mut cls: BTreeMap<usize, ServiceName> = BTreeMap::new();
        let mut vcs: BTreeMap<usize, ServiceName> = BTreeMap::new();

        for raw in names {
            let name: ServiceName = raw.as_ref().parse()?;
            let slot = match name.role {
                ClientRole::Execution => &mut els,
                ClientRole::Consensus => &mut cls,
                ClientRole::Validator => &mut vcs,
            };
            if slot.insert(name.index, name).is_some() {
                return Err(ChaosError::topology_inconsistent(format!(
                    "more than one {} service at index {}",
                    name.role, name.index
                )));
            }
        }

        let mut nodes = Vec::with_capacity(els.len());
        for (index, el) in &els {
            let cl = cls.remove(index).ok_or_else(|| {
                ChaosError::topology_inconsistent(format!(
                    "no consensus service found for execution client {} at index {}",
                    el.execution, index
                ))
            })?;
            let mut consensus = ConsensusClient::new(cl.consensus);
            if let Some(vc) = vcs.remove(index) {
                consensus.has_validator_sidecar = true;
                consensus.validator = Some(ValidatorClient::new(Some(vc.consensus)));
            }
            nodes.push(Node::new(*index, ExecutionClient::new(el.execution), consensus));
        }

        if let Some((index, _)) = cls.iter().next() {
            return Err(ChaosError::topology_inconsistent(format!(
                "consensus service at index {} has no execution service",
                index
            )));
        }
        if let Some((index, _)) = vcs.iter().next() {
            return Err(ChaosError::topology_inconsistent(format!(
                "validator service at index {} has no node",
                index
            )));
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.iter().find(|n| n.index == index)
    }

    pub fn fingerprints(&self) -> Vec<NodeFingerprint> {
        self.nodes.iter().map(Node::fingerprint).collect()
    }

    /// Cardinality plus order-independent fingerprint matching. Images and
    /// resource sizing are ignored.
    pub fn is_equal(&self, other: &Topology) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let ours = self.fingerprints();
        let theirs = other.fingerprints();
        ours.iter().all(|fp| theirs.contains(fp)) && theirs.iter().all(|fp| ours.contains(fp))
    }

    /// Platform service name for a node's role, padded for this network.
    pub fn service_name(&self, node: &Node, role: ClientRole) -> Option<String> {
        node.service_name(role).map(|name| name.render(self.len()))
    }

    /// Every service the node runs, in el, cl, vc order.
    pub fn node_service_names(&self, node: &Node) -> Vec<String> {
        ClientRole::ALL
            .iter()
            .filter_map(|role| self.service_name(node, *role))
            .collect()
    }

    /// One participant per node, so the generated build reproduces this
    /// topology exactly.
    pub fn to_participants(&self) -> Vec<Participant> {
        self.nodes
            .iter()
            .map(|node| Participant::from_clients(&node.execution, &node.consensus))
            .collect()
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.fingerprints().iter().map(ToString::to_string).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::GenesisParams;
    use proptest::prelude::*;

    fn config(groups: &[(ExecutionClientType, ConsensusClientType, usize)]) -> NetworkConfig {
        let participants = groups
            .iter()
            .map(|(el, cl, count)| Participant::new(*el, *cl).with_count(*count))
            .collect();
        NetworkConfig::new(participants, GenesisParams::default())
    }

    #[test]
    fn test_build_from_config_assigns_indices_in_order() {
        let cfg = config(&[
            (ExecutionClientType::Geth, ConsensusClientType::Lighthouse, 2),
            (ExecutionClientType::Reth, ConsensusClientType::Teku, 1),
        ]);
        let topology = Topology::from_network_config(&cfg, &ClientDefaults::standard()).unwrap();
        let fps: Vec<String> = topology.fingerprints().iter().map(ToString::to_string).collect();
        assert_eq!(fps, vec!["#1 geth/lighthouse", "#2 geth/lighthouse", "#3 reth/teku"]);
    }

    #[test]
    fn test_observed_matches_config() {
        let mut participant =
            Participant::new(ExecutionClientType::Geth, ConsensusClientType::Prysm).with_count(2);
        participant.use_separate_vc = true;
        let cfg = NetworkConfig::new(vec![participant], GenesisParams::default());
        let declared = Topology::from_network_config(&cfg, &ClientDefaults::standard()).unwrap();

        let observed = Topology::from_observed_services(&[
            "el-1-geth-prysm",
            "cl-1-prysm-geth",
            "vc-1-prysm-geth",
            "el-2-geth-prysm",
            "cl-2-prysm-geth",
            "vc-2-prysm-geth",
        ])
        .unwrap();

        assert!(declared.is_equal(&observed));
        assert!(observed.is_equal(&declared));
        assert_eq!(
            observed.node(2).unwrap().consensus.validator_type(),
            Some(ConsensusClientType::Prysm)
        );
    }

    #[test]
    fn test_observed_el_without_cl_is_inconsistent() {
        let result = Topology::from_observed_services(&["el-1-geth-teku", "el-2-geth-teku", "cl-1-teku-geth"]);
        assert!(matches!(result, Err(ChaosError::TopologyInconsistent { .. })));
    }

    #[test]
    fn test_observed_rejects_bad_names() {
        let result = Topology::from_observed_services(&["el-1-geth-teku", "cl-one-teku-geth"]);
        assert!(matches!(result, Err(ChaosError::UnrecognizedServiceName { .. })));
    }

    #[test]
    fn test_service_names_are_padded() {
        let cfg = config(&[(ExecutionClientType::Besu, ConsensusClientType::Nimbus, 10)]);
        let topology = Topology::from_network_config(&cfg, &ClientDefaults::standard()).unwrap();
        let node = topology.node(3).unwrap();
        assert_eq!(
            topology.node_service_names(node),
            vec!["el-03-besu-nimbus", "cl-03-nimbus-besu"]
        );
    }

    fn arb_groups() -> impl Strategy<Value = Vec<(ExecutionClientType, ConsensusClientType, usize)>> {
        prop::collection::vec(
            (
                prop::sample::select(ExecutionClientType::ALL.to_vec()),
                prop::sample::select(ConsensusClientType::ALL.to_vec()),
                1usize..4,
            ),
            1..6,
        )
    }

    proptest! {
        #[test]
        fn prop_equality_is_reflexive_and_symmetric(a in arb_groups(), b in arb_groups()) {
            let defaults = ClientDefaults::standard();
            let ta = Topology::from_network_config(&config(&a), &defaults).unwrap();
            let ta_again = Topology::from_network_config(&config(&a), &defaults).unwrap();
            let tb = Topology::from_network_config(&config(&b), &defaults).unwrap();

            prop_assert!(ta.is_equal(&ta));
            prop_assert!(ta.is_equal(&ta_again));
            prop_assert_eq!(ta.is_equal(&tb), tb.is_equal(&ta));
            if ta.len() != tb.len() {
                prop_assert!(!ta.is_equal(&tb));
            }
        }

        #[test]
        fn prop_rendered_names_reconstruct_topology(a in arb_groups()) {
            let topology = Topology::from_network_config(&config(&a), &ClientDefaults::standard()).unwrap();
            let names: Vec<String> = topology
                .nodes()
                .iter()
                .flat_map(|n| topology.node_service_names(n))
                .collect();
            let observed = Topology::from_observed_services(&names).unwrap();
            prop_assert!(observed.is_equal(&topology));
        }
    }
}
