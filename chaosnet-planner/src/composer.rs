//! Node composition: deterministic pairing of the target client, then
//! random padding from the eligible clients.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use chaosnet_core::{ChaosError, ClientKind, ConsensusClient, ExecutionClient, Node, Result};

/// Back-filled client catalogs in declaration order.
#[derive(Debug, Clone)]
pub struct ClientCatalog {
    pub execution: Vec<ExecutionClient>,
    pub consensus: Vec<ConsensusClient>,
}

impl ClientCatalog {
    pub fn counterpart_count(&self, target: ClientKind) -> usize {
        match target {
            ClientKind::Execution(_) => self.consensus.len(),
            ClientKind::Consensus(_) => self.execution.len(),
        }
    }

    fn execution_client(&self, target: ClientKind) -> Option<&ExecutionClient> {
        match target {
            ClientKind::Execution(el) => self.execution.iter().find(|c| c.client_type == el),
            ClientKind::Consensus(_) => None,
        }
    }

    fn consensus_client(&self, target: ClientKind) -> Option<&ConsensusClient> {
        match target {
            ClientKind::Consensus(cl) => self.consensus.iter().find(|c| c.client_type == cl),
            ClientKind::Execution(_) => None,
        }
    }
}

/// Pairs the target client with every declared client of the opposite role,
/// `multiplier` times each, in declaration order. Indices start at
/// `first_index`.
pub fn pair_target_nodes(
    catalog: &ClientCatalog,
    target: ClientKind,
    multiplier: u32,
    first_index: usize,
    votes: u32,
) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    let mut push = |execution: &ExecutionClient, consensus: &ConsensusClient| {
        let index = first_index + nodes.len();
        nodes.push(Node::new(index, execution.clone(), consensus.clone()).with_votes(votes));
    };

    let missing = || ChaosError::configuration(format!("target client {} is not in the catalog", target));
    match target {
        ClientKind::Execution(_) => {
            let el = catalog.execution_client(target).ok_or_else(missing)?;
            for cl in &catalog.consensus {
                for _ in 0..multiplier {
                    push(el, cl);
                }
            }
        }
        ClientKind::Consensus(_) => {
            let cl = catalog.consensus_client(target).ok_or_else(missing)?;
            for el in &catalog.execution {
                for _ in 0..multiplier {
                    push(el, cl);
                }
            }
        }
    }
    debug!(target = %target, nodes = nodes.len(), "paired target client");
    Ok(nodes)
}

/// Adds `count` nodes that do not run the target client.
///
/// The target-role side is drawn uniformly from the declared clients of that
/// role other than the target; the other side from every declared client of
/// its role.
pub fn pad_nodes<R: Rng + ?Sized>(
    rng: &mut R,
    catalog: &ClientCatalog,
    target: ClientKind,
    count: usize,
    first_index: usize,
    votes: u32,
) -> Result<Vec<Node>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let eligible_execution: Vec<&ExecutionClient> = catalog
        .execution
        .iter()
        .filter(|c| !matches!(target, ClientKind::Execution(el) if el == c.client_type))
        .collect();
    let eligible_consensus: Vec<&ConsensusClient> = catalog
        .consensus
        .iter()
        .filter(|c| !matches!(target, ClientKind::Consensus(cl) if cl == c.client_type))
        .collect();

    if eligible_execution.is_empty() || eligible_consensus.is_empty() {
        return Err(ChaosError::configuration(format!(
            "cannot pad the network with {} nodes: no declared {} client other than {}",
            count,
            target.role(),
            target
        )));
    }

    let mut nodes = Vec::with_capacity(count);
    for offset in 0..count {
        let (Some(el), Some(cl)) = (eligible_execution.choose(rng), eligible_consensus.choose(rng)) else {
            return Err(ChaosError::internal("eligible client set became empty while padding"));
        };
        nodes.push(Node::new(first_index + offset, (*el).clone(), (*cl).clone()).with_votes(votes));
    }
    debug!(padded = count, "padded network with non-target nodes");
    Ok(nodes)
}
