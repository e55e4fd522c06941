use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use chaosnet_core::{
    ClientRole, ClusterInspector, ExpressionSelector, Labels, PodInfo, PodPhase, Result, Topology,
    LABEL_SERVICE_ID, LABEL_SERVICE_TYPE,
};

/// Pods with labels and phases, mutable from the outside to simulate
/// restarts and crashes.
///
/// Clones share the same pods. Listing order is by pod name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCluster {
    pods: Arc<RwLock<BTreeMap<String, PodInfo>>>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pod(&self, name: impl Into<String>, mut labels: Labels, phase: PodPhase) {
        let name = name.into();
        labels
            .entry(LABEL_SERVICE_ID.to_string())
            .or_insert_with(|| name.clone());
        self.pods.write().insert(name.clone(), PodInfo { name, labels, phase });
    }

    /// Registers one running pod per node service, labelled the way the
    /// devnet package labels them.
    pub fn add_topology(&self, topology: &Topology) {
        for node in topology.nodes() {
            for role in ClientRole::ALL {
                let Some(name) = topology.service_name(node, role) else {
                    continue;
                };
                let mut labels = match role {
                    ClientRole::Execution => node.execution.extra_labels.clone(),
                    ClientRole::Consensus => node.consensus.extra_labels.clone(),
                    ClientRole::Validator => node
                        .consensus
                        .validator
                        .as_ref()
                        .map(|v| v.extra_labels.clone())
                        .unwrap_or_default(),
                };
                labels
                    .entry(LABEL_SERVICE_TYPE.to_string())
                    .or_insert_with(|| role.service_type_label().to_string());
                self.add_pod(name, labels, PodPhase::Running);
            }
        }
        debug!(pods = self.pods.read().len(), "registered topology pods");
    }

    pub fn remove_pod(&self, name: &str) -> Option<PodInfo> {
        self.pods.write().remove(name)
    }

    pub fn clear(&self) {
        self.pods.write().clear();
    }

    /// Returns false when the pod does not exist.
    pub fn set_phase(&self, name: &str, phase: PodPhase) -> bool {
        match self.pods.write().get_mut(name) {
            Some(pod) => {
                pod.phase = phase;
                true
            }
            None => false,
        }
    }

    /// Sets `phase` on every pod satisfying all of `selectors`. Returns the
    /// number of pods changed.
    pub fn set_phase_matching(&self, selectors: &[ExpressionSelector], phase: PodPhase) -> usize {
        let mut changed = 0;
        for pod in self.pods.write().values_mut() {
            if selectors.iter().all(|s| s.matches(&pod.labels)) {
                pod.phase = phase;
                changed += 1;
            }
        }
        changed
    }

    pub fn phase(&self, name: &str) -> Option<PodPhase> {
        self.pods.read().get(name).map(|p| p.phase)
    }

    pub fn pod_names(&self) -> Vec<String> {
        self.pods.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.pods.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.read().is_empty()
    }
}

#[async_trait]
impl ClusterInspector for InMemoryCluster {
    async fn pods_matching_label(&self, key: &str, value: &str) -> Result<Vec<String>> {
        Ok(self
            .pods
            .read()
            .values()
            .filter(|p| p.labels.get(key).map(String::as_str) == Some(value))
            .map(|p| p.name.clone())
            .collect())
    }

    async fn get_pod(&self, name: &str) -> Result<Option<PodInfo>> {
        Ok(self.pods.read().get(name).cloned())
    }
}
