//! Post-fault liveness checks for pods under test and bystanders.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use chaosnet_core::{
    ClientRole, ClusterInspector, ExpressionOperator, FaultSpec, PodHealthOutcome, PodPhase, PodUnderTest, Result,
    LABEL_SERVICE_TYPE,
};

/// Label values that group pods into health dimensions.
pub fn health_dimensions() -> impl Iterator<Item = &'static str> {
    ClientRole::ALL.iter().map(|role| role.service_type_label())
}

pub struct HealthChecker {
    cluster: Arc<dyn ClusterInspector>,
}

impl HealthChecker {
    pub fn new(cluster: Arc<dyn ClusterInspector>) -> Self {
        Self { cluster }
    }

    /// Resolves the pods named by the faults' `In` selectors.
    ///
    /// A pod selected by several faults is listed once and expected to die if
    /// any of them kills it. Selectors of other shapes cannot be resolved to
    /// pods and are skipped.
    pub async fn resolve_pods_under_test<'a>(
        &self,
        faults: impl IntoIterator<Item = &'a FaultSpec>,
    ) -> Result<Vec<PodUnderTest>> {
        let mut pods: Vec<PodUnderTest> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for fault in faults {
            let expect_death = fault.expects_pod_death();
            for selector in fault.selector() {
                if selector.operator != ExpressionOperator::In {
                    warn!(
                        key = %selector.key,
                        operator = %selector.operator,
                        "cannot resolve pods for a {} selector",
                        fault.kind()
                    );
                    continue;
                }
                for value in &selector.values {
                    for name in self.cluster.pods_matching_label(&selector.key, value).await? {
                        if let Some(&position) = positions.get(&name) {
                            pods[position].expect_death |= expect_death;
                            continue;
                        }
                        let Some(pod) = self.cluster.get_pod(&name).await? else {
                            warn!(pod = %name, "selected pod disappeared before it could be inspected");
                            continue;
                        };
                        positions.insert(name.clone(), pods.len());
                        pods.push(PodUnderTest {
                            name,
                            labels: pod.labels,
                            expect_death,
                        });
                    }
                }
            }
        }

        debug!(pods = pods.len(), "resolved pods under test");
        Ok(pods)
    }

    /// Checks, per health dimension, the pods under test that should have
    /// survived plus every bystander with the same label. Pods under test
    /// outside every dimension are checked last.
    pub async fn run_checks(&self, pods_under_test: &[PodUnderTest]) -> Result<Vec<PodHealthOutcome>> {
        let targeted: HashSet<&str> = pods_under_test.iter().map(|p| p.name.as_str()).collect();
        let mut checked: HashSet<String> = HashSet::new();
        let mut outcomes = Vec::new();

        for dimension in health_dimensions() {
            for pod in pods_under_test {
                let matches = pod.labels.get(LABEL_SERVICE_TYPE).map(String::as_str) == Some(dimension);
                if matches && !pod.expect_death && checked.insert(pod.name.clone()) {
                    outcomes.push(self.check_pod(&pod.name, true).await?);
                }
            }

            for name in self.cluster.pods_matching_label(LABEL_SERVICE_TYPE, dimension).await? {
                if !targeted.contains(name.as_str()) && checked.insert(name.clone()) {
                    outcomes.push(self.check_pod(&name, false).await?);
                }
            }
        }

        for pod in pods_under_test {
            if !pod.expect_death && checked.insert(pod.name.clone()) {
                outcomes.push(self.check_pod(&pod.name, true).await?);
            }
        }

        let unhealthy = outcomes.iter().filter(|o| !o.healthy).count();
        info!(checked = outcomes.len(), unhealthy, "health checks finished");
        Ok(outcomes)
    }

    async fn check_pod(&self, name: &str, under_test: bool) -> Result<PodHealthOutcome> {
        let outcome = match self.cluster.get_pod(name).await? {
            Some(pod) if pod.phase == PodPhase::Running => PodHealthOutcome {
                pod_name: name.to_string(),
                healthy: true,
                phase: Some(pod.phase.to_string()),
                reason: "pod is running".to_string(),
                under_test,
            },
            Some(pod) => PodHealthOutcome {
                pod_name: name.to_string(),
                healthy: false,
                phase: Some(pod.phase.to_string()),
                reason: format!("pod is {}", pod.phase),
                under_test,
            },
            None => PodHealthOutcome {
                pod_name: name.to_string(),
                healthy: false,
                phase: None,
                reason: "pod not found".to_string(),
                under_test,
            },
        };
        if !outcome.healthy {
            warn!(pod = %name, under_test, reason = %outcome.reason, "pod failed health check");
        }
        Ok(outcome)
    }
}
