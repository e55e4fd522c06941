use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::clients::Labels;
use crate::Result;

/// A pod resolved from a test's fault selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodUnderTest {
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
    /// Set when the fault that selected this pod is supposed to kill it.
    pub expect_death: bool,
}

/// Liveness verdict for one pod after a fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodHealthOutcome {
    pub pod_name: String,
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    pub reason: String,
    /// False for bystander pods.
    pub under_test: bool,
}

/// Outcome of one executed test. Never mutated once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestArtifact {
    pub test_name: String,
    pub passed: bool,
    pub health_results: Vec<PodHealthOutcome>,
    pub pods_under_test: Vec<PodUnderTest>,
}

impl TestArtifact {
    pub fn failed_pods(&self) -> impl Iterator<Item = &PodHealthOutcome> {
        self.health_results.iter().filter(|r| !r.healthy)
    }
}

/// Destination for test artifacts.
///
/// `persist` replaces whatever the sink held before with the given set.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn persist(&self, artifacts: &[TestArtifact]) -> Result<()>;

    /// Returns the last persisted set, or an empty list if nothing was
    /// persisted yet.
    async fn load(&self) -> Result<Vec<TestArtifact>>;
}
