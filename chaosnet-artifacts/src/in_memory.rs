use async_trait::async_trait;
use chaosnet_core::{ArtifactSink, Result, TestArtifact};
use parking_lot::RwLock;
use std::sync::Arc;

/// Keeps the last persisted artifact set in memory.
///
/// Clones share the same storage, so a test can hand one clone to the
/// runner and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifactSink {
    artifacts: Arc<RwLock<Vec<TestArtifact>>>,
    persist_calls: Arc<RwLock<usize>>,
}

impl InMemoryArtifactSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<TestArtifact> {
        self.artifacts.read().clone()
    }

    /// Number of times `persist` was called.
    pub fn persist_calls(&self) -> usize {
        *self.persist_calls.read()
    }
}

#[async_trait]
impl ArtifactSink for InMemoryArtifactSink {
    async fn persist(&self, artifacts: &[TestArtifact]) -> Result<()> {
        *self.artifacts.write() = artifacts.to_vec();
        *self.persist_calls.write() += 1;
        Ok(())
    }

    async fn load(&self) -> Result<Vec<TestArtifact>> {
        Ok(self.snapshot())
    }
}
