use async_trait::async_trait;
use chaosnet_core::{ArtifactSink, Result, TestArtifact};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// File name used when none is given.
pub const DEFAULT_ARTIFACT_FILE: &str = "test-artifacts.json";

/// Stores the artifacts of a run as one pretty-printed JSON document.
///
/// Each `persist` replaces the file atomically, so a reader sees either the
/// previous run's artifacts or the new ones, never a partial write.
#[derive(Debug, Clone)]
pub struct JsonFileArtifactSink {
    path: PathBuf,
}

impl JsonFileArtifactSink {
    /// Creates a sink writing [`DEFAULT_ARTIFACT_FILE`] inside `dir`.
    ///
    /// # Errors
    /// * Returns error if the directory cannot be created
    pub async fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::with_file_name(dir, DEFAULT_ARTIFACT_FILE).await
    }

    pub async fn with_file_name<P: AsRef<Path>>(dir: P, file_name: &str) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            fs::create_dir_all(dir).await?;
        }
        Ok(Self {
            path: dir.join(file_name),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ArtifactSink for JsonFileArtifactSink {
    async fn persist(&self, artifacts: &[TestArtifact]) -> Result<()> {
        let document = serde_json::to_vec_pretty(artifacts)?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &document).await?;
        fs::rename(&temp_path, &self.path).await?;

        info!(
            path = %self.path.display(),
            artifacts = artifacts.len(),
            "Persisted test artifacts"
        );
        Ok(())
    }

    async fn load(&self) -> Result<Vec<TestArtifact>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no artifacts persisted yet");
            return Ok(Vec::new());
        }
        let document = fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&document)?)
    }
}
