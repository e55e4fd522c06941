use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use chaosnet_core::{ArtifactSink, Result, SuiteTest, TestArtifact};

use crate::executor::{ExecutionContext, TestExecutor};

/// Summary of one suite run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub run_id: Uuid,
    pub tests_planned: usize,
    /// One artifact per executed test, in execution order.
    pub artifacts: Vec<TestArtifact>,
    /// Set when a failed test stopped the suite before its end.
    pub stopped_early: bool,
}

impl SuiteReport {
    pub fn passed(&self) -> bool {
        self.artifacts.iter().all(|a| a.passed) && self.artifacts.len() == self.tests_planned
    }

    pub fn tests_executed(&self) -> usize {
        self.artifacts.len()
    }
}

/// Runs tests strictly in order and stops at the first failed test.
pub struct SuiteRunner {
    context: ExecutionContext,
    sink: Arc<dyn ArtifactSink>,
}

impl SuiteRunner {
    pub fn new(context: ExecutionContext, sink: Arc<dyn ArtifactSink>) -> Self {
        Self { context, sink }
    }

    /// Every executed test yields an artifact; the collected artifacts are
    /// persisted at the end, and also when an execution error aborts the
    /// run.
    pub async fn run(&self, tests: &[SuiteTest]) -> Result<SuiteReport> {
        let run_id = Uuid::new_v4();
        info!(%run_id, tests = tests.len(), "Running test suite");

        let mut artifacts = Vec::with_capacity(tests.len());
        let mut stopped_early = false;

        for (i, test) in tests.iter().enumerate() {
            info!("Running test ({}/{}): '{}'", i + 1, tests.len(), test.test_name);
            match TestExecutor::new(test, &self.context).run().await {
                Ok(artifact) => {
                    let passed = artifact.passed;
                    artifacts.push(artifact);
                    if !passed {
                        warn!(test = %test.test_name, "Some health checks failed. Stopping test suite.");
                        stopped_early = i + 1 < tests.len();
                        break;
                    }
                    info!("Test #{} completed", i + 1);
                }
                Err(e) => {
                    error!("Error while running test #{}: {}", i + 1, e);
                    if let Err(persist_error) = self.sink.persist(&artifacts).await {
                        error!("Failed to persist artifacts after aborted run: {}", persist_error);
                    }
                    return Err(e);
                }
            }
        }

        self.sink.persist(&artifacts).await?;
        Ok(SuiteReport {
            run_id,
            tests_planned: tests.len(),
            artifacts,
            stopped_early,
        })
    }
}
