//! Per-test state machine.
//!
//! ```text
//! Pending -> Injecting -> Waiting -> HealthChecking -> Passed | Failed
//!               ^            |   \
//!               +------------+    +-> Passed (checks disabled)
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use chaosnet_core::{
    CancellationToken, ChaosError, FaultHandle, FaultInjectionPlatform, FaultSpec, FaultStatus, PlanStep,
    PodHealthOutcome, PodUnderTest, Result, SuiteTest, TestArtifact,
};

use crate::config::SequencerConfig;
use crate::health::HealthChecker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestState {
    Pending,
    Injecting,
    Waiting,
    HealthChecking,
    Passed,
    Failed,
}

impl TestState {
    pub fn can_transition_to(self, next: TestState) -> bool {
        use TestState::*;
        matches!(
            (self, next),
            (Pending, Injecting)
                | (Pending, Waiting)
                | (Injecting, Waiting)
                | (Waiting, Injecting)
                | (Waiting, HealthChecking)
                | (Waiting, Passed)
                | (HealthChecking, Passed)
                | (HealthChecking, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Shared collaborators for executing tests.
#[derive(Clone)]
pub struct ExecutionContext {
    pub faults: Arc<dyn FaultInjectionPlatform>,
    pub health: Arc<HealthChecker>,
    pub config: SequencerConfig,
    pub cancel: CancellationToken,
}

struct Submitted {
    handle: FaultHandle,
    kind: &'static str,
}

/// Runs one [`SuiteTest`] from `Pending` to a terminal state.
pub struct TestExecutor<'a> {
    test: &'a SuiteTest,
    context: &'a ExecutionContext,
    state: TestState,
    outstanding: Vec<Submitted>,
    pods_under_test: Vec<PodUnderTest>,
}

impl<'a> TestExecutor<'a> {
    pub fn new(test: &'a SuiteTest, context: &'a ExecutionContext) -> Self {
        Self {
            test,
            context,
            state: TestState::Pending,
            outstanding: Vec::new(),
            pods_under_test: Vec::new(),
        }
    }

    pub fn state(&self) -> TestState {
        self.state
    }

    fn transition(&mut self, next: TestState) -> Result<()> {
        if self.state == next {
            return Ok(());
        }
        if !self.state.can_transition_to(next) {
            return Err(ChaosError::InvalidStateTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        debug!(test = %self.test.test_name, from = %self.state, to = %next, "test state transition");
        self.state = next;
        Ok(())
    }

    /// Executes every step, then the health checks when enabled.
    ///
    /// An error aborts the test; faults already submitted are left to the
    /// platform.
    pub async fn run(mut self) -> Result<TestArtifact> {
        let test = self.test;
        let context = self.context;

        // the pods may not survive the faults, so resolve them up front
        self.pods_under_test = context.health.resolve_pods_under_test(test.injected_faults()).await?;

        for step in &test.plan_steps {
            match step {
                PlanStep::InjectFault { description, fault } => {
                    self.transition(TestState::Injecting)?;
                    self.inject(description, fault).await?;
                }
                PlanStep::WaitForFaultCompletion { description } => {
                    self.transition(TestState::Waiting)?;
                    info!("{}", description);
                    self.wait_for_faults().await?;
                }
                PlanStep::WaitForDuration { description, duration } => {
                    self.transition(TestState::Waiting)?;
                    info!(duration = ?duration, "{}", description);
                    context.cancel.sleep(*duration, description).await?;
                }
            }
        }

        if self.state != TestState::Waiting || !self.outstanding.is_empty() {
            // nothing waited on the last injections yet
            self.transition(TestState::Waiting)?;
            self.wait_for_faults().await?;
        }

        if !test.health.enable_checks {
            info!(test = %test.test_name, "Skipping health checks");
            self.transition(TestState::Passed)?;
            return Ok(self.artifact(Vec::new()));
        }

        self.transition(TestState::HealthChecking)?;
        let grace = test.health.grace_period.unwrap_or(context.config.default_grace_period);
        if !grace.is_zero() {
            info!(grace = ?grace, "Waiting for the grace period before health checks");
            context.cancel.sleep(grace, "health check grace period").await?;
        }

        let outcomes = context.health.run_checks(&self.pods_under_test).await?;
        let passed = outcomes.iter().all(|o| o.healthy);
        self.transition(if passed { TestState::Passed } else { TestState::Failed })?;
        Ok(self.artifact(outcomes))
    }

    async fn inject(&mut self, description: &str, fault: &FaultSpec) -> Result<()> {
        info!(kind = fault.kind(), "{}", description);
        let handle = self.context.faults.submit_fault(fault).await?;
        debug!(%handle, "fault submitted");
        self.outstanding.push(Submitted {
            handle,
            kind: fault.kind(),
        });
        Ok(())
    }

    async fn wait_for_faults(&mut self) -> Result<()> {
        let started = Instant::now();
        let poll = self.context.config.fault_poll_interval;

        while !self.outstanding.is_empty() {
            let mut still_running = Vec::new();
            for submitted in self.outstanding.drain(..) {
                match self.context.faults.fault_status(&submitted.handle).await? {
                    FaultStatus::Complete => debug!(handle = %submitted.handle, "fault completed"),
                    FaultStatus::Pending => still_running.push(submitted),
                    FaultStatus::Error(reason) => {
                        return Err(ChaosError::FaultFailed {
                            fault: format!("{} ({})", submitted.kind, submitted.handle),
                            reason,
                        });
                    }
                }
            }
            self.outstanding = still_running;
            if self.outstanding.is_empty() {
                break;
            }

            if let Some(limit) = self.context.config.fault_completion_timeout {
                if started.elapsed() >= limit {
                    return Err(ChaosError::FaultFailed {
                        fault: format!("{} fault(s)", self.outstanding.len()),
                        reason: format!("not complete after {:?}", limit),
                    });
                }
            }
            self.context
                .cancel
                .sleep(poll.max(Duration::from_millis(1)), "wait for fault completion")
                .await?;
        }
        Ok(())
    }

    fn artifact(self, health_results: Vec<PodHealthOutcome>) -> TestArtifact {
        TestArtifact {
            test_name: self.test.test_name.clone(),
            passed: self.state == TestState::Passed,
            health_results,
            pods_under_test: self.pods_under_test,
        }
    }
}
