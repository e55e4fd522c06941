use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use chaosnet_core::{
    ChaosError, FaultHandle, FaultInjectionPlatform, FaultSpec, FaultStatus, PodPhase, Result,
};

use crate::cluster::InMemoryCluster;

const PLATFORM: &str = "fault-injection";

/// How the platform treats one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionScript {
    /// Answers to successive status queries; the last one repeats.
    pub statuses: Vec<FaultStatus>,
    /// Refuse the submission with this message.
    pub rejection: Option<String>,
    /// Phase given to the selected pods of the attached cluster when the
    /// fault is submitted.
    pub pod_phase: Option<PodPhase>,
}

impl SubmissionScript {
    pub fn completes() -> Self {
        Self {
            statuses: vec![FaultStatus::Complete],
            rejection: None,
            pod_phase: None,
        }
    }

    /// Reports `Pending` for `polls` queries, then `Complete`.
    pub fn pending_for(polls: usize) -> Self {
        let mut statuses = vec![FaultStatus::Pending; polls];
        statuses.push(FaultStatus::Complete);
        Self {
            statuses,
            ..Self::completes()
        }
    }

    pub fn never_completes() -> Self {
        Self {
            statuses: vec![FaultStatus::Pending],
            ..Self::completes()
        }
    }

    pub fn errors(reason: impl Into<String>) -> Self {
        Self {
            statuses: vec![FaultStatus::Error(reason.into())],
            ..Self::completes()
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            rejection: Some(message.into()),
            ..Self::completes()
        }
    }

    pub fn with_pod_phase(mut self, phase: PodPhase) -> Self {
        self.pod_phase = Some(phase);
        self
    }
}

/// A submission as the platform received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSubmission {
    /// `None` when the submission was rejected.
    pub handle: Option<FaultHandle>,
    pub fault: FaultSpec,
}

#[derive(Debug)]
struct FaultPlatformState {
    scripts: VecDeque<SubmissionScript>,
    default_script: SubmissionScript,
    submissions: Vec<RecordedSubmission>,
    running: HashMap<FaultHandle, VecDeque<FaultStatus>>,
    status_queries: usize,
    reachable: bool,
}

/// Fault platform whose answers are scripted per submission, in order.
/// Submissions beyond the script use the default script, which completes
/// on the first poll unless replaced.
#[derive(Debug, Clone)]
pub struct ScriptedFaultPlatform {
    state: Arc<Mutex<FaultPlatformState>>,
    cluster: Option<InMemoryCluster>,
}

impl Default for ScriptedFaultPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedFaultPlatform {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FaultPlatformState {
                scripts: VecDeque::new(),
                default_script: SubmissionScript::completes(),
                submissions: Vec::new(),
                running: HashMap::new(),
                status_queries: 0,
                reachable: true,
            })),
            cluster: None,
        }
    }

    pub fn with_cluster(mut self, cluster: InMemoryCluster) -> Self {
        self.cluster = Some(cluster);
        self
    }

    pub fn with_default_script(self, script: SubmissionScript) -> Self {
        self.set_default_script(script);
        self
    }

    /// Script used once the queued scripts run out.
    pub fn set_default_script(&self, script: SubmissionScript) {
        self.state.lock().default_script = script;
    }

    /// Queues the script for the next unscripted submission.
    pub fn script(&self, script: SubmissionScript) {
        self.state.lock().scripts.push_back(script);
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().reachable = reachable;
    }

    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.state.lock().submissions.clone()
    }

    pub fn submitted_faults(&self) -> Vec<FaultSpec> {
        self.state
            .lock()
            .submissions
            .iter()
            .filter(|s| s.handle.is_some())
            .map(|s| s.fault.clone())
            .collect()
    }

    pub fn status_queries(&self) -> usize {
        self.state.lock().status_queries
    }
}

#[async_trait]
impl FaultInjectionPlatform for ScriptedFaultPlatform {
    async fn submit_fault(&self, fault: &FaultSpec) -> Result<FaultHandle> {
        let (handle, pod_phase) = {
            let mut state = self.state.lock();
            if !state.reachable {
                return Err(ChaosError::platform(PLATFORM, "connection refused"));
            }
            let script = match state.scripts.pop_front() {
                Some(script) => script,
                None => state.default_script.clone(),
            };
            if let Some(message) = script.rejection {
                state.submissions.push(RecordedSubmission {
                    handle: None,
                    fault: fault.clone(),
                });
                return Err(ChaosError::platform(PLATFORM, message));
            }

            let handle = FaultHandle(format!("{}-{}", fault.kind(), Uuid::new_v4()));
            state.submissions.push(RecordedSubmission {
                handle: Some(handle.clone()),
                fault: fault.clone(),
            });
            state.running.insert(handle.clone(), script.statuses.into());
            (handle, script.pod_phase)
        };

        if let (Some(phase), Some(cluster)) = (pod_phase, &self.cluster) {
            let changed = cluster.set_phase_matching(fault.selector(), phase);
            debug!(%handle, changed, %phase, "applied fault effect to pods");
        }
        Ok(handle)
    }

    async fn fault_status(&self, handle: &FaultHandle) -> Result<FaultStatus> {
        let mut state = self.state.lock();
        if !state.reachable {
            return Err(ChaosError::platform(PLATFORM, "connection refused"));
        }
        state.status_queries += 1;
        let statuses = state
            .running
            .get_mut(handle)
            .ok_or_else(|| ChaosError::platform(PLATFORM, format!("unknown fault {}", handle)))?;
        let status = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        Ok(status.unwrap_or(FaultStatus::Complete))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaosnet_core::fault::PodRestartFault;
    use chaosnet_core::ExpressionSelector;

    fn restart(pod: &str) -> FaultSpec {
        FaultSpec::PodRestart(PodRestartFault {
            selector: vec![ExpressionSelector::service_ids(vec![pod.to_string()])],
        })
    }

    #[tokio::test]
    async fn test_statuses_advance_and_last_one_sticks() {
        let platform = ScriptedFaultPlatform::new();
        platform.script(SubmissionScript::pending_for(2));
        let handle = platform.submit_fault(&restart("el-1-geth-teku")).await.unwrap();

        assert_eq!(platform.fault_status(&handle).await.unwrap(), FaultStatus::Pending);
        assert_eq!(platform.fault_status(&handle).await.unwrap(), FaultStatus::Pending);
        assert_eq!(platform.fault_status(&handle).await.unwrap(), FaultStatus::Complete);
        assert_eq!(platform.fault_status(&handle).await.unwrap(), FaultStatus::Complete);
        assert_eq!(platform.status_queries(), 4);
    }

    #[tokio::test]
    async fn test_rejected_submission_is_recorded_without_handle() {
        let platform = ScriptedFaultPlatform::new();
        platform.script(SubmissionScript::rejected("admission webhook denied the request"));

        let err = platform.submit_fault(&restart("el-1-geth-teku")).await.unwrap_err();
        assert!(matches!(err, ChaosError::Platform { .. }));
        assert_eq!(platform.submissions().len(), 1);
        assert!(platform.submitted_faults().is_empty());
    }

    #[tokio::test]
    async fn test_pod_phase_effect_hits_selected_pods() {
        let cluster = InMemoryCluster::new();
        cluster.add_pod("el-1-geth-teku", Default::default(), PodPhase::Running);
        cluster.add_pod("el-2-besu-teku", Default::default(), PodPhase::Running);
        let platform = ScriptedFaultPlatform::new().with_cluster(cluster.clone());
        platform.script(SubmissionScript::completes().with_pod_phase(PodPhase::Failed));

        platform.submit_fault(&restart("el-1-geth-teku")).await.unwrap();
        assert_eq!(cluster.phase("el-1-geth-teku"), Some(PodPhase::Failed));
        assert_eq!(cluster.phase("el-2-besu-teku"), Some(PodPhase::Running));
    }
}
