//! Consumer for the ordered network-build event stream.

use tracing::{error, info, warn};

use chaosnet_core::{BuildEvent, BuildSubscription, CancellationToken, ChaosError, Result};

/// What a successful build reported along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub events: usize,
    pub warnings: Vec<String>,
    pub output: String,
}

/// Drains `subscription` until its terminal event.
///
/// Progress events repeat earlier step lines, so only lines not seen before
/// are logged. The subscription is closed as soon as the outcome is known:
/// on the terminal event, on the first error event, or on cancellation.
pub async fn consume_build_events(
    subscription: &mut BuildSubscription,
    cancel: &CancellationToken,
) -> Result<BuildReport> {
    let mut report = BuildReport::default();
    let mut progress_seen = 0usize;

    loop {
        let event = tokio::select! {
            event = subscription.next() => event,
            _ = cancel.cancelled() => {
                subscription.close();
                return Err(ChaosError::cancelled("network build"));
            }
        };

        let Some(event) = event else {
            return Err(ChaosError::network_build(
                "build event stream ended before the run finished",
            ));
        };
        report.events += 1;
        if event.is_terminal() {
            subscription.close();
        }

        match event {
            BuildEvent::Progress { current_step_info } => {
                for line in current_step_info.iter().skip(progress_seen) {
                    info!("[orchestrator] {}", line);
                }
                progress_seen = progress_seen.max(current_step_info.len());
            }
            BuildEvent::Info(message) => info!("[orchestrator] {}", message),
            BuildEvent::InstructionResult(result) => info!("[orchestrator] {}", result),
            BuildEvent::Warning(message) => {
                warn!("[orchestrator] {}", message);
                report.warnings.push(message);
            }
            BuildEvent::Error(message) => {
                error!("[orchestrator] {}", message);
                subscription.close();
                return Err(ChaosError::network_build(format!(
                    "deployment failed during execution: {}",
                    message
                )));
            }
            BuildEvent::RunFinished { successful, output } => {
                info!("[orchestrator] {}", output);
                if !successful {
                    error!("[orchestrator] network genesis failed");
                    return Err(ChaosError::network_build(format!("deployment failed: {}", output)));
                }
                info!("[orchestrator] network genesis successful");
                report.output = output;
                return Ok(report);
            }
        }
    }
}
