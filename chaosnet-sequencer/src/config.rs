use std::time::Duration;

/// Configuration for suite execution
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// How often submitted faults are polled while waiting for completion
    pub fault_poll_interval: Duration,

    /// Upper bound for one wait-for-completion step, if any
    pub fault_completion_timeout: Option<Duration>,

    /// Grace period for tests that do not set their own
    pub default_grace_period: Duration,

    /// Wait between a ready devnet and the first injection when the
    /// experiment document does not set one
    pub wait_before_injection: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            fault_poll_interval: Duration::from_secs(5),
            fault_completion_timeout: None,
            default_grace_period: Duration::ZERO,
            wait_before_injection: Duration::ZERO,
        }
    }
}

impl SequencerConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.fault_poll_interval = interval;
        self
    }

    pub fn with_fault_completion_timeout(mut self, timeout: Duration) -> Self {
        self.fault_completion_timeout = Some(timeout);
        self
    }

    pub fn with_default_grace_period(mut self, grace: Duration) -> Self {
        self.default_grace_period = grace;
        self
    }

    pub fn with_wait_before_injection(mut self, wait: Duration) -> Self {
        self.wait_before_injection = wait;
        self
    }
}
