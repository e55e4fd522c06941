use std::time::Duration;

/// Platform teardown keeps running after `destroy_enclave` returns.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(60);

/// Configuration for the enclave lifecycle manager
#[derive(Debug, Clone)]
pub struct EnclaveConfig {
    /// Name of the enclave hosting the devnet
    pub enclave_name: String,

    /// Wait after every destroy before the next platform call
    pub settle_delay: Duration,

    /// Upper bound for draining a network build, if any
    pub build_timeout: Option<Duration>,

    /// Capacity of the lifecycle notification channel
    pub notification_capacity: usize,
}

impl Default for EnclaveConfig {
    fn default() -> Self {
        Self {
            enclave_name: "chaosnet-devnet".to_string(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            build_timeout: None,
            notification_capacity: 64,
        }
    }
}

impl EnclaveConfig {
    pub fn new(enclave_name: impl Into<String>) -> Self {
        Self {
            enclave_name: enclave_name.into(),
            ..Default::default()
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_build_timeout(mut self, timeout: Duration) -> Self {
        self.build_timeout = Some(timeout);
        self
    }

    pub fn with_notification_capacity(mut self, capacity: usize) -> Self {
        self.notification_capacity = capacity.max(1);
        self
    }
}
