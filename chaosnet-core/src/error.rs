//! # Error Types
//!
//! Error handling shared by every chaosnet crate.

use thiserror::Error;

/// Error types that can occur while planning or running a chaos experiment.
///
/// Configuration and compilation errors are deterministic given identical
/// input: they are raised before any platform call and are never retried.
/// Platform errors describe a collaborator that failed or could not be
/// reached; the caller may retry the whole run.
///
/// A failed post-fault health check is *not* an error. It is recorded in the
/// test artifact and stops the suite.
///
/// # Examples
///
/// ```rust
/// use chaosnet_core::ChaosError;
///
/// let error = ChaosError::configuration("unknown fault type 'Meteor'");
/// assert!(!error.is_retryable());
/// ```
#[derive(Error, Debug)]
pub enum ChaosError {
    /// The declarative input uses an unsupported vocabulary or value
    #[error("Invalid configuration: {reason}")]
    ConfigurationInvalid { reason: String },

    /// An observed service identifier does not follow the role-index-type pattern
    #[error("Unrecognized service name: {name}")]
    UnrecognizedServiceName { name: String },

    /// Observed services cannot be reconciled into a topology
    #[error("Inconsistent topology: {reason}")]
    TopologyInconsistent { reason: String },

    /// The running devnet has a different shape than the declared one
    #[error("Enclave {enclave} runs a different topology than declared (declared: {declared}; observed: {observed})")]
    ConfigTopologyMismatch {
        enclave: String,
        declared: String,
        observed: String,
    },

    /// A backend could not be reached at all
    #[error("{platform} platform is not reachable: {message}")]
    PlatformUnavailable { platform: String, message: String },

    /// A backend was reached but the call failed
    #[error("{platform} platform call failed: {message}")]
    Platform { platform: String, message: String },

    /// A fault type was given a selector shape it cannot express
    #[error("Unsupported selector: {reason}")]
    UnsupportedSelector { reason: String },

    /// A consensus client violates the validator sidecar invariant
    #[error("Consensus client {client} violates the sidecar invariant: {reason}")]
    SidecarInvariant { client: String, reason: String },

    /// The network build stream ended with an error or without success
    #[error("Network build failed: {reason}")]
    NetworkBuildFailed { reason: String },

    /// An injected fault reported an error status
    #[error("Fault {fault} failed: {reason}")]
    FaultFailed { fault: String, reason: String },

    /// Invalid test state machine transition attempted
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    /// The run was cancelled while waiting
    #[error("Cancelled during {operation}")]
    Cancelled { operation: String },

    /// JSON serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML document failure
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File system I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Type alias for Results in chaosnet.
pub type Result<T> = std::result::Result<T, ChaosError>;

/// Substrings a transport error carries when the backend is simply down.
const UNREACHABLE_MARKERS: &[&str] = &[
    "connection refused",
    "connect: connection refused",
    "no route to host",
    "not reachable",
];

impl ChaosError {
    /// Creates a new configuration error with the given reason.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::ConfigurationInvalid {
            reason: reason.into(),
        }
    }

    pub fn topology_inconsistent(reason: impl Into<String>) -> Self {
        Self::TopologyInconsistent {
            reason: reason.into(),
        }
    }

    pub fn unsupported_selector(reason: impl Into<String>) -> Self {
        Self::UnsupportedSelector {
            reason: reason.into(),
        }
    }

    pub fn network_build(reason: impl Into<String>) -> Self {
        Self::NetworkBuildFailed {
            reason: reason.into(),
        }
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classifies a raw backend failure.
    ///
    /// Connection-level failures become [`ChaosError::PlatformUnavailable`]
    /// so operators get a distinct "start the engine" message; everything
    /// else is a plain [`ChaosError::Platform`] failure.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chaosnet_core::ChaosError;
    ///
    /// let error = ChaosError::platform("orchestration", "dial tcp: connect: connection refused");
    /// assert!(matches!(error, ChaosError::PlatformUnavailable { .. }));
    /// ```
    pub fn platform(platform: impl Into<String>, message: impl Into<String>) -> Self {
        let platform = platform.into();
        let message = message.into();
        let lowered = message.to_lowercase();
        if UNREACHABLE_MARKERS.iter().any(|m| lowered.contains(m)) {
            Self::PlatformUnavailable {
                message: format!(
                    "could not connect to the {} engine; make sure it is running and reachable from this host ({})",
                    platform, message
                ),
                platform,
            }
        } else {
            Self::Platform { platform, message }
        }
    }

    /// Whether retrying the whole run could plausibly succeed.
    ///
    /// Nothing inside chaosnet retries; this is a hint for callers.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PlatformUnavailable { .. } | Self::Platform { .. } | Self::NetworkBuildFailed { .. }
        )
    }

    /// Whether the error was raised before any platform call could happen.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationInvalid { .. }
                | Self::UnsupportedSelector { .. }
                | Self::SidecarInvariant { .. }
        )
    }
}
