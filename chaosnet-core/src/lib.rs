//! # Chaosnet Core - Chaos Experiments for Ephemeral Devnets
//!
//! Shared building blocks for planning and running chaos experiments against
//! blockchain test networks hosted in isolated enclaves.
//!
//! ## Components
//!
//! - **Client Model**: execution, consensus and validator client descriptors
//!   with default back-fill from an immutable [`ClientDefaults`] table
//! - **Service Names**: parsed `<role>-<index>-<client>-<paired>` identifiers
//! - **Topology**: node lists built from build parameters or from a running
//!   enclave, with fingerprint-based equality
//! - **Target Selection**: abstract targets resolved to label selectors
//! - **Faults**: typed fault payloads, plan steps and suite tests
//! - **Collaborators**: async traits for the orchestration platform, the
//!   fault-injection platform, cluster inspection and artifact sinks
//! - **Error Handling**: [`ChaosError`] and the crate-wide [`Result`] alias
//!
//! ## Example
//!
//! ```rust
//! use chaosnet_core::{ClientDefaults, Topology};
//!
//! let observed = Topology::from_observed_services(&[
//!     "el-1-geth-lighthouse",
//!     "cl-1-lighthouse-geth",
//! ]).unwrap();
//! assert_eq!(observed.len(), 1);
//! assert_eq!(observed.fingerprints()[0].to_string(), "#1 geth/lighthouse");
//! # let _ = ClientDefaults::standard();
//! ```

pub mod artifact;
pub mod cancel;
pub mod clients;
pub mod defaults;
pub mod duration;
pub mod error;
pub mod experiment;
pub mod fault;
pub mod network;
pub mod platform;
pub mod selector;
pub mod service;
pub mod topology;
pub mod types;

pub use artifact::{ArtifactSink, PodHealthOutcome, PodUnderTest, TestArtifact};
pub use cancel::CancellationToken;
pub use clients::{
    ConsensusClient, ExecutionClient, Labels, ValidatorClient, LABEL_CLIENT_TYPE, LABEL_SERVICE_ID,
    LABEL_SERVICE_TYPE,
};
pub use defaults::{ClientDefaults, ResourceDefaults};
pub use error::*;
pub use experiment::ExperimentConfig;
pub use fault::{FaultSpec, HealthCheckConfig, PlanStep, SuiteTest};
pub use network::{GenesisParams, NetworkConfig, Participant};
pub use platform::{
    BuildEvent, BuildSubscription, ClusterInspector, FaultHandle, FaultInjectionPlatform, FaultStatus,
    OrchestrationPlatform, PodInfo, PodPhase,
};
pub use selector::{ChaosTargetSelector, ExpressionOperator, ExpressionSelector, TargetDescription, TargetScope};
pub use service::ServiceName;
pub use topology::{Node, NodeFingerprint, Topology};
pub use types::*;
