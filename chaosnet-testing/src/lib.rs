//! # Chaosnet Testing
//!
//! In-memory stand-ins for the three platforms an experiment talks to, plus
//! fixtures for scenario tests.
//!
//! - **InMemoryOrchestrator**: enclaves with service lists, scripted build
//!   event sequences, a call log and a reachability switch
//! - **ScriptedFaultPlatform**: per-submission status scripts, rejected
//!   submissions and pod phase effects
//! - **InMemoryCluster**: labelled pods whose phases tests can change
//!
//! [`SimulatedDeployment`] wires the three together with an in-memory
//! artifact sink.

pub mod cluster;
pub mod fault_platform;
pub mod fixtures;
pub mod orchestrator;

pub use cluster::InMemoryCluster;
pub use fault_platform::{RecordedSubmission, ScriptedFaultPlatform, SubmissionScript};
pub use fixtures::SimulatedDeployment;
pub use orchestrator::{successful_build_events, InMemoryOrchestrator, OrchestratorCall};
