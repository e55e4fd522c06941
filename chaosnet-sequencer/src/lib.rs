//! # Chaosnet Sequencer
//!
//! Executes compiled chaos tests against a prepared devnet.
//!
//! Each test moves through `Pending -> Injecting -> Waiting ->
//! HealthChecking -> Passed | Failed`. Tests run strictly one after the
//! other: a failed test stops the suite, and the artifacts gathered so far
//! are still persisted.
//!
//! ## Key Components
//!
//! - **TestExecutor**: the per-test state machine
//! - **HealthChecker**: liveness of pods under test and bystander pods
//! - **SuiteRunner**: fail-fast sequencing and artifact persistence
//! - **ExperimentService**: prepare the enclave, wait, run, report

pub mod config;
pub mod executor;
pub mod experiment;
pub mod health;
pub mod runner;

pub use config::SequencerConfig;
pub use executor::{ExecutionContext, TestExecutor, TestState};
pub use experiment::{Collaborators, ExperimentService};
pub use health::{health_dimensions, HealthChecker};
pub use runner::{SuiteReport, SuiteRunner};
