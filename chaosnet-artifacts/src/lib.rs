//! # Chaosnet Artifacts
//!
//! Sinks for the artifacts a suite run produces.
//!
//! ## Available Backends
//!
//! - **InMemoryArtifactSink**: keeps the last set in memory; used by tests and
//!   simulations
//! - **JsonFileArtifactSink**: one pretty-printed JSON file, replaced
//!   atomically on every persist
//!
//! ## Example
//!
//! ```rust
//! use chaosnet_artifacts::InMemoryArtifactSink;
//! use chaosnet_core::{ArtifactSink, TestArtifact};
//!
//! # tokio_test::block_on(async {
//! let sink = InMemoryArtifactSink::new();
//! let artifact = TestArtifact {
//!     test_name: "pod restart geth".to_string(),
//!     passed: true,
//!     health_results: vec![],
//!     pods_under_test: vec![],
//! };
//! sink.persist(&[artifact]).await.unwrap();
//! assert_eq!(sink.load().await.unwrap().len(), 1);
//! # });
//! ```

pub mod file_system;
pub mod in_memory;

pub use file_system::{JsonFileArtifactSink, DEFAULT_ARTIFACT_FILE};
pub use in_memory::InMemoryArtifactSink;
