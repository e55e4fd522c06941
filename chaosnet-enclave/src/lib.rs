//! # Chaosnet Enclave
//!
//! Lifecycle management for the enclave hosting a devnet.
//!
//! This crate decides *when* to call the orchestration platform:
//! - create a missing enclave and build the network
//! - build the network inside an existing, empty enclave
//! - attach to a running devnet whose topology matches the declared one
//! - refuse a running devnet of a different shape
//! - destroy, wait for the platform to settle, and rebuild on request
//!
//! Network builds report progress as an ordered event stream which is
//! drained to its terminal event by [`consume_build_events`].

pub mod config;
pub mod events;
pub mod lifecycle;
pub mod notifications;

pub use config::{EnclaveConfig, DEFAULT_SETTLE_DELAY};
pub use events::{consume_build_events, BuildReport};
pub use lifecycle::{EnclaveManager, EnclaveState, PrepareAction};
pub use notifications::{LifecycleNotification, LifecycleNotificationBus, NotificationStats};
