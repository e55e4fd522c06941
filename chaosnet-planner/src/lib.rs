//! # Chaosnet Planner
//!
//! Compiles a declarative fault configuration into a devnet topology and an
//! ordered list of chaos tests.
//!
//! Planning runs in stages:
//!
//! 1. **Validate** the fault section against the closed vocabularies
//! 2. **Size** the network from the multiplier and target share
//! 3. **Pair** the target client with every declared counterpart
//! 4. **Pad** with randomly drawn non-target nodes
//! 5. **Compile** one test per parameter dimension, targeting dimension and
//!    attack size
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chaosnet_core::ClientDefaults;
//! use chaosnet_planner::{Planner, PlannerConfig};
//! use std::sync::Arc;
//!
//! let config = PlannerConfig::from_yaml_file("planner.yaml").unwrap();
//! let mut planner = Planner::new(config, Arc::new(ClientDefaults::standard()));
//! let plan = planner.build_plan().unwrap();
//! let document = plan.to_experiment_config("chaos-devnet");
//! println!("{}", document.to_yaml().unwrap());
//! ```

pub mod composer;
pub mod config;
pub mod params;
pub mod plan;
pub mod sizing;
pub mod suite;
pub mod vocabulary;

pub use composer::ClientCatalog;
pub use config::{
    BootnodeConfig, ConsensusClientVersion, ExecutionClientVersion, FaultParamDimension, PlannerConfig,
    PlannerFaultConfig, TargetNetworkTopology,
};
pub use params::{FaultParams, ParamDimension};
pub use plan::{ExperimentPlan, Planner, BOOTNODE_INDEX};
pub use sizing::{calculate_network_size, NetworkSize};
pub use suite::{compile_suite, compose_fault_steps};
pub use vocabulary::{validate_fault_config, AttackSize, FaultType, TargetingDimension, ValidatedFaultConfig};
