//! Enclave lifecycle: decides when to create, destroy, attach to or rebuild
//! the devnet, and refuses to run against a devnet of the wrong shape.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use chaosnet_core::{
    CancellationToken, ChaosError, ClientDefaults, NetworkConfig, OrchestrationPlatform, Result, ServiceName,
    Topology,
};

use crate::config::EnclaveConfig;
use crate::events::consume_build_events;
use crate::notifications::{LifecycleNotification, LifecycleNotificationBus};

/// What the manager found when it looked at the enclave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnclaveState {
    NotExist,
    /// The enclave exists but runs no node services.
    ExistsEmpty,
    ExistsRunningMatch,
    ExistsRunningMismatch,
}

impl fmt::Display for EnclaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotExist => "not-exist",
            Self::ExistsEmpty => "exists-empty",
            Self::ExistsRunningMatch => "exists-running-match",
            Self::ExistsRunningMismatch => "exists-running-mismatch",
        };
        f.write_str(s)
    }
}

/// What `prepare_enclave` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareAction {
    /// Reused a running devnet of the declared shape.
    Attached,
    /// Built the network inside an existing, empty enclave.
    BuiltInExisting,
    /// Created a new enclave and built the network.
    Created,
    /// Destroyed the enclave, then created and built it again.
    Restarted,
}

struct Observation {
    state: EnclaveState,
    observed: Option<Topology>,
}

/// Sequences orchestration calls for one enclave.
///
/// There is exactly one manager per enclave per run; it holds no locks.
pub struct EnclaveManager {
    config: EnclaveConfig,
    platform: Arc<dyn OrchestrationPlatform>,
    network: NetworkConfig,
    declared: Topology,
    notifications: Arc<LifecycleNotificationBus>,
    cancel: CancellationToken,
}

impl EnclaveManager {
    /// The declared topology is derived from `network` once, up front.
    pub fn new(
        config: EnclaveConfig,
        platform: Arc<dyn OrchestrationPlatform>,
        network: NetworkConfig,
        defaults: &ClientDefaults,
    ) -> Result<Self> {
        let declared = Topology::from_network_config(&network, defaults)?;
        let notifications = Arc::new(LifecycleNotificationBus::with_capacity(config.notification_capacity));
        Ok(Self {
            config,
            platform,
            network,
            declared,
            notifications,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn enclave_name(&self) -> &str {
        &self.config.enclave_name
    }

    pub fn declared_topology(&self) -> &Topology {
        &self.declared
    }

    pub fn notifications(&self) -> Arc<LifecycleNotificationBus> {
        Arc::clone(&self.notifications)
    }

    pub async fn observe_state(&self) -> Result<EnclaveState> {
        Ok(self.inspect().await?.state)
    }

    async fn inspect(&self) -> Result<Observation> {
        let enclave = self.enclave_name();
        if !self.platform.enclave_exists(enclave).await? {
            return Ok(self.observed(EnclaveState::NotExist, None));
        }

        let node_services: Vec<String> = self
            .platform
            .running_service_names(enclave)
            .await?
            .into_iter()
            .filter(|name| ServiceName::looks_like_node_service(name))
            .collect();
        if node_services.is_empty() {
            return Ok(self.observed(EnclaveState::ExistsEmpty, None));
        }

        let observed = Topology::from_observed_services(&node_services[..])?;
        let state = if observed.is_equal(&self.declared) {
            EnclaveState::ExistsRunningMatch
        } else {
            EnclaveState::ExistsRunningMismatch
        };
        Ok(self.observed(state, Some(observed)))
    }

    fn observed(&self, state: EnclaveState, observed: Option<Topology>) -> Observation {
        debug!(enclave = %self.enclave_name(), %state, "observed enclave state");
        self.notifications.publish(LifecycleNotification::StateObserved {
            enclave: self.enclave_name().to_string(),
            state,
        });
        Observation { state, observed }
    }

    /// Gets the enclave ready to run tests against the declared network.
    ///
    /// With `restart` the enclave is always rebuilt from scratch. Without it
    /// a running devnet is reused only when its topology matches; a
    /// mismatched one is an error.
    pub async fn prepare_enclave(&self, restart: bool) -> Result<PrepareAction> {
        let enclave = self.enclave_name();

        if restart {
            info!(enclave = %enclave, "Restarting devnet from scratch");
            let existed = self.platform.enclave_exists(enclave).await?;
            if existed {
                self.destroy_and_settle().await?;
            }
            self.create_and_build().await?;
            return Ok(if existed {
                PrepareAction::Restarted
            } else {
                PrepareAction::Created
            });
        }

        let observation = self.inspect().await?;
        match observation.state {
            EnclaveState::NotExist => {
                info!(enclave = %enclave, "Enclave does not exist, creating it");
                self.create_and_build().await?;
                Ok(PrepareAction::Created)
            }
            EnclaveState::ExistsEmpty => {
                info!(enclave = %enclave, "Enclave exists without a devnet, building the network");
                self.build_network().await?;
                Ok(PrepareAction::BuiltInExisting)
            }
            EnclaveState::ExistsRunningMatch => {
                info!(enclave = %enclave, "Attaching to running devnet");
                self.notifications.publish(LifecycleNotification::Attached {
                    enclave: enclave.to_string(),
                });
                Ok(PrepareAction::Attached)
            }
            EnclaveState::ExistsRunningMismatch => {
                let observed = observation
                    .observed
                    .map(|t| t.to_string())
                    .unwrap_or_default();
                warn!(
                    enclave = %enclave,
                    declared = %self.declared,
                    observed = %observed,
                    "Running devnet does not match the declared topology"
                );
                Err(ChaosError::ConfigTopologyMismatch {
                    enclave: enclave.to_string(),
                    declared: self.declared.to_string(),
                    observed,
                })
            }
        }
    }

    /// Destroys the enclave if present, then recreates it and builds the
    /// network. Used to recover a devnet left broken by a test.
    pub async fn force_restart_devnet(&self) -> Result<()> {
        let enclave = self.enclave_name();
        info!(enclave = %enclave, "Force restarting devnet");
        if self.platform.enclave_exists(enclave).await? {
            self.destroy_and_settle().await?;
        } else {
            info!(enclave = %enclave, "Enclave has not been created yet, creating it now");
        }
        self.create_and_build().await
    }

    async fn destroy_and_settle(&self) -> Result<()> {
        let enclave = self.enclave_name();
        self.platform.destroy_enclave(enclave).await?;
        self.notifications.publish(LifecycleNotification::EnclaveDestroyed {
            enclave: enclave.to_string(),
        });
        info!(
            enclave = %enclave,
            delay = ?self.config.settle_delay,
            "Enclave destroyed, waiting for the platform to settle"
        );
        self.cancel.sleep(self.config.settle_delay, "platform settle delay").await?;
        self.notifications.publish(LifecycleNotification::PlatformSettled {
            enclave: enclave.to_string(),
        });
        Ok(())
    }

    async fn create_and_build(&self) -> Result<()> {
        let enclave = self.enclave_name();
        if self.platform.enclave_exists(enclave).await? {
            return Err(ChaosError::platform(
                "orchestration",
                format!("cannot create enclave {}: it still exists", enclave),
            ));
        }
        self.platform.create_enclave(enclave).await?;
        self.notifications.publish(LifecycleNotification::EnclaveCreated {
            enclave: enclave.to_string(),
        });
        self.build_network().await
    }

    async fn build_network(&self) -> Result<()> {
        let enclave = self.enclave_name();
        info!(enclave = %enclave, nodes = self.declared.len(), "Building network");
        let mut subscription = self.platform.build_network(enclave, &self.network).await?;

        let report = match self.config.build_timeout {
            Some(limit) => tokio::time::timeout(limit, consume_build_events(&mut subscription, &self.cancel))
                .await
                .map_err(|_| ChaosError::network_build(format!("network build timed out after {:?}", limit)))??,
            None => consume_build_events(&mut subscription, &self.cancel).await?,
        };

        info!(
            enclave = %enclave,
            events = report.events,
            warnings = report.warnings.len(),
            "Network build finished"
        );
        self.notifications.publish(LifecycleNotification::NetworkBuilt {
            enclave: enclave.to_string(),
            nodes: self.declared.len(),
        });
        Ok(())
    }
}
