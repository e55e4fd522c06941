use std::sync::Arc;
use tracing::info;

use chaosnet_core::{
    ArtifactSink, CancellationToken, ClientDefaults, ClusterInspector, ExperimentConfig, FaultInjectionPlatform,
    OrchestrationPlatform, Result,
};
use chaosnet_enclave::{EnclaveConfig, EnclaveManager};

use crate::config::SequencerConfig;
use crate::executor::ExecutionContext;
use crate::health::HealthChecker;
use crate::runner::{SuiteReport, SuiteRunner};

/// External systems an experiment talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub orchestrator: Arc<dyn OrchestrationPlatform>,
    pub faults: Arc<dyn FaultInjectionPlatform>,
    pub cluster: Arc<dyn ClusterInspector>,
    pub sink: Arc<dyn ArtifactSink>,
}

/// Prepares the enclave, waits, then runs the suite of one experiment
/// document.
pub struct ExperimentService {
    config: ExperimentConfig,
    collaborators: Collaborators,
    defaults: Arc<ClientDefaults>,
    enclave_config: EnclaveConfig,
    sequencer_config: SequencerConfig,
    cancel: CancellationToken,
}

impl ExperimentService {
    pub fn new(config: ExperimentConfig, collaborators: Collaborators) -> Self {
        let enclave_config = EnclaveConfig::new(config.enclave_name.clone());
        Self {
            config,
            collaborators,
            defaults: Arc::new(ClientDefaults::standard()),
            enclave_config,
            sequencer_config: SequencerConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_defaults(mut self, defaults: Arc<ClientDefaults>) -> Self {
        self.defaults = defaults;
        self
    }

    /// The enclave name always comes from the experiment document.
    pub fn with_enclave_config(mut self, mut config: EnclaveConfig) -> Self {
        config.enclave_name = self.config.enclave_name.clone();
        self.enclave_config = config;
        self
    }

    pub fn with_sequencer_config(mut self, config: SequencerConfig) -> Self {
        self.sequencer_config = config;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn enclave_manager(&self) -> Result<EnclaveManager> {
        Ok(EnclaveManager::new(
            self.enclave_config.clone(),
            Arc::clone(&self.collaborators.orchestrator),
            self.config.network_config.clone(),
            &self.defaults,
        )?
        .with_cancellation(self.cancel.clone()))
    }

    /// Nothing reaches a platform when the document fails validation.
    pub async fn start_experiment(&self) -> Result<SuiteReport> {
        self.config.validate()?;
        info!(
            "Preparing the enclave for the experiment (restarting devnet = {})",
            self.config.start_new_devnet
        );
        let action = self
            .enclave_manager()?
            .prepare_enclave(self.config.start_new_devnet)
            .await?;
        info!(?action, enclave = %self.config.enclave_name, "Enclave ready");

        let wait = self
            .config
            .wait_before_injection
            .unwrap_or(self.sequencer_config.wait_before_injection);
        if !wait.is_zero() {
            info!("Waiting {:?} before starting fault injection", wait);
            self.cancel.sleep(wait, "wait before injection").await?;
        }

        let context = ExecutionContext {
            faults: Arc::clone(&self.collaborators.faults),
            health: Arc::new(HealthChecker::new(Arc::clone(&self.collaborators.cluster))),
            config: self.sequencer_config.clone(),
            cancel: self.cancel.clone(),
        };
        let runner = SuiteRunner::new(context, Arc::clone(&self.collaborators.sink));
        let report = runner.run(&self.config.tests).await?;
        info!(
            run_id = %report.run_id,
            executed = report.tests_executed(),
            planned = report.tests_planned,
            passed = report.passed(),
            "Experiment finished"
        );
        Ok(report)
    }

    /// Tears the devnet down and rebuilds it, whatever state it is in.
    pub async fn force_restart_devnet(&self) -> Result<()> {
        self.enclave_manager()?.force_restart_devnet().await
    }
}
