use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::fault::SuiteTest;
use crate::network::NetworkConfig;
use crate::Result;

/// Everything needed to run one experiment: where, on what network, and
/// which tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub enclave_name: String,
    #[serde(default)]
    pub enclave_namespace: String,
    #[serde(default)]
    pub package_id: String,
    /// Destroy and rebuild the devnet before running.
    #[serde(default)]
    pub start_new_devnet: bool,
    /// Settle time between a ready devnet and the first injection.
    #[serde(default, with = "crate::duration::option", skip_serializing_if = "Option::is_none")]
    pub wait_before_injection: Option<Duration>,
    pub network_config: NetworkConfig,
    pub tests: Vec<SuiteTest>,
}

impl ExperimentConfig {
    /// Parses and validates a document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Pre-flight checks that need no platform: every injected fault must
    /// carry a selector its kind can express.
    pub fn validate(&self) -> Result<()> {
        for test in &self.tests {
            test.validate()?;
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_document() {
        let yaml = r#"
enclave_name: devnet-1
start_new_devnet: true
wait_before_injection: 2m
network_config:
  participants:
    - el_type: geth
      cl_type: lighthouse
tests:
  - testName: restart geth
    planSteps:
      - stepType: waitForDuration
        description: settle
        duration: 30s
    health:
      enableChecks: false
"#;
        let config = ExperimentConfig::from_yaml_str(yaml).unwrap();
        assert!(config.start_new_devnet);
        assert_eq!(config.wait_before_injection, Some(Duration::from_secs(120)));
        assert_eq!(config.tests.len(), 1);
        assert!(!config.tests[0].health.enable_checks);
    }

    #[test]
    fn test_io_latency_without_service_ids_is_rejected_on_load() {
        let yaml = r#"
enclave_name: devnet-1
network_config:
  participants:
    - el_type: geth
      cl_type: lighthouse
tests:
  - testName: io latency on every app pod
    planSteps:
      - stepType: injectFault
        description: inject io latency
        fault:
          kind: ioLatency
          selector:
            - key: app
              operator: Exists
              values: []
          volume_path: /data/geth/execution-data
          delay: 100ms
          percent: 50
          duration: 1m
      - stepType: waitForFaultCompletion
        description: wait
    health:
      enableChecks: true
"#;
        let err = ExperimentConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, crate::ChaosError::UnsupportedSelector { .. }));
    }
}
