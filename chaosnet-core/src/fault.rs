//! # Faults and Plan Steps
//!
//! Each fault kind has its own typed payload. Payloads are only flattened
//! into a platform manifest in [`FaultSpec::to_manifest`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

use crate::duration::format_duration;
use crate::selector::ExpressionSelector;
use crate::{ChaosError, Result};

/// Chaos-mesh API group used for generated manifests.
pub const CHAOS_API_VERSION: &str = "chaos-mesh.org/v1alpha1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketDirection {
    To,
    From,
    Both,
}

impl std::str::FromStr for PacketDirection {
    type Err = ChaosError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "to" => Ok(Self::To),
            "from" => Ok(Self::From),
            "both" => Ok(Self::Both),
            other => Err(ChaosError::configuration(format!(
                "packet drop direction must be one of to, from, both (got '{}')",
                other
            ))),
        }
    }
}

impl fmt::Display for PacketDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::To => f.write_str("to"),
            Self::From => f.write_str("from"),
            Self::Both => f.write_str("both"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSkewFault {
    pub selector: Vec<ExpressionSelector>,
    /// Signed offset such as `-5m` or `+30s`.
    pub skew: String,
    #[serde(with = "crate::duration")]
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodRestartFault {
    pub selector: Vec<ExpressionSelector>,
}

/// I/O latency on one pod's data volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoLatencyFault {
    pub selector: Vec<ExpressionSelector>,
    pub volume_path: String,
    #[serde(with = "crate::duration")]
    pub delay: Duration,
    pub percent: u8,
    #[serde(with = "crate::duration")]
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkLatencyFault {
    pub selector: Vec<ExpressionSelector>,
    #[serde(with = "crate::duration")]
    pub delay: Duration,
    #[serde(with = "crate::duration")]
    pub jitter: Duration,
    pub correlation: u8,
    #[serde(with = "crate::duration")]
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketDropFault {
    pub selector: Vec<ExpressionSelector>,
    pub percent: u8,
    pub direction: PacketDirection,
    #[serde(with = "crate::duration")]
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FaultSpec {
    ClockSkew(ClockSkewFault),
    PodRestart(PodRestartFault),
    IoLatency(IoLatencyFault),
    NetworkLatency(NetworkLatencyFault),
    PacketDrop(PacketDropFault),
}

impl FaultSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ClockSkew(_) => "clock-skew",
            Self::PodRestart(_) => "pod-restart",
            Self::IoLatency(_) => "io-latency",
            Self::NetworkLatency(_) => "network-latency",
            Self::PacketDrop(_) => "packet-drop",
        }
    }

    pub fn selector(&self) -> &[ExpressionSelector] {
        match self {
            Self::ClockSkew(f) => &f.selector,
            Self::PodRestart(f) => &f.selector,
            Self::IoLatency(f) => &f.selector,
            Self::NetworkLatency(f) => &f.selector,
            Self::PacketDrop(f) => &f.selector,
        }
    }

    /// Pods hit by this fault are expected to die and come back.
    pub fn expects_pod_death(&self) -> bool {
        matches!(self, Self::PodRestart(_))
    }

    /// Rejects selector shapes this fault kind cannot express.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::IoLatency(f) => ensure_service_id_selectors(&f.selector, "I/O latency"),
            other if other.selector().is_empty() => Err(ChaosError::unsupported_selector(format!(
                "{} fault has no selector",
                other.kind()
            ))),
            _ => Ok(()),
        }
    }

    /// Flattens the payload into a chaos-mesh custom resource.
    pub fn to_manifest(&self, namespace: &str, name: &str) -> Value {
        let selector = json!({
            "namespaces": [namespace],
            "expressionSelectors": self.selector(),
        });
        let (kind, spec) = match self {
            Self::ClockSkew(f) => (
                "TimeChaos",
                json!({
                    "mode": "all",
                    "selector": selector,
                    "timeOffset": f.skew,
                    "duration": format_duration(f.duration),
                }),
            ),
            Self::PodRestart(_) => (
                "PodChaos",
                json!({
                    "mode": "all",
                    "action": "pod-kill",
                    "selector": selector,
                }),
            ),
            Self::IoLatency(f) => (
                "IOChaos",
                json!({
                    "mode": "all",
                    "action": "latency",
                    "selector": selector,
                    "volumePath": f.volume_path,
                    "path": format!("{}/**/*", f.volume_path),
                    "delay": format_duration(f.delay),
                    "percent": f.percent,
                    "duration": format_duration(f.duration),
                }),
            ),
            Self::NetworkLatency(f) => (
                "NetworkChaos",
                json!({
                    "mode": "all",
                    "action": "delay",
                    "selector": selector,
                    "delay": {
                        "latency": format_duration(f.delay),
                        "jitter": format_duration(f.jitter),
                        "correlation": f.correlation.to_string(),
                    },
                    "duration": format_duration(f.duration),
                }),
            ),
            Self::PacketDrop(f) => (
                "NetworkChaos",
                json!({
                    "mode": "all",
                    "action": "loss",
                    "selector": selector,
                    "direction": f.direction.to_string(),
                    "loss": { "loss": f.percent.to_string() },
                    "duration": format_duration(f.duration),
                }),
            ),
        };
        json!({
            "apiVersion": CHAOS_API_VERSION,
            "kind": kind,
            "metadata": { "name": name, "namespace": namespace },
            "spec": spec,
        })
    }
}

/// Rejects selectors that do not name pods by service id with `In`.
///
/// Faults that need a per-pod resource path can only target pods whose
/// identity is known when the plan is compiled.
pub fn ensure_service_id_selectors(selectors: &[ExpressionSelector], fault: &str) -> Result<()> {
    if selectors.is_empty() {
        return Err(ChaosError::unsupported_selector(format!("{} fault has no selector", fault)));
    }
    for selector in selectors {
        if selector.key != crate::clients::LABEL_SERVICE_ID {
            return Err(ChaosError::unsupported_selector(format!(
                "{} faults can only target pods by service id, got key '{}'",
                fault, selector.key
            )));
        }
        if selector.operator != crate::selector::ExpressionOperator::In {
            return Err(ChaosError::unsupported_selector(format!(
                "{} faults can only use the 'In' operator, got '{}'",
                fault, selector.operator
            )));
        }
    }
    Ok(())
}

/// One instruction of a test, tagged by `stepType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stepType", rename_all = "camelCase")]
pub enum PlanStep {
    InjectFault {
        description: String,
        fault: FaultSpec,
    },
    WaitForFaultCompletion {
        description: String,
    },
    WaitForDuration {
        description: String,
        #[serde(with = "crate::duration")]
        duration: Duration,
    },
}

impl PlanStep {
    pub fn inject(description: impl Into<String>, fault: FaultSpec) -> Self {
        Self::InjectFault {
            description: description.into(),
            fault,
        }
    }

    pub fn wait_for_faults() -> Self {
        Self::WaitForFaultCompletion {
            description: "wait for faults to terminate".to_string(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::InjectFault { description, .. }
            | Self::WaitForFaultCompletion { description }
            | Self::WaitForDuration { description, .. } => description,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckConfig {
    pub enable_checks: bool,
    #[serde(default, with = "crate::duration::option", skip_serializing_if = "Option::is_none")]
    pub grace_period: Option<Duration>,
}

impl HealthCheckConfig {
    pub fn enabled(grace_period: Option<Duration>) -> Self {
        Self {
            enable_checks: true,
            grace_period,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteTest {
    pub test_name: String,
    pub plan_steps: Vec<PlanStep>,
    pub health: HealthCheckConfig,
}

impl SuiteTest {
    /// Checks every injected fault before anything is submitted.
    pub fn validate(&self) -> Result<()> {
        for fault in self.injected_faults() {
            fault.validate().map_err(|e| match e {
                ChaosError::UnsupportedSelector { reason } => {
                    ChaosError::unsupported_selector(format!("test '{}': {}", self.test_name, reason))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    pub fn injected_faults(&self) -> impl Iterator<Item = &FaultSpec> {
        self.plan_steps.iter().filter_map(|step| match step {
            PlanStep::InjectFault { fault, .. } => Some(fault),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::ExpressionOperator;

    fn pod(name: &str) -> Vec<ExpressionSelector> {
        vec![ExpressionSelector::service_ids(vec![name.to_string()])]
    }

    #[test]
    fn test_plan_step_yaml_is_tagged_by_step_type() {
        let step = PlanStep::inject(
            "Restart target node(s) #2",
            FaultSpec::PodRestart(PodRestartFault {
                selector: pod("el-2-geth-teku"),
            }),
        );
        let yaml = serde_yaml::to_string(&step).unwrap();
        assert!(yaml.contains("stepType: injectFault"));
        assert!(yaml.contains("kind: podRestart"));

        let back: PlanStep = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn test_manifest_flattens_payload() {
        let fault = FaultSpec::NetworkLatency(NetworkLatencyFault {
            selector: pod("cl-1-teku-geth"),
            delay: Duration::from_millis(300),
            jitter: Duration::from_millis(50),
            correlation: 25,
            duration: Duration::from_secs(120),
        });
        let manifest = fault.to_manifest("chaos", "latency-1");
        assert_eq!(manifest["kind"], "NetworkChaos");
        assert_eq!(manifest["metadata"]["namespace"], "chaos");
        assert_eq!(manifest["spec"]["delay"]["latency"], "300ms");
        assert_eq!(manifest["spec"]["duration"], "2m");
        assert_eq!(
            manifest["spec"]["selector"]["expressionSelectors"][0]["key"],
            "kurtosistech.com/id"
        );
    }

    #[test]
    fn test_only_restarts_expect_death() {
        let restart = FaultSpec::PodRestart(PodRestartFault { selector: pod("a") });
        let skew = FaultSpec::ClockSkew(ClockSkewFault {
            selector: pod("a"),
            skew: "-5m".to_string(),
            duration: Duration::from_secs(60),
        });
        assert!(restart.expects_pod_death());
        assert!(!skew.expects_pod_death());
    }

    #[test]
    fn test_service_id_selector_check() {
        assert!(ensure_service_id_selectors(&pod("el-1-geth-teku"), "i/o latency").is_ok());

        let exists = vec![ExpressionSelector::new(
            crate::clients::LABEL_SERVICE_ID,
            ExpressionOperator::Exists,
            vec![],
        )];
        assert!(matches!(
            ensure_service_id_selectors(&exists, "i/o latency"),
            Err(ChaosError::UnsupportedSelector { .. })
        ));
    }

    #[test]
    fn test_suite_test_rejects_inexpressible_selectors() {
        let exists = vec![ExpressionSelector::new("app", ExpressionOperator::Exists, vec![])];
        let io = FaultSpec::IoLatency(IoLatencyFault {
            selector: exists,
            volume_path: "/data/geth/execution-data".to_string(),
            delay: Duration::from_millis(100),
            percent: 50,
            duration: Duration::from_secs(60),
        });
        let test = SuiteTest {
            test_name: "io on everything".to_string(),
            plan_steps: vec![PlanStep::inject("inject io", io), PlanStep::wait_for_faults()],
            health: HealthCheckConfig::disabled(),
        };
        match test.validate() {
            Err(ChaosError::UnsupportedSelector { reason }) => assert!(reason.contains("io on everything")),
            other => panic!("unexpected result {:?}", other),
        }

        let unselected = SuiteTest {
            test_name: "restart nothing".to_string(),
            plan_steps: vec![PlanStep::inject(
                "inject restart",
                FaultSpec::PodRestart(PodRestartFault { selector: vec![] }),
            )],
            health: HealthCheckConfig::disabled(),
        };
        assert!(matches!(
            unselected.validate(),
            Err(ChaosError::UnsupportedSelector { .. })
        ));

        let restart = SuiteTest {
            test_name: "restart el-1".to_string(),
            plan_steps: vec![PlanStep::inject(
                "inject restart",
                FaultSpec::PodRestart(PodRestartFault { selector: pod("el-1-geth-teku") }),
            )],
            health: HealthCheckConfig::enabled(None),
        };
        assert!(restart.validate().is_ok());
    }

    #[test]
    fn test_health_config_defaults() {
        let config: HealthCheckConfig = serde_yaml::from_str("enableChecks: true").unwrap();
        assert!(config.enable_checks);
        assert_eq!(config.grace_period, None);

        let config: HealthCheckConfig =
            serde_yaml::from_str("enableChecks: true\ngracePeriod: 30s").unwrap();
        assert_eq!(config.grace_period, Some(Duration::from_secs(30)));
    }
}
