//! Typed fault parameters parsed from `fault_config_dimensions` entries.

use std::fmt;
use std::time::Duration;

use chaosnet_core::duration::{format_duration, parse_duration};
use chaosnet_core::fault::PacketDirection;
use chaosnet_core::{ChaosError, Result};

use crate::config::FaultParamDimension;
use crate::vocabulary::FaultType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultParams {
    ClockSkew {
        skew: String,
        duration: Duration,
    },
    RestartFailures,
    IoLatency {
        delay: Duration,
        percent: u8,
        duration: Duration,
    },
    NetworkLatency {
        delay: Duration,
        jitter: Duration,
        duration: Duration,
        correlation: u8,
    },
    PacketDrop {
        percent: u8,
        direction: PacketDirection,
        duration: Duration,
    },
}

/// One parameter dimension: the fault parameters plus the health-check
/// grace period that goes with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDimension {
    pub params: FaultParams,
    pub grace_period: Option<Duration>,
}

impl fmt::Display for FaultParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClockSkew { skew, duration } => {
                write!(f, "skew={} duration={}", skew, format_duration(*duration))
            }
            Self::RestartFailures => f.write_str("restart"),
            Self::IoLatency {
                delay,
                percent,
                duration,
            } => write!(
                f,
                "delay={} percent={} duration={}",
                format_duration(*delay),
                percent,
                format_duration(*duration)
            ),
            Self::NetworkLatency {
                delay,
                jitter,
                duration,
                correlation,
            } => write!(
                f,
                "delay={} jitter={} correlation={} duration={}",
                format_duration(*delay),
                format_duration(*jitter),
                correlation,
                format_duration(*duration)
            ),
            Self::PacketDrop {
                percent,
                direction,
                duration,
            } => write!(
                f,
                "percent={} direction={} duration={}",
                percent,
                direction,
                format_duration(*duration)
            ),
        }
    }
}

struct Lookup<'a> {
    fault: FaultType,
    entries: &'a FaultParamDimension,
}

impl<'a> Lookup<'a> {
    fn raw(&self, key: &str) -> Result<Option<String>> {
        let Some(value) = self.entries.get(key) else {
            return Ok(None);
        };
        let text = match value {
            serde_yaml::Value::String(s) => s.clone(),
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            _ => {
                return Err(ChaosError::configuration(format!(
                    "{} parameter '{}' must be a scalar",
                    self.fault, key
                )))
            }
        };
        Ok(Some(text))
    }

    fn required(&self, key: &str) -> Result<String> {
        self.raw(key)?.ok_or_else(|| {
            ChaosError::configuration(format!("{} fault requires the '{}' parameter", self.fault, key))
        })
    }

    fn duration(&self, key: &str) -> Result<Duration> {
        parse_duration(&self.required(key)?)
    }

    fn percent(&self, key: &str) -> Result<u8> {
        let raw = self.required(key)?;
        raw.trim()
            .parse::<u8>()
            .ok()
            .filter(|p| *p <= 100)
            .ok_or_else(|| {
                ChaosError::configuration(format!(
                    "{} parameter '{}' must be an integer percentage between 0 and 100, got '{}'",
                    self.fault, key, raw
                ))
            })
    }
}

/// Accepts `-5m`, `+30s` or `90s`.
fn validate_skew(skew: &str) -> Result<()> {
    let magnitude = skew.trim().trim_start_matches(['-', '+']);
    parse_duration(magnitude).map(|_| ())
}

/// Parses one dimension for `fault`. Missing or malformed values are
/// configuration errors.
pub fn parse_dimension(fault: FaultType, entries: &FaultParamDimension) -> Result<ParamDimension> {
    let lookup = Lookup { fault, entries };
    let params = match fault {
        FaultType::ClockSkew => {
            let skew = lookup.required("skew")?;
            validate_skew(&skew)?;
            FaultParams::ClockSkew {
                skew: skew.trim().to_string(),
                duration: lookup.duration("duration")?,
            }
        }
        FaultType::RestartFailures => FaultParams::RestartFailures,
        FaultType::IoLatency => FaultParams::IoLatency {
            delay: lookup.duration("delay")?,
            percent: lookup.percent("percent")?,
            duration: lookup.duration("duration")?,
        },
        FaultType::NetworkLatency => FaultParams::NetworkLatency {
            delay: lookup.duration("delay")?,
            jitter: lookup.duration("jitter")?,
            duration: lookup.duration("duration")?,
            correlation: lookup.percent("correlation")?,
        },
        FaultType::PacketDrop => FaultParams::PacketDrop {
            percent: lookup.percent("percent")?,
            direction: lookup.required("direction")?.parse()?,
            duration: lookup.duration("duration")?,
        },
    };
    let grace_period = lookup
        .raw("grace_period")?
        .map(|raw| parse_duration(&raw))
        .transpose()?;
    Ok(ParamDimension { params, grace_period })
}

/// Parses every dimension. A fault without declared dimensions gets one
/// empty dimension, which only parameterless faults accept.
pub fn parse_dimensions(fault: FaultType, dimensions: &[FaultParamDimension]) -> Result<Vec<ParamDimension>> {
    if dimensions.is_empty() {
        return Ok(vec![parse_dimension(fault, &FaultParamDimension::new())?]);
    }
    dimensions.iter().map(|d| parse_dimension(fault, d)).collect()
}
