use tracing::{debug, warn};

use chaosnet_core::{ChaosError, Result};

use crate::config::TargetNetworkTopology;

/// Node counts derived from a sizing policy. The bootnode is not included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkSize {
    /// Nodes produced by full pairing of the target client.
    pub base: usize,
    /// Nodes after padding; never smaller than `base`.
    pub target: usize,
}

/// `base = multiplier * counterpart_count`, then `target = ceil(base / p)`
/// when a target percentage `p` is set.
///
/// `p` must lie in `[0, 1)`. A `p` of exactly zero cannot size anything and
/// is treated as unset.
pub fn calculate_network_size(policy: &TargetNetworkTopology, counterpart_count: usize) -> Result<NetworkSize> {
    let multiplier = policy.multiplier();
    if multiplier == 0 {
        return Err(ChaosError::configuration("target_node_multiplier must be at least 1"));
    }
    let base = multiplier as usize * counterpart_count;

    let percent = match policy.target_as_percent_of_network {
        None => return Ok(NetworkSize { base, target: base }),
        Some(p) => p,
    };
    if percent.is_nan() || !(0.0..1.0).contains(&percent) {
        return Err(ChaosError::configuration(format!(
            "invalid value ({}) for target_as_percent_of_network, must be >= 0 and < 1",
            percent
        )));
    }
    if percent == 0.0 {
        warn!("target_as_percent_of_network is 0, ignoring it");
        return Ok(NetworkSize { base, target: base });
    }

    let raw = base as f64 / percent;
    // absorb float noise such as 3 / 0.3 = 10.000000000000002
    let target = ((raw - raw * 1e-12).ceil() as usize).max(base);
    debug!(base, target, percent, "calculated target network size");
    Ok(NetworkSize { base, target })
}
