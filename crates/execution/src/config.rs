//! Manager configuration.

use clmm_yield_domain::range::DEFAULT_RANGE_WIDTH_SPACINGS;
use serde::{Deserialize, Serialize};

/// Configuration for the position manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Width of a new position's range, in tick spacings.
    pub range_width_spacings: u32,
    /// Minimum output accepted by the consolidating swap.
    pub swap_min_out: u128,
    /// Seconds added to the current time to form AMM call deadlines.
    pub deadline_slack_secs: u64,
    /// Per-token cap passed to fee collection.
    pub collect_max: u128,
    /// Idle asset at or below this amount is left undeployed by `tend`.
    pub min_tend_amount: u128,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            range_width_spacings: DEFAULT_RANGE_WIDTH_SPACINGS,
            // No slippage guard on the consolidating swap.
            swap_min_out: 0,
            // Deadline "now".
            deadline_slack_secs: 0,
            collect_max: u128::MAX,
            min_tend_amount: 0,
        }
    }
}

impl ManagerConfig {
    /// Deadline for an AMM call issued now.
    pub fn deadline(&self) -> i64 {
        let slack = i64::try_from(self.deadline_slack_secs).unwrap_or(i64::MAX);
        chrono::Utc::now().timestamp().saturating_add(slack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_config_default() {
        let config = ManagerConfig::default();
        assert_eq!(config.range_width_spacings, 100);
        assert_eq!(config.swap_min_out, 0);
        assert_eq!(config.collect_max, u128::MAX);
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: ManagerConfig = serde_json::from_str(r#"{"range_width_spacings": 40}"#).unwrap();
        assert_eq!(config.range_width_spacings, 40);
        assert_eq!(config.deadline_slack_secs, 0);
    }

    #[test]
    fn test_deadline_adds_slack() {
        let config = ManagerConfig {
            deadline_slack_secs: 600,
            ..Default::default()
        };
        let now = chrono::Utc::now().timestamp();
        assert!(config.deadline() >= now + 600);
    }
}
