// Session configuration
//
// Passed from the page as a JSON string; every field is optional.

use serde::{Deserialize, Serialize};

use crate::types::{DraftError, Result};

pub const DEFAULT_QUIET_PERIOD_MS: i64 = 1_500;
pub const DEFAULT_HISTORY_DEPTH: usize = 50;
pub const DEFAULT_CACHE_TTL_MS: i64 = 5 * 60 * 1_000;

/// Tunables for the editing-state controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Idle time after the last edit of a field before it is written
    pub quiet_period_ms: i64,
    /// Upper bound on undo (and redo) entries
    pub history_depth: usize,
    /// Snapshot cache lifetime
    pub cache_ttl_ms: i64,
    /// Force a write this long after the first unsaved edit of a field even
    /// while typing continues. `None` keeps pure debounce behaviour.
    pub max_latency_ms: Option<i64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            quiet_period_ms: DEFAULT_QUIET_PERIOD_MS,
            history_depth: DEFAULT_HISTORY_DEPTH,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            max_latency_ms: None,
        }
    }
}

impl SessionConfig {
    /// Parse from JSON, rejecting values that would stall the scheduler
    pub fn from_json(json: &str) -> Result<SessionConfig> {
        let config: SessionConfig = serde_json::from_str(json)
            .map_err(|e| DraftError::Serialization(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.quiet_period_ms < 0 {
            return Err(DraftError::Validation("quietPeriodMs must not be negative".to_string()));
        }
        if self.history_depth < 1 {
            return Err(DraftError::Validation("historyDepth must be at least 1".to_string()));
        }
        if self.cache_ttl_ms < 0 {
            return Err(DraftError::Validation("cacheTtlMs must not be negative".to_string()));
        }
        if let Some(max) = self.max_latency_ms {
            if max < self.quiet_period_ms {
                return Err(DraftError::Validation(
                    "maxLatencyMs must not be shorter than quietPeriodMs".to_string(),
                ));
            }
        }
        Ok(())
    }
}
