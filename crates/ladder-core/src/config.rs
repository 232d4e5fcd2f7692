//! Engine tuning knobs.

use std::time::Duration;

use crate::domain::{LadderError, Result};

/// Upper bound on `get_last_completed_results`.
pub const LAST_COMPLETED_LIMIT: usize = 20;

/// Runtime configuration of a [`crate::ResultEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Delay handed to the scheduler for the next attempt.
    pub next_attempt_delay: Duration,
    /// How many recent completions the dashboard query returns (at most
    /// [`LAST_COMPLETED_LIMIT`]).
    pub recent_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            next_attempt_delay: Duration::ZERO,
            recent_limit: LAST_COMPLETED_LIMIT,
        }
    }
}

impl EngineConfig {
    pub fn with_next_attempt_delay(mut self, delay: Duration) -> Self {
        self.next_attempt_delay = delay;
        self
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit.min(LAST_COMPLETED_LIMIT);
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - LADDER_NEXT_ATTEMPT_DELAY_MS (optional, default: 0)
    /// - LADDER_RECENT_LIMIT (optional, default: 20, capped at 20)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup("LADDER_NEXT_ATTEMPT_DELAY_MS") {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                LadderError::Config(format!("LADDER_NEXT_ATTEMPT_DELAY_MS is not a number: {raw}"))
            })?;
            config = config.with_next_attempt_delay(Duration::from_millis(ms));
        }

        if let Some(raw) = lookup("LADDER_RECENT_LIMIT") {
            let limit: usize = raw.trim().parse().map_err(|_| {
                LadderError::Config(format!("LADDER_RECENT_LIMIT is not a number: {raw}"))
            })?;
            config = config.with_recent_limit(limit);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_run_next_attempt_immediately() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.next_attempt_delay, Duration::ZERO);
        assert_eq!(config.recent_limit, 20);
    }

    #[test]
    fn reads_delay_and_caps_limit() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("LADDER_NEXT_ATTEMPT_DELAY_MS", "250"),
            ("LADDER_RECENT_LIMIT", "500"),
        ]))
        .unwrap();
        assert_eq!(config.next_attempt_delay, Duration::from_millis(250));
        assert_eq!(config.recent_limit, LAST_COMPLETED_LIMIT);
    }

    #[test]
    fn rejects_garbage() {
        let err = EngineConfig::from_lookup(lookup(&[("LADDER_RECENT_LIMIT", "lots")]))
            .unwrap_err();
        assert!(matches!(err, LadderError::Config(_)));
    }
}
