//! Runner configuration.
//!
//! Configuration can be built in code or loaded from YAML/JSON. Every field is
//! optional in the file form; omitted fields fall back to the defaults.
//!
//! ```yaml
//! backoff:
//!   max_attempts: 10
//!   initial_delay_ms: 1
//!   multiplier: 2
//! step_timeout_ms: 2000
//! continuation: always
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{LitmusError, Result};
use crate::retry::BackoffPolicy;

/// What the runner does after a step reports a failure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuationPolicy {
    /// Record the failure and keep draining the queue
    #[default]
    Always,
    /// Drop the remaining steps after the first failure
    HaltOnFailure,
}

/// Configuration for a [`SequentialRunner`](crate::runner::SequentialRunner).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Backoff used by verification steps
    pub backoff: BackoffPolicy,
    /// Upper bound on a single step; `None` waits forever
    #[serde(rename = "step_timeout_ms", with = "option_millis")]
    pub step_timeout: Option<Duration>,
    /// Failure handling between steps
    pub continuation: ContinuationPolicy,
}

impl RunnerConfig {
    /// Sets the backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the per-step timeout.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }

    /// Sets the continuation policy.
    pub fn with_continuation(mut self, continuation: ContinuationPolicy) -> Self {
        self.continuation = continuation;
        self
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config file; `.json` files are read as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            _ => Self::from_yaml_str(&contents),
        }
    }

    /// Checks internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.backoff.multiplier == 0 {
            return Err(LitmusError::InvalidConfig(
                "backoff.multiplier must be at least 1".to_string(),
            ));
        }
        if let Some(cap) = self.backoff.max_delay {
            if cap < self.backoff.initial_delay {
                return Err(LitmusError::InvalidConfig(format!(
                    "backoff.max_delay_ms ({}) is below initial_delay_ms ({})",
                    cap.as_millis(),
                    self.backoff.initial_delay.as_millis()
                )));
            }
        }
        if self.step_timeout == Some(Duration::ZERO) {
            return Err(LitmusError::InvalidConfig(
                "step_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Serde adapter storing a `Duration` as whole milliseconds.
pub(crate) mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Serde adapter storing an optional `Duration` as whole milliseconds.
pub(crate) mod option_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = RunnerConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, RunnerConfig::default());
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
backoff:
  max_attempts: 5
  initial_delay_ms: 4
  multiplier: 3
  max_delay_ms: 100
step_timeout_ms: 2000
continuation: halt_on_failure
"#;
        let config = RunnerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.backoff.max_attempts, 5);
        assert_eq!(config.backoff.initial_delay, Duration::from_millis(4));
        assert_eq!(config.backoff.multiplier, 3);
        assert_eq!(config.backoff.max_delay, Some(Duration::from_millis(100)));
        assert_eq!(config.step_timeout, Some(Duration::from_secs(2)));
        assert_eq!(config.continuation, ContinuationPolicy::HaltOnFailure);
    }

    #[test]
    fn test_partial_backoff_keeps_defaults() {
        let config = RunnerConfig::from_yaml_str("backoff:\n  max_attempts: 3\n").unwrap();
        assert_eq!(config.backoff.max_attempts, 3);
        assert_eq!(config.backoff.initial_delay, Duration::from_millis(1));
        assert_eq!(config.step_timeout, None);
    }

    #[test]
    fn test_rejects_zero_multiplier() {
        let err = RunnerConfig::from_yaml_str("backoff:\n  multiplier: 0\n").unwrap_err();
        assert!(matches!(err, LitmusError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_cap_below_initial_delay() {
        let yaml = "backoff:\n  initial_delay_ms: 10\n  max_delay_ms: 5\n";
        assert!(RunnerConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = RunnerConfig::default()
            .with_step_timeout(Duration::from_millis(750))
            .with_continuation(ContinuationPolicy::HaltOnFailure);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"step_timeout_ms\":750"));
        assert_eq!(RunnerConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_from_file_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("runner.yaml");
        let mut file = std::fs::File::create(&yaml_path).unwrap();
        writeln!(file, "step_timeout_ms: 30").unwrap();
        let config = RunnerConfig::from_file(&yaml_path).unwrap();
        assert_eq!(config.step_timeout, Some(Duration::from_millis(30)));

        let json_path = dir.path().join("runner.json");
        std::fs::write(&json_path, r#"{"continuation":"halt_on_failure"}"#).unwrap();
        let config = RunnerConfig::from_file(&json_path).unwrap();
        assert_eq!(config.continuation, ContinuationPolicy::HaltOnFailure);
    }
}
