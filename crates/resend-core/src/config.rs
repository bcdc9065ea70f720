use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backoff::BackoffSchedule;
use crate::classify::{StatusSet, DEFAULT_RETRYABLE_STATUSES};
use crate::evaluator::DefaultEvaluator;
use crate::policy::{RetryPolicy, DEFAULT_MAX_RETRIES};
use crate::transport::TransportOptions;

/// Retry parameters (`[retry]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of resubmissions per request.
    pub max_retries: u32,
    /// Delay before each retry in milliseconds; the last entry repeats.
    pub delay_schedule_ms: Vec<u64>,
    /// HTTP statuses the default evaluator retries.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay_schedule_ms: vec![1000, 3000, 5000],
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
        }
    }
}

impl RetryConfig {
    /// Build the immutable policy, using the default evaluator over
    /// `retryable_statuses`.
    pub fn to_policy(&self) -> RetryPolicy {
        let classifier = StatusSet::new(self.retryable_statuses.iter().copied());
        RetryPolicy::default()
            .with_max_retries(self.max_retries)
            .with_schedule(BackoffSchedule::from_millis(&self.delay_schedule_ms))
            .with_evaluator(DefaultEvaluator::with_classifier(classifier))
    }
}

/// libcurl transport settings (`[transport]` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    pub follow_redirects: bool,
    pub max_redirections: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            timeout_secs: 60,
            follow_redirects: true,
            max_redirections: 10,
        }
    }
}

impl TransportConfig {
    pub fn to_options(&self) -> TransportOptions {
        TransportOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            timeout: Duration::from_secs(self.timeout_secs),
            follow_redirects: self.follow_redirects,
            max_redirections: self.max_redirections,
        }
    }
}

/// Global configuration loaded from `~/.config/resend/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendConfig {
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

impl ResendConfig {
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("resend")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ResendConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ResendConfig::default();
        let toml = default_cfg.to_toml_string()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<ResendConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: ResendConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ResendConfig::default();
        assert_eq!(cfg.retry.max_retries, 3);
        assert_eq!(cfg.retry.delay_schedule_ms, vec![1000, 3000, 5000]);
        assert!(cfg.retry.retryable_statuses.contains(&429));
        assert!(cfg.transport.follow_redirects);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = ResendConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ResendConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg: ResendConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, ResendConfig::default());
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            [retry]
            max_retries = 5
            delay_schedule_ms = []

            [transport]
            timeout_secs = 5
        "#;
        let cfg: ResendConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.retry.max_retries, 5);
        assert!(cfg.retry.delay_schedule_ms.is_empty());
        // Unset fields keep their defaults.
        assert_eq!(cfg.retry.retryable_statuses, DEFAULT_RETRYABLE_STATUSES.to_vec());
        assert_eq!(cfg.transport.timeout_secs, 5);
        assert_eq!(cfg.transport.connect_timeout_secs, 15);
    }

    #[test]
    fn retry_config_builds_policy() {
        let rc = RetryConfig {
            max_retries: 2,
            delay_schedule_ms: vec![10, 20],
            retryable_statuses: vec![418],
        };
        let p = rc.to_policy();
        assert_eq!(p.max_retries, 2);
        assert_eq!(p.delay_for(1), Duration::from_millis(10));
        assert_eq!(p.delay_for(5), Duration::from_millis(20));
    }

    #[test]
    fn transport_config_to_options() {
        let tc = TransportConfig {
            connect_timeout_secs: 3,
            timeout_secs: 9,
            follow_redirects: false,
            max_redirections: 0,
        };
        let o = tc.to_options();
        assert_eq!(o.connect_timeout, Duration::from_secs(3));
        assert_eq!(o.timeout, Duration::from_secs(9));
        assert!(!o.follow_redirects);
    }

    #[test]
    fn load_from_file_and_report_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("config.toml");
        fs::write(&good, "[retry]\nmax_retries = 1\n").unwrap();
        assert_eq!(load_from(&good).unwrap().retry.max_retries, 1);

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[retry]\nmax_retries = \"many\"\n").unwrap();
        let err = load_from(&bad).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing config"));
    }
}
