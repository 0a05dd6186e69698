use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use vidgen_core::error::CoreError;
use vidgen_core::generation::{
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_MAX_ATTEMPTS, DEFAULT_PROVIDER,
};

/// Default root directory for cached artifacts.
pub const DEFAULT_CACHE_DIR: &str = "./data/storage";

/// Orchestration settings loaded from environment variables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Sleep between two provider status queries.
    pub poll_interval: Duration,
    /// Status queries before a job is failed with a timeout.
    pub poll_max_attempts: u32,
    /// Provider recorded on jobs that do not name one.
    pub default_provider: String,
    /// Root of the local artifact cache.
    pub cache_dir: PathBuf,
    /// Download finished videos into the cache and re-probe their duration.
    pub cache_enabled: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            poll_max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
            default_provider: DEFAULT_PROVIDER.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            cache_enabled: true,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default          |
    /// |----------------------------|------------------|
    /// | `VIDEO_POLL_INTERVAL_SECS` | `10`             |
    /// | `VIDEO_POLL_MAX_ATTEMPTS`  | `300`            |
    /// | `VIDEO_DEFAULT_PROVIDER`   | `doubao`         |
    /// | `VIDEO_CACHE_DIR`          | `./data/storage` |
    /// | `VIDEO_CACHE_ENABLED`      | `true`           |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PipelineConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let interval_secs: u64 =
            parse_var(&lookup, "VIDEO_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        if interval_secs == 0 {
            return Err(CoreError::Configuration(
                "VIDEO_POLL_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }

        let poll_max_attempts: u32 =
            parse_var(&lookup, "VIDEO_POLL_MAX_ATTEMPTS", DEFAULT_POLL_MAX_ATTEMPTS)?;
        if poll_max_attempts == 0 {
            return Err(CoreError::Configuration(
                "VIDEO_POLL_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let default_provider = lookup("VIDEO_DEFAULT_PROVIDER")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.default_provider);

        let cache_dir = lookup("VIDEO_CACHE_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);

        let cache_enabled = parse_var(&lookup, "VIDEO_CACHE_ENABLED", defaults.cache_enabled)?;

        Ok(Self {
            poll_interval: Duration::from_secs(interval_secs),
            poll_max_attempts,
            default_provider,
            cache_dir,
            cache_enabled,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, CoreError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| CoreError::Configuration(format!("{key}={raw:?} is invalid: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<PipelineConfig, CoreError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PipelineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.poll_max_attempts, 300);
        assert_eq!(config.default_provider, "doubao");
        assert_eq!(config.cache_dir, PathBuf::from("./data/storage"));
        assert!(config.cache_enabled);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("VIDEO_POLL_INTERVAL_SECS", "2"),
            ("VIDEO_POLL_MAX_ATTEMPTS", "5"),
            ("VIDEO_DEFAULT_PROVIDER", "minimax"),
            ("VIDEO_CACHE_ENABLED", "false"),
        ])
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.poll_max_attempts, 5);
        assert_eq!(config.default_provider, "minimax");
        assert!(!config.cache_enabled);
    }

    #[test]
    fn malformed_values_are_configuration_errors() {
        assert_matches!(
            load(&[("VIDEO_POLL_MAX_ATTEMPTS", "many")]),
            Err(CoreError::Configuration(_))
        );
        assert_matches!(
            load(&[("VIDEO_POLL_INTERVAL_SECS", "0")]),
            Err(CoreError::Configuration(_))
        );
    }
}
