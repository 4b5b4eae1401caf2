//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use anyhow::{Context, Result};
use std::env;

use super::WorkerConfig;
use crate::retry::RetryPattern;

/// Environment variable prefix
const ENV_PREFIX: &str = "NITRA";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Tag expression from NITRA_TAGS
    pub tags: Option<String>,
    /// File splitting from NITRA_SPLIT_FILES
    pub split_files: Option<bool>,
    /// Retry pattern from NITRA_EXCEPTIONS_TO_RETRY
    pub exceptions_to_retry: Option<String>,
    /// Attempt budget from NITRA_MAX_ATTEMPTS
    pub max_attempts: Option<u32>,
    /// Debug from NITRA_DEBUG
    pub debug: Option<bool>,
    /// Config file from NITRA_CONFIG
    pub config_file: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            tags: get_env("TAGS"),
            split_files: get_env_bool("SPLIT_FILES"),
            exceptions_to_retry: get_env("EXCEPTIONS_TO_RETRY"),
            max_attempts: get_env_parse("MAX_ATTEMPTS"),
            debug: get_env_bool("DEBUG"),
            config_file: get_env("CONFIG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.tags.is_some()
            || self.split_files.is_some()
            || self.exceptions_to_retry.is_some()
            || self.max_attempts.is_some()
            || self.debug.is_some()
            || self.config_file.is_some()
    }

    /// Override `config` with every variable that is set
    pub fn apply(&self, config: &mut WorkerConfig) -> Result<()> {
        if let Some(tags) = &self.tags {
            config.tags = Some(tags.clone());
        }
        if let Some(split) = self.split_files {
            config.split_files = split;
        }
        if let Some(pattern) = &self.exceptions_to_retry {
            config.exceptions_to_retry = Some(
                RetryPattern::new(pattern)
                    .with_context(|| format!("Invalid {ENV_PREFIX}_EXCEPTIONS_TO_RETRY"))?,
            );
        }
        if let Some(max) = self.max_attempts {
            config.max_attempts = max;
        }
        if let Some(debug) = self.debug {
            config.debug = debug;
        }
        Ok(())
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_TAGS:                {:?}", ENV_PREFIX, self.tags);
        println!("  {}_SPLIT_FILES:         {:?}", ENV_PREFIX, self.split_files);
        println!(
            "  {}_EXCEPTIONS_TO_RETRY: {:?}",
            ENV_PREFIX, self.exceptions_to_retry
        );
        println!("  {}_MAX_ATTEMPTS:        {:?}", ENV_PREFIX, self.max_attempts);
        println!("  {}_DEBUG:               {:?}", ENV_PREFIX, self.debug);
        println!("  {}_CONFIG:              {:?}", ENV_PREFIX, self.config_file);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Builder for setting environment variables in tests
#[cfg(test)]
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

#[cfg(test)]
impl EnvBuilder {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    fn var(mut self, name: &str, value: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_{name}"), value.into()));
        self
    }

    pub fn tags(self, tags: impl Into<String>) -> Self {
        self.var("TAGS", tags)
    }

    pub fn split_files(self, split: bool) -> Self {
        self.var("SPLIT_FILES", split.to_string())
    }

    pub fn exceptions_to_retry(self, pattern: impl Into<String>) -> Self {
        self.var("EXCEPTIONS_TO_RETRY", pattern)
    }

    pub fn max_attempts(self, max: u32) -> Self {
        self.var("MAX_ATTEMPTS", max.to_string())
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        for (key, value) in self.vars {
            env::set_var(key, value);
        }

        EnvGuard { previous }
    }
}

/// Guard that restores environment variables on drop
#[cfg(test)]
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

#[cfg(test)]
impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(config.tags.is_none());
        assert!(!config.has_any());
    }

    #[test]
    fn test_env_builder_and_apply() {
        let _guard = EnvBuilder::new()
            .tags("@smoke")
            .split_files(true)
            .exceptions_to_retry("Deadlock")
            .max_attempts(4)
            .apply_scoped();

        let env = EnvConfig::load();
        assert!(env.has_any());
        assert_eq!(env.tags.as_deref(), Some("@smoke"));
        assert_eq!(env.split_files, Some(true));

        let mut config = WorkerConfig::default();
        env.apply(&mut config).unwrap();
        assert_eq!(config.tags.as_deref(), Some("@smoke"));
        assert!(config.split_files);
        assert_eq!(config.max_attempts, 4);
        assert_eq!(
            config.exceptions_to_retry.as_ref().map(|p| p.as_str()),
            Some("Deadlock")
        );
    }

    #[test]
    fn test_invalid_env_pattern() {
        let env = EnvConfig {
            exceptions_to_retry: Some("(".to_string()),
            ..Default::default()
        };
        let mut config = WorkerConfig::default();
        assert!(env.apply(&mut config).is_err());
    }
}
