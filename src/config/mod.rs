//! Configuration module
//!
//! Handles loading and layering worker configuration: config file, then
//! `NITRA_*` environment variables, then command-line flags.

#![allow(dead_code)]

mod env;
mod file;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::engine::EngineKind;
use crate::retry::{RetryPattern, RetryPolicy};

pub use env::EnvConfig;
pub use file::ConfigFile;

/// Worker configuration, read-only for the life of the worker
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Cucumber tag expression; runs everything when unset
    pub tags: Option<String>,

    /// Split whole files into units on first dispatch
    pub split_files: bool,

    /// Failures matching this pattern are handed back for another attempt
    pub exceptions_to_retry: Option<RetryPattern>,

    /// Total attempts allowed per file, including the first
    pub max_attempts: u32,

    /// Verbose worker logging
    pub debug: bool,

    /// Step definition directory passed to cucumber `--require`
    pub features_dir: String,

    /// Command used to launch cucumber
    pub cucumber_command: Vec<String>,

    /// Command used to launch rspec
    pub rspec_command: Vec<String>,

    /// Directory engines are run from
    pub working_dir: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            tags: None,
            split_files: false,
            exceptions_to_retry: None,
            max_attempts: 1,
            debug: false,
            features_dir: "features".to_string(),
            cucumber_command: default_command(EngineKind::Cucumber),
            rspec_command: default_command(EngineKind::Rspec),
            working_dir: None,
        }
    }
}

fn default_command(kind: EngineKind) -> Vec<String> {
    kind.engine()
        .default_command()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl WorkerConfig {
    /// Command configured for an engine
    pub fn command_for(&self, kind: EngineKind) -> Vec<String> {
        match kind {
            EngineKind::Cucumber => self.cucumber_command.clone(),
            EngineKind::Rspec => self.rspec_command.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.exceptions_to_retry.clone(), self.max_attempts)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            anyhow::bail!("max_attempts must be at least 1");
        }
        if self.features_dir.is_empty() {
            anyhow::bail!("features_dir must not be empty");
        }
        for kind in EngineKind::all() {
            if self.command_for(kind).is_empty() {
                anyhow::bail!("No command configured for {kind}");
            }
        }
        Ok(())
    }
}

/// Resolve configuration from an explicit path, the environment, or the
/// standard locations, with environment overrides applied last
pub fn resolve(path: Option<&str>) -> Result<WorkerConfig> {
    let env = EnvConfig::load();

    let path = path
        .map(PathBuf::from)
        .or_else(|| env.config_file.as_ref().map(PathBuf::from))
        .or_else(ConfigFile::find);

    let mut config = match &path {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            ConfigFile::load(path)?.worker
        }
        None => WorkerConfig::default(),
    };

    env.apply(&mut config)?;
    config.validate()?;
    Ok(config)
}
