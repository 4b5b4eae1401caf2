//! Preloading runtime adapters
//!
//! A runtime wraps one test engine for the whole life of a worker: it is
//! loaded once, runs many files, and is reset between runs without dropping
//! what it loaded.

mod guard;
mod process;

use std::io;
use thiserror::Error;

use crate::retry::FailureInfo;
use crate::scrape::Counts;
use crate::split::DiscoveredUnit;

pub use guard::ResetGuard;
pub use process::ProcessRuntime;

/// Runtime errors
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Runtime used before the environment was loaded")]
    NotLoaded,

    #[error("No command configured for {0}")]
    EmptyCommand(&'static str),

    #[error("Failed to load {engine} environment: {reason}")]
    LoadFailed { engine: &'static str, reason: String },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Lifecycle of a runtime instance
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RuntimeState {
    #[default]
    Unloaded,
    Loaded,
}

/// One engine execution request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub target: String,
    pub args: Vec<String>,
    pub dry_run: bool,
}

impl Invocation {
    pub fn new(target: impl Into<String>, args: Vec<String>, dry_run: bool) -> Self {
        Self {
            target: target.into(),
            args,
            dry_run,
        }
    }
}

/// What one engine execution produced
#[derive(Clone, Debug, Default)]
pub struct RunOutput {
    /// Captured report text
    pub report: String,
    pub failed: bool,
    pub failures: Vec<FailureInfo>,
    /// Units found by a dry run; `None` when discovery could not be read
    pub discovered: Option<Vec<DiscoveredUnit>>,
    /// Counts from the engine's own API, when it has one
    pub counts: Option<Counts>,
}

/// A long-lived, resettable test engine runtime
pub trait Runtime {
    /// Load the engine once. Calling again after success is a no-op.
    fn load(&mut self) -> Result<(), RuntimeError>;

    fn state(&self) -> RuntimeState;

    fn is_loaded(&self) -> bool {
        self.state() == RuntimeState::Loaded
    }

    /// Execute the engine and capture its report
    fn run(&mut self, invocation: &Invocation) -> Result<RunOutput, RuntimeError>;

    /// Clear per-run results and reporters, keeping loaded definitions
    fn reset(&mut self);
}
