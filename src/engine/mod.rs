//! Test engine variants
//!
//! Each supported engine is a flat implementation of [`Engine`]; the
//! coordinator picks one through [`EngineKind::for_filename`].

mod cucumber;
mod rspec;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::WorkerConfig;
use crate::retry::{FailureInfo, RetryAxis};
use crate::scrape::ReportPatterns;
use crate::split::DiscoveredUnit;

pub use cucumber::Cucumber;
pub use rspec::Rspec;

/// Dry-run output that could not be turned into discovered units
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("No discovery report found in dry-run output")]
    MissingReport,

    #[error("Malformed discovery report: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Engine-specific knowledge needed to drive one test framework
pub trait Engine: Sync {
    fn name(&self) -> &'static str;

    /// Whether a file belongs to this engine
    fn filename_match(&self, filename: &str) -> bool;

    /// Minimal valid test file used to warm the runtime
    fn minimal_file(&self) -> &'static str;

    /// File name the minimal file is written under
    fn preload_file_name(&self) -> &'static str;

    fn default_command(&self) -> &'static [&'static str];

    /// Command-line arguments for running `target`
    fn arguments(&self, target: &str, dry_run: bool, config: &WorkerConfig) -> Vec<String>;

    fn report_patterns(&self) -> &ReportPatterns;

    fn retry_axis(&self) -> RetryAxis;

    /// Units found by a dry run, in discovery order
    fn parse_discovery(&self, report: &str) -> Result<Vec<DiscoveredUnit>, DiscoveryError>;

    /// Failing tests named in a real run's report
    fn parse_failures(&self, report: &str) -> Vec<FailureInfo>;
}

static CUCUMBER: Cucumber = Cucumber;
static RSPEC: Rspec = Rspec;

/// Supported engines
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Cucumber,
    Rspec,
}

impl EngineKind {
    pub fn all() -> Vec<EngineKind> {
        vec![EngineKind::Cucumber, EngineKind::Rspec]
    }

    pub fn engine(&self) -> &'static dyn Engine {
        match self {
            EngineKind::Cucumber => &CUCUMBER,
            EngineKind::Rspec => &RSPEC,
        }
    }

    pub fn name(&self) -> &'static str {
        self.engine().name()
    }

    pub fn filename_match(&self, filename: &str) -> bool {
        self.engine().filename_match(filename)
    }

    /// Route a file to the engine that can run it
    pub fn for_filename(filename: &str) -> Option<EngineKind> {
        Self::all().into_iter().find(|kind| kind.filename_match(filename))
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cucumber" | "cuke" => Some(EngineKind::Cucumber),
            "rspec" => Some(EngineKind::Rspec),
            _ => None,
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
