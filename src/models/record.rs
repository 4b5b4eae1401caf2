//! Result record models for worker runs
//!
//! Defines the record returned to the coordinator after every file run,
//! the unit locations produced by splitting, and the tagged run outcome.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Location of one runnable unit inside a test file (`path:line`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Parse a `path:line` unit identifier
    pub fn parse(unit: &str) -> Option<Self> {
        let (file, line) = unit.rsplit_once(':')?;
        if file.is_empty() {
            return None;
        }
        let line = line.parse().ok()?;
        Some(Self::new(file, line))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Whether a filename already addresses a single unit rather than a whole file
pub fn is_split_addressed(filename: &str) -> bool {
    filename.contains(':')
}

/// Result of a single `run_file` call, as sent to the coordinator
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub test_count: u32,
    pub failure_count: u32,
    pub failure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts_to_run: Option<Vec<String>>,
}

impl ResultRecord {
    /// Record for a real run
    pub fn ran(test_count: u32, failure_count: u32, failure: bool) -> Self {
        Self {
            test_count,
            failure_count,
            failure,
            parts_to_run: None,
        }
    }

    /// Record for a successful dry run; no tests were executed
    pub fn split(parts: Vec<String>) -> Self {
        Self {
            test_count: 0,
            failure_count: 0,
            failure: false,
            parts_to_run: Some(parts),
        }
    }

    /// Record for a dry run that could not load the file
    pub fn discovery_failed() -> Self {
        Self {
            test_count: 0,
            failure_count: 0,
            failure: true,
            parts_to_run: None,
        }
    }

    pub fn is_split(&self) -> bool {
        self.parts_to_run.is_some()
    }

    pub fn passed(&self) -> u32 {
        self.test_count.saturating_sub(self.failure_count)
    }
}

impl fmt::Display for ResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parts) = &self.parts_to_run {
            return write!(f, "split into {} parts", parts.len());
        }
        let symbol = if self.failure { "✗" } else { "✓" };
        write!(
            f,
            "{} {} tests, {} failures",
            symbol, self.test_count, self.failure_count
        )
    }
}

/// Outcome of `run_file`: either a record or a request to re-dispatch the file
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Ran(ResultRecord),
    RetryRequested { filename: String, attempt: u32 },
}

impl RunOutcome {
    pub fn record(&self) -> Option<&ResultRecord> {
        match self {
            RunOutcome::Ran(record) => Some(record),
            RunOutcome::RetryRequested { .. } => None,
        }
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, RunOutcome::RetryRequested { .. })
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Ran(record) => write!(f, "{record}"),
            RunOutcome::RetryRequested { filename, attempt } => {
                write!(f, "↻ {filename} retry requested after attempt {attempt}")
            }
        }
    }
}
