//! Retry policy for flaky failures
//!
//! Decides whether a failed run should be handed back to the coordinator for
//! another attempt. The worker never loops itself.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scrape::PatternError;

/// Compiled `exceptions_to_retry` pattern
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RetryPattern(Regex);

impl RetryPattern {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        Regex::new(pattern)
            .map(Self)
            .map_err(|source| PatternError::Invalid {
                name: "exceptions_to_retry",
                source,
            })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for RetryPattern {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<RetryPattern> for String {
    fn from(pattern: RetryPattern) -> Self {
        pattern.0.as_str().to_string()
    }
}

impl PartialEq for RetryPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Display for RetryPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failing test as reported by the engine
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FailureInfo {
    pub message: String,
    pub class_name: Option<String>,
}

impl FailureInfo {
    pub fn new(message: impl Into<String>, class_name: Option<String>) -> Self {
        Self {
            message: message.into(),
            class_name,
        }
    }
}

/// Where an engine exposes the text a retry pattern is matched against
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryAxis {
    /// The full captured report
    Report,
    /// Each failed test's exception message or exception class name
    Failures,
}

/// Pure retry decision.
///
/// Without a pattern retries are disabled entirely.
pub fn should_retry(
    failed: bool,
    attempt: u32,
    max_attempts: u32,
    failure_text: &str,
    pattern: Option<&RetryPattern>,
) -> bool {
    let Some(pattern) = pattern else {
        return false;
    };
    failed && attempt < max_attempts && pattern.is_match(failure_text)
}

/// Retry configuration applied to one run's evidence
#[derive(Clone, Debug, Default)]
pub struct RetryPolicy {
    pub pattern: Option<RetryPattern>,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(pattern: Option<RetryPattern>, max_attempts: u32) -> Self {
        Self {
            pattern,
            max_attempts,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.pattern.is_some() && self.max_attempts > 1
    }

    /// Evaluate a failed run along the engine's retry axis
    pub fn evaluate(
        &self,
        failed: bool,
        attempt: u32,
        axis: RetryAxis,
        report: &str,
        failures: &[FailureInfo],
    ) -> bool {
        let check = |text: &str| {
            should_retry(
                failed,
                attempt,
                self.max_attempts,
                text,
                self.pattern.as_ref(),
            )
        };

        match axis {
            RetryAxis::Report => check(report),
            RetryAxis::Failures => failures.iter().any(|failure| {
                check(&failure.message) || failure.class_name.as_deref().is_some_and(|class| check(class))
            }),
        }
    }
}
