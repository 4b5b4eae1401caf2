//! Report scraping
//!
//! Extracts test and failure counts from an engine's textual report when the
//! engine offers no structured result API.

use regex::Regex;
use thiserror::Error;
use tracing::warn;

/// Pattern compilation errors
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("Invalid {name} pattern: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: regex::Error,
    },
}

/// Test and failure counts from one run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counts {
    pub tests: u32,
    pub failures: u32,
}

impl Counts {
    pub fn new(tests: u32, failures: u32) -> Self {
        Self { tests, failures }
    }
}

/// Summary patterns for one engine's report format
///
/// `summary` must capture the test count in group 1; the first match is the
/// summary line. Every match of `failures` inside that line contributes its
/// group 1 to the failure count.
#[derive(Clone, Debug)]
pub struct ReportPatterns {
    summary: Regex,
    failures: Option<Regex>,
}

impl ReportPatterns {
    pub fn new(summary: &str, failures: Option<&str>) -> Result<Self, PatternError> {
        let summary = Regex::new(summary).map_err(|source| PatternError::Invalid {
            name: "summary",
            source,
        })?;
        let failures = failures
            .map(Regex::new)
            .transpose()
            .map_err(|source| PatternError::Invalid {
                name: "failures",
                source,
            })?;
        Ok(Self { summary, failures })
    }

    /// Scrape counts from a captured report, defaulting to zero on a miss
    pub fn scrape(&self, report: &str) -> Counts {
        let Some(caps) = self.summary.captures(report) else {
            return Counts::default();
        };
        let tests = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0);
        let line = caps.get(0).map(|m| m.as_str()).unwrap_or_default();

        let failures: u32 = self
            .failures
            .as_ref()
            .map(|re| {
                re.captures_iter(line)
                    .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
                    .sum()
            })
            .unwrap_or(0);

        if failures > tests {
            warn!(
                "Report claims {} failures out of {} tests; clamping",
                failures, tests
            );
        }

        Counts::new(tests, failures.min(tests))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cucumber() -> ReportPatterns {
        ReportPatterns::new(
            r"(?m)^(\d+) scenarios?\b.*$",
            Some(r"(\d+) (?:failed|undefined)"),
        )
        .unwrap()
    }

    fn rspec() -> ReportPatterns {
        ReportPatterns::new(r"(?m)^(\d+) examples?, .*$", Some(r"(\d+) failures?")).unwrap()
    }

    #[test]
    fn test_cucumber_summary_with_failures() {
        let report = "Feature: x\n\n12 scenarios (2 failed, 10 passed)\n40 steps (2 failed, 38 passed)\n";
        assert_eq!(cucumber().scrape(report), Counts::new(12, 2));
    }

    #[test]
    fn test_cucumber_counts_undefined_as_failures() {
        let report = "3 scenarios (1 undefined, 1 failed, 1 passed)\n";
        assert_eq!(cucumber().scrape(report), Counts::new(3, 2));
    }

    #[test]
    fn test_cucumber_single_scenario() {
        assert_eq!(cucumber().scrape("1 scenario (1 passed)\n"), Counts::new(1, 0));
    }

    #[test]
    fn test_rspec_summary() {
        let report = ".....\n\nFinished in 0.1 seconds\n5 examples, 0 failures\n";
        assert_eq!(rspec().scrape(report), Counts::new(5, 0));

        let report = "3 examples, 1 failure, 1 pending\n";
        assert_eq!(rspec().scrape(report), Counts::new(3, 1));
    }

    #[test]
    fn test_scrape_miss_defaults_to_zero() {
        assert_eq!(cucumber().scrape("no summary here"), Counts::default());
        assert_eq!(rspec().scrape("no summary here"), Counts::default());
    }

    #[test]
    fn test_failures_never_exceed_tests() {
        let patterns = ReportPatterns::new(r"(\d+) tests.*$", Some(r"(\d+) bad")).unwrap();
        assert_eq!(patterns.scrape("2 tests, 5 bad"), Counts::new(2, 2));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(ReportPatterns::new("(", None).is_err());
    }
}
