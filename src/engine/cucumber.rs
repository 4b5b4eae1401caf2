//! Cucumber engine
//!
//! Runs `.feature` files with the pretty formatter. Dry runs list scenario
//! headers with `# path:line` comments; failures print as `message (Class)`.

use regex::Regex;
use std::sync::LazyLock;

use super::{DiscoveryError, Engine};
use crate::config::WorkerConfig;
use crate::models::Location;
use crate::retry::{FailureInfo, RetryAxis};
use crate::scrape::ReportPatterns;
use crate::split::DiscoveredUnit;

/// Tag expression used when no tags are configured
pub const DEFAULT_TAGS: &str = "~@run_everything";

static PATTERNS: LazyLock<ReportPatterns> = LazyLock::new(|| {
    ReportPatterns::new(
        r"(?m)^(\d+) scenarios?\b.*$",
        Some(r"(\d+) (?:failed|undefined)"),
    )
    .expect("cucumber summary patterns are valid")
});

static SCENARIO_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^\s*(Scenario Outline|Scenario Template|Scenario|Example):.*#\s*(\S+):(\d+)\s*$",
    )
    .expect("scenario header pattern is valid")
});

/// Last line of an exception: the message tail followed by `(ClassName)`
static EXCEPTION_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+(.*?)\s*\(([A-Z]\w*(?:::[A-Z]\w*)*)\)\s*$")
        .expect("exception end pattern is valid")
});

/// Step or scenario line carrying a `# path:line` source comment
static SOURCE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\s*\S+:\d+\s*$").expect("source comment pattern is valid"));

static BACKTRACE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+\S+:\d+:in\b").expect("backtrace pattern is valid"));

/// Cucumber worker variant
#[derive(Clone, Copy, Debug, Default)]
pub struct Cucumber;

impl Cucumber {
    fn tags_expression(config: &WorkerConfig) -> &str {
        config.tags.as_deref().unwrap_or(DEFAULT_TAGS)
    }
}

impl Engine for Cucumber {
    fn name(&self) -> &'static str {
        "cucumber"
    }

    fn filename_match(&self, filename: &str) -> bool {
        filename.contains(".feature")
    }

    fn minimal_file(&self) -> &'static str {
        "Feature: cucumber preloading\n  Scenario: a fake scenario\n"
    }

    fn preload_file_name(&self) -> &'static str {
        "nitra_preload.feature"
    }

    fn default_command(&self) -> &'static [&'static str] {
        &["cucumber"]
    }

    fn arguments(&self, target: &str, dry_run: bool, config: &WorkerConfig) -> Vec<String> {
        let mut args = vec![
            "--no-color".to_string(),
            "--format".to_string(),
            "pretty".to_string(),
            "--tags".to_string(),
            Self::tags_expression(config).to_string(),
            "--require".to_string(),
            config.features_dir.clone(),
        ];
        if dry_run {
            args.push("--dry-run".to_string());
        }
        args.push(target.to_string());
        args
    }

    fn report_patterns(&self) -> &ReportPatterns {
        &PATTERNS
    }

    fn retry_axis(&self) -> RetryAxis {
        RetryAxis::Failures
    }

    fn parse_discovery(&self, report: &str) -> Result<Vec<DiscoveredUnit>, DiscoveryError> {
        let units = SCENARIO_HEADER
            .captures_iter(report)
            .filter_map(|caps| {
                let line = caps[3].parse().ok()?;
                let location = Location::new(&caps[2], line);
                Some(match &caps[1] {
                    "Scenario Outline" | "Scenario Template" => {
                        DiscoveredUnit::Outline { location }
                    }
                    _ => DiscoveredUnit::Scenario { location },
                })
            })
            .collect();
        Ok(units)
    }

    /// Exceptions are printed under the failing step, possibly over several
    /// lines, and end with `(ClassName)` before the backtrace.
    fn parse_failures(&self, report: &str) -> Vec<FailureInfo> {
        let mut failures = Vec::new();
        let mut message: Vec<&str> = Vec::new();

        for line in report.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !line.starts_with(char::is_whitespace)
                || trimmed.starts_with('|')
                || SOURCE_COMMENT.is_match(line)
                || BACKTRACE_LINE.is_match(line)
            {
                message.clear();
                continue;
            }

            match EXCEPTION_END.captures(line) {
                Some(caps) => {
                    let tail = caps.get(1).map_or("", |m| m.as_str());
                    if !tail.is_empty() {
                        message.push(tail);
                    }
                    failures.push(FailureInfo::new(
                        message.join("\n"),
                        Some(caps[2].to_string()),
                    ));
                    message.clear();
                }
                None => message.push(trimmed),
            }
        }

        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRY_RUN: &str = "\
Feature: Login

  Scenario: successful login        # features/login.feature:3
    Given a user                    # features/step_definitions/user_steps.rb:1

  Scenario Outline: bad passwords   # features/login.feature:8
    Given a user with <password>    # features/step_definitions/user_steps.rb:5

    Examples:
      | password |
      | a        |
      | b        |

  Example: logout                   # features/login.feature:17
    Given a user                    # features/step_definitions/user_steps.rb:1

3 scenarios (3 skipped)
";

    #[test]
    fn test_arguments_default_tags() {
        let config = WorkerConfig::default();
        let args = Cucumber.arguments("features/a.feature", false, &config);
        assert_eq!(
            args,
            vec![
                "--no-color",
                "--format",
                "pretty",
                "--tags",
                DEFAULT_TAGS,
                "--require",
                "features",
                "features/a.feature"
            ]
        );
    }

    #[test]
    fn test_arguments_dry_run_with_tags() {
        let config = WorkerConfig {
            tags: Some("@smoke".to_string()),
            ..Default::default()
        };
        let args = Cucumber.arguments("features/a.feature", true, &config);
        assert!(args.contains(&"@smoke".to_string()));
        assert!(args.contains(&"--dry-run".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("features/a.feature"));
    }

    #[test]
    fn test_parse_discovery() {
        let units = Cucumber.parse_discovery(DRY_RUN).unwrap();
        assert_eq!(
            units,
            vec![
                DiscoveredUnit::Scenario {
                    location: Location::new("features/login.feature", 3)
                },
                DiscoveredUnit::Outline {
                    location: Location::new("features/login.feature", 8)
                },
                DiscoveredUnit::Scenario {
                    location: Location::new("features/login.feature", 17)
                },
            ]
        );
    }

    #[test]
    fn test_parse_failures() {
        let report = "\
  Scenario: flaky                   # features/a.feature:3
    When I fetch the page           # features/step_definitions/web_steps.rb:4
      execution expired (Net::ReadTimeout)
      ./features/step_definitions/web_steps.rb:5:in `block in <top (required)>'
    Then I see it                   # features/step_definitions/web_steps.rb:9

1 scenario (1 failed)
";
        let failures = Cucumber.parse_failures(report);
        assert_eq!(
            failures,
            vec![FailureInfo::new(
                "execution expired",
                Some("Net::ReadTimeout".to_string())
            )]
        );
    }

    #[test]
    fn test_parse_failures_multi_line_message() {
        let report = "\
  Scenario: transfer                # features/bank.feature:3
    When I move the money           # features/step_definitions/bank_steps.rb:7
      PG::TRDeadlockDetected: ERROR:  deadlock detected
      DETAIL:  Process 1 waits for ShareLock on transaction 2 (ActiveRecord::Deadlocked)
      ./app/models/account.rb:12:in `transfer!'
      ./features/step_definitions/bank_steps.rb:8:in `/^I move the money$/'
    Then the balance is updated     # features/step_definitions/bank_steps.rb:12

1 scenario (1 failed)
";
        let failures = Cucumber.parse_failures(report);
        assert_eq!(
            failures,
            vec![FailureInfo::new(
                "PG::TRDeadlockDetected: ERROR:  deadlock detected\n\
                 DETAIL:  Process 1 waits for ShareLock on transaction 2",
                Some("ActiveRecord::Deadlocked".to_string())
            )]
        );

        let policy = crate::retry::RetryPolicy::new(
            Some(crate::retry::RetryPattern::new("deadlock detected").unwrap()),
            3,
        );
        assert!(policy.evaluate(true, 1, RetryAxis::Failures, report, &failures));
    }

    #[test]
    fn test_summary_ignores_step_text() {
        let report = "\
  Scenario: listing                 # features/list.feature:3
    Then I see 7 scenarios listed   # features/step_definitions/list_steps.rb:2

1 scenario (1 passed)
3 steps (3 passed)
";
        let counts = Cucumber.report_patterns().scrape(report);
        assert_eq!((counts.tests, counts.failures), (1, 0));
    }

    #[test]
    fn test_summary_patterns() {
        let counts = Cucumber
            .report_patterns()
            .scrape("12 scenarios (2 failed, 10 passed)");
        assert_eq!((counts.tests, counts.failures), (12, 2));
    }
}
