//! Output formatters for run outcomes
//!
//! Provides JSON, table, and summary output formats.

use std::io::Write;

use crate::executor::Response;
use crate::models::{ResultRecord, RunOutcome};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Summary,
}

impl OutputFormat {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Outcome formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Format the outcome of running `filename`
    pub fn format_outcome(&self, filename: &str, outcome: &RunOutcome) -> String {
        match self.format {
            OutputFormat::Table => self.format_outcome_table(filename, outcome),
            OutputFormat::Json => {
                serde_json::to_string(&Response::from(outcome.clone())).unwrap_or_default()
            }
            OutputFormat::JsonPretty => {
                serde_json::to_string_pretty(&Response::from(outcome.clone())).unwrap_or_default()
            }
            OutputFormat::Summary => format!("{filename}: {outcome}"),
        }
    }

    fn paint(&self, text: &str, color: &str) -> String {
        if self.colorize {
            format!("\x1b[{color}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn format_outcome_table(&self, filename: &str, outcome: &RunOutcome) -> String {
        let mut output = String::new();

        output.push_str("\n╔══════════════════════════════════════════════════════════════╗\n");
        output.push_str(&format!("║  {filename:60}║\n"));
        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        match outcome {
            RunOutcome::Ran(record) if record.is_split() => {
                self.push_parts(&mut output, record);
            }
            RunOutcome::Ran(record) => {
                let status = if record.failure {
                    self.paint("✗ FAIL", "31")
                } else {
                    self.paint("✓ PASS", "32")
                };
                output.push_str(&format!("║  Status: {status}\n"));
                output.push_str(&format!(
                    "║  Tests: {:4} | Passed: {:4} | Failures: {:4}\n",
                    record.test_count,
                    record.passed(),
                    record.failure_count
                ));
            }
            RunOutcome::RetryRequested { attempt, .. } => {
                output.push_str(&format!(
                    "║  Status: {}\n",
                    self.paint("↻ RETRY", "33")
                ));
                output.push_str(&format!("║  Failed on attempt {attempt}; retry requested\n"));
            }
        }

        output.push_str("╚══════════════════════════════════════════════════════════════╝\n");
        output
    }

    fn push_parts(&self, output: &mut String, record: &ResultRecord) {
        let parts = record.parts_to_run.as_deref().unwrap_or_default();
        output.push_str(&format!("║  Split into {} units:\n", parts.len()));
        for part in parts {
            output.push_str(&format!("║    - {part}\n"));
        }
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// Write an outcome to a file
pub fn write_outcome_to_file(
    path: &str,
    filename: &str,
    outcome: &RunOutcome,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let formatter = ResultFormatter::new(format).no_color();
    let content = formatter.format_outcome(filename, outcome);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_name() {
        assert_eq!(OutputFormat::from_name("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_name("TABLE"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_name("csv"), None);
    }

    #[test]
    fn test_formatter_creation() {
        let formatter = ResultFormatter::new(OutputFormat::Json).no_color();
        assert_eq!(formatter.format, OutputFormat::Json);
        assert!(!formatter.colorize);
    }

    #[test]
    fn test_format_json_matches_protocol() {
        let formatter = ResultFormatter::new(OutputFormat::Json);
        let outcome = RunOutcome::Ran(ResultRecord::ran(5, 0, false));
        assert_eq!(
            formatter.format_outcome("spec/a_spec.rb", &outcome),
            r#"{"status":"ran","test_count":5,"failure_count":0,"failure":false}"#
        );
    }

    #[test]
    fn test_format_table_split() {
        let formatter = ResultFormatter::new(OutputFormat::Table).no_color();
        let outcome = RunOutcome::Ran(ResultRecord::split(vec![
            "features/a.feature:3".to_string(),
            "features/a.feature:9".to_string(),
        ]));
        let output = formatter.format_outcome("features/a.feature", &outcome);
        assert!(output.contains("Split into 2 units"));
        assert!(output.contains("features/a.feature:9"));
    }

    #[test]
    fn test_format_summary_retry() {
        let formatter = ResultFormatter::new(OutputFormat::Summary);
        let outcome = RunOutcome::RetryRequested {
            filename: "spec/a_spec.rb".to_string(),
            attempt: 2,
        };
        let output = formatter.format_outcome("spec/a_spec.rb", &outcome);
        assert!(output.contains("retry requested after attempt 2"));
    }

    #[test]
    fn test_write_outcome_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outcome.json");
        let outcome = RunOutcome::Ran(ResultRecord::ran(1, 1, true));

        write_outcome_to_file(
            path.to_str().unwrap(),
            "spec/a_spec.rb",
            &outcome,
            OutputFormat::Json,
        )
        .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"failure\":true"));
    }
}
