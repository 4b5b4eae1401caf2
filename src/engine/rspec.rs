//! RSpec engine

use serde::Deserialize;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::{DiscoveryError, Engine};
use crate::config::WorkerConfig;
use crate::models::Location;
use crate::retry::{FailureInfo, RetryAxis};
use crate::scrape::ReportPatterns;
use crate::split::{DiscoveredUnit, GROUP_SEPARATOR};

static PATTERNS: LazyLock<ReportPatterns> = LazyLock::new(|| {
    ReportPatterns::new(r"(?m)^(\d+) examples?, .*$", Some(r"(\d+) failures?"))
        .expect("rspec summary patterns are valid")
});

/// Output of `rspec --dry-run --format json`
#[derive(Debug, Deserialize)]
struct DryRunReport {
    examples: Vec<DryRunExample>,
}

#[derive(Debug, Deserialize)]
struct DryRunExample {
    id: String,
    file_path: String,
    line_number: u32,
}

impl DryRunExample {
    /// Nesting path from a scoped id: `./spec/a_spec.rb[1:2:1]` -> `1::2::1`
    fn group_name(&self) -> String {
        match self.id.rsplit_once('[') {
            Some((_, scoped)) => scoped.trim_end_matches(']').replace(':', GROUP_SEPARATOR),
            None => self.id.clone(),
        }
    }
}

/// RSpec worker variant
#[derive(Clone, Copy, Debug, Default)]
pub struct Rspec;

impl Engine for Rspec {
    fn name(&self) -> &'static str {
        "rspec"
    }

    fn filename_match(&self, filename: &str) -> bool {
        filename.contains("_spec.rb")
    }

    fn minimal_file(&self) -> &'static str {
        "require 'spec_helper'\n\
         describe('nitra preloading') do\n  \
           it('preloads the fixtures') do\n    \
             expect(1).to eq(1)\n  \
           end\n\
         end\n"
    }

    fn preload_file_name(&self) -> &'static str {
        "nitra_preload_spec.rb"
    }

    fn default_command(&self) -> &'static [&'static str] {
        &["rspec"]
    }

    fn arguments(&self, target: &str, dry_run: bool, _config: &WorkerConfig) -> Vec<String> {
        let format = if dry_run { "j" } else { "p" };
        let mut args = vec!["-f".to_string(), format.to_string(), target.to_string()];
        if dry_run {
            args.push("--dry-run".to_string());
        }
        args
    }

    fn report_patterns(&self) -> &ReportPatterns {
        &PATTERNS
    }

    fn retry_axis(&self) -> RetryAxis {
        RetryAxis::Report
    }

    /// Each example is a leaf group named by its scoped id, preceded by the
    /// example groups enclosing it. The JSON report carries no group lines, so
    /// a group is placed at its first example.
    fn parse_discovery(&self, report: &str) -> Result<Vec<DiscoveredUnit>, DiscoveryError> {
        let start = report
            .match_indices('{')
            .map(|(i, _)| i)
            .find(|&i| report[i..].starts_with("{\""))
            .ok_or(DiscoveryError::MissingReport)?;
        let dry_run = serde_json::Deserializer::from_str(&report[start..])
            .into_iter::<DryRunReport>()
            .next()
            .ok_or(DiscoveryError::MissingReport)??;

        let mut units = Vec::new();
        let mut groups = HashSet::new();

        for example in dry_run.examples {
            let name = example.group_name();
            let location = Location::new(example.file_path, example.line_number);

            let enclosing: Vec<String> = name
                .match_indices(GROUP_SEPARATOR)
                .map(|(i, _)| name[..i].to_string())
                .collect();
            for group in enclosing {
                if groups.insert(group.clone()) {
                    units.push(DiscoveredUnit::group(group, location.clone()));
                }
            }

            units.push(DiscoveredUnit::group(name, location));
        }

        Ok(units)
    }

    // The retry axis is the whole report, so individual failures are not needed.
    fn parse_failures(&self, _report: &str) -> Vec<FailureInfo> {
        Vec::new()
    }
}
