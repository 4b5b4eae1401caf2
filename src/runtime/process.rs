//! Engine runtime backed by the engine's command-line runner
//!
//! Each run spawns the configured command and captures stdout and stderr as
//! the report. Discovery and failure details are parsed from that report by
//! the engine variant.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info, warn};

use super::{Invocation, RunOutput, Runtime, RuntimeError, RuntimeState};
use crate::config::WorkerConfig;
use crate::engine::EngineKind;

/// Runtime that drives an engine through its CLI
#[derive(Debug)]
pub struct ProcessRuntime {
    kind: EngineKind,
    command: Vec<String>,
    working_dir: Option<PathBuf>,
    state: RuntimeState,
    last_report: Option<String>,
    runs: u64,
}

impl ProcessRuntime {
    pub fn new(kind: EngineKind, command: Vec<String>) -> Self {
        Self {
            kind,
            command,
            working_dir: None,
            state: RuntimeState::Unloaded,
            last_report: None,
            runs: 0,
        }
    }

    /// Build a runtime using the command configured for `kind`
    pub fn from_config(kind: EngineKind, config: &WorkerConfig) -> Self {
        let runtime = Self::new(kind, config.command_for(kind));
        match &config.working_dir {
            Some(dir) => runtime.with_working_dir(dir),
            None => runtime,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Report captured by the most recent run, cleared on reset
    pub fn last_report(&self) -> Option<&str> {
        self.last_report.as_deref()
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }

    fn command(&self) -> Result<Command, RuntimeError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or(RuntimeError::EmptyCommand(self.kind.name()))?;

        let mut command = Command::new(program);
        command.args(args);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        Ok(command)
    }

    fn program(&self) -> String {
        self.command.join(" ")
    }
}

impl Runtime for ProcessRuntime {
    fn load(&mut self) -> Result<(), RuntimeError> {
        if self.state == RuntimeState::Loaded {
            return Ok(());
        }

        let engine = self.kind.name();
        let output = self
            .command()?
            .arg("--version")
            .output()
            .map_err(|e| RuntimeError::LoadFailed {
                engine,
                reason: format!("{}: {e}", self.program()),
            })?;

        if !output.status.success() {
            return Err(RuntimeError::LoadFailed {
                engine,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(
            "Loaded {} ({})",
            engine,
            String::from_utf8_lossy(&output.stdout).trim()
        );
        self.state = RuntimeState::Loaded;
        Ok(())
    }

    fn state(&self) -> RuntimeState {
        self.state
    }

    fn run(&mut self, invocation: &Invocation) -> Result<RunOutput, RuntimeError> {
        if self.state != RuntimeState::Loaded {
            return Err(RuntimeError::NotLoaded);
        }

        debug!("{} {}", self.program(), invocation.args.join(" "));

        let output = self
            .command()?
            .args(&invocation.args)
            .output()
            .map_err(|source| RuntimeError::Spawn {
                program: self.program(),
                source,
            })?;

        let mut report = String::from_utf8_lossy(&output.stdout).into_owned();
        report.push_str(&String::from_utf8_lossy(&output.stderr));
        let failed = !output.status.success();
        self.runs += 1;

        let engine = self.kind.engine();
        let (discovered, failures) = if invocation.dry_run {
            let discovered = if failed {
                None
            } else {
                engine
                    .parse_discovery(&report)
                    .map_err(|e| warn!("Could not read dry run of {}: {}", invocation.target, e))
                    .ok()
            };
            (discovered, Vec::new())
        } else {
            (None, engine.parse_failures(&report))
        };

        self.last_report = Some(report.clone());

        Ok(RunOutput {
            report,
            failed,
            failures,
            discovered,
            counts: None,
        })
    }

    fn reset(&mut self) {
        self.last_report = None;
    }
}
