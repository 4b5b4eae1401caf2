//! Test file worker
//!
//! Runs files against one preloaded engine runtime and reports a uniform
//! result record, splitting files into units or asking the coordinator for a
//! retry when configured to.

#![allow(dead_code)]

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::WorkerConfig;
use crate::engine::{Engine, EngineKind};
use crate::models::{is_split_addressed, ResultRecord, RunOutcome};
use crate::retry::RetryPolicy;
use crate::runtime::{Invocation, ResetGuard, Runtime, RuntimeError};
use crate::split::runnable_parts;
use crate::utils::RunTimer;

/// Worker errors
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("{engine} worker cannot run {filename}")]
    UnsupportedFile {
        engine: &'static str,
        filename: String,
    },
}

/// A worker bound to one engine and one exclusively owned runtime
pub struct Worker<R: Runtime> {
    kind: EngineKind,
    runtime: R,
    config: WorkerConfig,
    retry: RetryPolicy,
}

impl<R: Runtime> Worker<R> {
    pub fn new(kind: EngineKind, runtime: R, config: WorkerConfig) -> Self {
        let retry = config.retry_policy();
        Self {
            kind,
            runtime,
            config,
            retry,
        }
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn filename_match(&self, filename: &str) -> bool {
        self.kind.filename_match(filename)
    }

    pub fn minimal_file(&self) -> &'static str {
        self.kind.engine().minimal_file()
    }

    /// Load the engine runtime; must succeed before any real run
    pub fn load_environment(&mut self) -> Result<(), WorkerError> {
        self.runtime.load()?;
        Ok(())
    }

    /// Run one file or unit.
    ///
    /// `attempt` is the coordinator's attempt counter for this file, starting
    /// at 1. The runtime is reset on every exit path.
    pub fn run_file(
        &mut self,
        filename: &str,
        preloading: bool,
        attempt: u32,
    ) -> Result<RunOutcome, WorkerError> {
        let engine = self.kind.engine();
        let timer = RunTimer::start(engine.name(), filename, attempt);
        let mut runtime = ResetGuard::new(&mut self.runtime);

        let outcome = if self.config.split_files && !preloading && !is_split_addressed(filename)
        {
            dry_run(engine, &mut *runtime, &self.config, filename)
        } else {
            let retry = if preloading { None } else { Some(&self.retry) };
            full_run(engine, &mut *runtime, &self.config, retry, filename, attempt)
        };

        drop(runtime);
        timer.finish(outcome.as_ref().ok());
        outcome
    }

    /// Clear per-run engine state. `run_file` already does this on every
    /// exit path.
    pub fn clean_up(&mut self) {
        self.runtime.reset();
    }
}

fn dry_run<R: Runtime + ?Sized>(
    engine: &dyn Engine,
    runtime: &mut R,
    config: &WorkerConfig,
    filename: &str,
) -> Result<RunOutcome, WorkerError> {
    let invocation = Invocation::new(filename, engine.arguments(filename, true, config), true);
    let output = runtime.run(&invocation)?;

    let units = match output.discovered {
        Some(units) if !output.failed => units,
        _ => {
            warn!("Could not load scenarios in {}", filename);
            return Ok(RunOutcome::Ran(ResultRecord::discovery_failed()));
        }
    };

    let parts = runnable_parts(&units);
    debug!("Found {} scenarios in {}", parts.len(), filename);
    Ok(RunOutcome::Ran(ResultRecord::split(parts)))
}

fn full_run<R: Runtime + ?Sized>(
    engine: &dyn Engine,
    runtime: &mut R,
    config: &WorkerConfig,
    retry: Option<&RetryPolicy>,
    filename: &str,
    attempt: u32,
) -> Result<RunOutcome, WorkerError> {
    let invocation = Invocation::new(filename, engine.arguments(filename, false, config), false);
    let output = runtime.run(&invocation)?;

    let counts = output
        .counts
        .unwrap_or_else(|| engine.report_patterns().scrape(&output.report));
    // Undefined Cucumber steps count as failures even when the engine exits cleanly.
    let failed = output.failed || counts.failures > 0;

    let retryable = retry.is_some_and(|policy| {
        policy.evaluate(
            failed,
            attempt,
            engine.retry_axis(),
            &output.report,
            &output.failures,
        )
    });
    if retryable {
        info!("{} failed: retrying (attempt {})", filename, attempt);
        return Ok(RunOutcome::RetryRequested {
            filename: filename.to_string(),
            attempt,
        });
    }

    if failed {
        info!(
            "{} failed with {} tests, {} failures",
            filename, counts.tests, counts.failures
        );
    } else {
        debug!(
            "{} succeeded with {} tests, {} failures",
            filename, counts.tests, counts.failures
        );
    }

    Ok(RunOutcome::Ran(ResultRecord::ran(
        counts.tests,
        counts.failures,
        failed,
    )))
}
