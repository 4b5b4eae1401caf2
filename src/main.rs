//! nitra-worker - preloading test worker
//!
//! A worker process for parallel test runs: it loads a Cucumber or RSpec
//! runtime once, then runs the files a coordinator hands it and reports a
//! uniform result record for each.
//!
//! ## Features
//!
//! - Preloading: the engine is loaded and warmed with a minimal file once
//! - File splitting: whole files are broken into `path:line` units on request
//! - Flaky retries: matching failures are handed back for another attempt
//! - JSON-lines protocol on stdin/stdout for coordinators
//!
//! ## Usage
//!
//! ```bash
//! # Serve a coordinator
//! nitra-worker serve --engine cucumber --split
//!
//! # Run one file
//! nitra-worker run spec/models/user_spec.rb --format json
//!
//! # Write an example configuration
//! nitra-worker config init
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

mod cli;
mod config;
mod engine;
mod executor;
mod models;
mod output;
mod retry;
mod runtime;
mod scrape;
mod split;
mod utils;
mod worker;

use cli::Args;
use config::{ConfigFile, EnvConfig, WorkerConfig};
use engine::EngineKind;
use executor::WorkerSession;
use output::{OutputFormat, ResultFormatter};
use retry::RetryPattern;
use runtime::ProcessRuntime;
use utils::logger::{init_logger, log_level};
use worker::Worker;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let worker_config = match &args.command {
        cli::Command::Serve(_) | cli::Command::Run(_) => {
            Some(config::resolve(args.config.as_deref())?)
        }
        _ => None,
    };

    let debug = args.verbose || worker_config.as_ref().is_some_and(|c| c.debug);
    init_logger(log_level(args.log_level.as_deref(), debug)?);

    match args.command {
        cli::Command::Serve(serve_args) => {
            let config = worker_config.unwrap_or_default();
            serve_worker(serve_args, config).await?;
        }
        cli::Command::Run(run_args) => {
            let config = worker_config.unwrap_or_default();
            tokio::task::block_in_place(|| run_once(run_args, config))?;
        }
        cli::Command::Engines(engines_args) => {
            list_engines(engines_args);
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args, args.config.as_deref())?;
        }
    }

    Ok(())
}

/// Apply command-line overrides on top of file and environment settings
fn apply_worker_args(mut config: WorkerConfig, args: &cli::WorkerArgs) -> Result<WorkerConfig> {
    if let Some(tags) = &args.tags {
        config.tags = Some(tags.clone());
    }
    if args.split {
        config.split_files = true;
    }
    if let Some(pattern) = &args.retry_pattern {
        config.exceptions_to_retry =
            Some(RetryPattern::new(pattern).context("Invalid --retry-pattern")?);
    }
    if let Some(max) = args.max_attempts {
        config.max_attempts = max;
    }
    config.validate()?;
    Ok(config)
}

fn parse_engine(name: &str) -> Result<EngineKind> {
    EngineKind::from_name(name).ok_or_else(|| anyhow::anyhow!("Unknown engine: {name}"))
}

fn start_session(
    kind: EngineKind,
    config: WorkerConfig,
    preload: bool,
) -> Result<WorkerSession<ProcessRuntime>> {
    let runtime = ProcessRuntime::from_config(kind, &config);
    let mut session = WorkerSession::start(Worker::new(kind, runtime, config))?;
    if preload {
        session.preload()?;
    }
    Ok(session)
}

async fn serve_worker(args: cli::ServeArgs, config: WorkerConfig) -> Result<()> {
    let kind = parse_engine(&args.engine)?;
    let config = apply_worker_args(config, &args.worker)?;
    let preload = !args.worker.no_preload;

    let mut session = tokio::task::block_in_place(|| start_session(kind, config, preload))?;
    info!("{} worker ready", kind);

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    executor::serve(&mut session, input, tokio::io::stdout()).await
}

fn run_once(args: cli::RunArgs, config: WorkerConfig) -> Result<()> {
    let kind = match &args.engine {
        Some(name) => parse_engine(name)?,
        None => EngineKind::for_filename(&args.filename)
            .ok_or_else(|| anyhow::anyhow!("No engine runs {}", args.filename))?,
    };
    let config = apply_worker_args(config, &args.worker)?;
    let format = OutputFormat::from_name(&args.format).unwrap_or(OutputFormat::Table);

    let mut session = start_session(kind, config, !args.worker.no_preload)?;
    let response = session.run(&args.filename, false, args.attempt);

    let outcome = match response {
        executor::Response::Ran(record) => models::RunOutcome::Ran(record),
        executor::Response::RetryRequested { filename, attempt } => {
            models::RunOutcome::RetryRequested { filename, attempt }
        }
        executor::Response::Error { message } => anyhow::bail!(message),
    };

    let formatter = ResultFormatter::new(format);
    println!("{}", formatter.format_outcome(&args.filename, &outcome));

    if let Some(path) = &args.output {
        output::write_outcome_to_file(path, &args.filename, &outcome, format)?;
        info!("Outcome saved to {}", path);
    }

    Ok(())
}

fn list_engines(args: cli::EnginesArgs) {
    println!("\nSupported Engines\n");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = WorkerConfig::default();
    for kind in EngineKind::all() {
        let engine = kind.engine();
        println!(
            "  {:10} command: {:20} preload file: {}",
            engine.name(),
            config.command_for(kind).join(" "),
            engine.preload_file_name()
        );

        if args.detailed {
            println!("\n  Preload body:");
            for line in engine.minimal_file().lines() {
                println!("    {line}");
            }
            println!(
                "\n  Dry run: {}\n",
                engine
                    .arguments("<file>", true, &config)
                    .join(" ")
            );
        }
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
}

fn manage_config(args: cli::ConfigArgs, config_path: Option<&str>) -> Result<()> {
    use std::path::Path;

    match args.action {
        cli::ConfigAction::Init { output, force } => {
            let path = Path::new(&output);
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {output}. Use --force to overwrite."
                );
            }

            ConfigFile::example().save(path)?;
            println!("✓ Configuration file created: {output}");
            println!("\nEdit the file to customize your settings.");
        }

        cli::ConfigAction::Show { env, format } => {
            if env {
                let env_config = EnvConfig::load();
                if env_config.has_any() {
                    env_config.print_summary();
                } else {
                    println!("No NITRA_* environment overrides set");
                }
            } else {
                let config = ConfigFile {
                    worker: config::resolve(config_path)?,
                    ..ConfigFile::default()
                };
                let output = if format == "json" {
                    serde_json::to_string_pretty(&config)?
                } else {
                    serde_yaml::to_string(&config)?
                };
                println!("{output}");
            }
        }

        cli::ConfigAction::Validate { file } => {
            let path = file
                .or_else(|| config_path.map(str::to_string))
                .or_else(|| ConfigFile::find().map(|p| p.to_string_lossy().to_string()))
                .unwrap_or_else(|| "./nitra.yml".to_string());

            match ConfigFile::load(&path) {
                Ok(_) => {
                    println!("✓ Configuration file is valid: {path}");
                }
                Err(e) => {
                    println!("✗ Configuration file is invalid: {path}");
                    println!("  Error: {e}");
                    return Err(e);
                }
            }
        }
    }

    Ok(())
}
