//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};

/// Preloading test worker for Cucumber and RSpec
#[derive(Parser, Debug)]
#[command(name = "nitra-worker")]
#[command(version)]
#[command(about = "Run Cucumber and RSpec files against a preloaded engine")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve run requests from a coordinator over stdin/stdout
    Serve(ServeArgs),

    /// Run a single file or unit
    Run(RunArgs),

    /// List supported engines
    Engines(EnginesArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Options shared by commands that start a worker
#[derive(Parser, Debug)]
pub struct WorkerArgs {
    /// Cucumber tag expression
    #[arg(long)]
    pub tags: Option<String>,

    /// Split whole files into units
    #[arg(long)]
    pub split: bool,

    /// Pattern of failures worth retrying
    #[arg(long)]
    pub retry_pattern: Option<String>,

    /// Total attempts allowed per file
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Skip the preload pass
    #[arg(long)]
    pub no_preload: bool,
}

/// Arguments for serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Engine this worker runs (cucumber, rspec)
    #[arg(short, long)]
    pub engine: String,

    #[command(flatten)]
    pub worker: WorkerArgs,
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// File or `path:line` unit to run
    pub filename: String,

    /// Engine to use; detected from the filename when omitted
    #[arg(short, long)]
    pub engine: Option<String>,

    /// Attempt number of this run
    #[arg(short, long, default_value = "1")]
    pub attempt: u32,

    /// Output format (table, json, json-pretty, summary)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Save the outcome to file
    #[arg(short, long)]
    pub output: Option<String>,

    #[command(flatten)]
    pub worker: WorkerArgs,
}

/// Arguments for engines command
#[derive(Parser, Debug)]
pub struct EnginesArgs {
    /// Show report patterns and the preload file
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "nitra.yml")]
        output: String,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Show {
        /// Show environment variable overrides instead
        #[arg(long)]
        env: bool,

        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Validate a configuration file
    Validate {
        /// File to validate; defaults to the discovered file
        file: Option<String>,
    },
}
