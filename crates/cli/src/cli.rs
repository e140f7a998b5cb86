//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Fanout - run a manifest of commands with bounded parallelism
#[derive(Parser, Debug)]
#[command(
    name = "fanout",
    author,
    version,
    about = "Bounded-parallelism fan-out job runner",
    long_about = "Runs every job of a manifest across a fixed number of workers.\n\n\
                  Each job gets either one shared context or its own timeout; \n\
                  failures are collected and reported once the run completes."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FANOUT_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "FANOUT_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every job in the manifest
    Run(RunArgs),

    /// Validate a manifest without running it
    Validate(ValidateArgs),

    /// Display manifest information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to the job manifest (TOML or JSON)
    #[arg(short, long, default_value = "fanout.toml", env = "FANOUT_CONFIG")]
    pub config: PathBuf,

    /// Override the number of concurrent workers
    #[arg(short, long, env = "FANOUT_PARALLELISM")]
    pub parallelism: Option<usize>,

    /// Override the per-job timeout in seconds (0 = none)
    #[arg(short, long, env = "FANOUT_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Run all jobs under one shared context
    #[arg(long)]
    pub shared: bool,

    /// Deadline of the shared context in seconds (implies --shared)
    #[arg(long, env = "FANOUT_SHARED_DEADLINE")]
    pub shared_deadline: Option<u64>,

    /// Stop starting new jobs after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Validate the manifest and exit without running jobs
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "FANOUT_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the manifest to validate
    #[arg(short, long, default_value = "fanout.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to the manifest
    #[arg(short, long, default_value = "fanout.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// List every job
    #[arg(long)]
    pub jobs: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
