//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// reactor-watch - durable delivery of appended instrument rows
#[derive(Parser, Debug)]
#[command(
    name = "reactor-watch",
    author,
    version,
    about = "Watch instrument exports and deliver new rows to the ingestion API",
    long_about = "Polls up to three instrument export files (gas, level control, dilution),\n\
                  maps every appended row to a typed record, persists it in a local queue\n\
                  and delivers it to the remote ingestion endpoint with retry and backoff."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "REACTOR_WATCH_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "REACTOR_WATCH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the configured sources and deliver new rows
    Run(RunArgs),

    /// Check that the ingestion endpoint is reachable
    Probe(ProbeArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration and effective column schemas
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone, Default)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "REACTOR_WATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the endpoint base URL
    #[arg(long, env = "REACTOR_WATCH_BASE_URL")]
    pub base_url: Option<String>,

    /// Override the reactor id stamped on every record
    #[arg(long, env = "REACTOR_WATCH_REACTOR_ID")]
    pub reactor_id: Option<i64>,

    /// Gas measurement export to watch
    #[arg(long)]
    pub gas: Option<PathBuf>,

    /// Level control export to watch
    #[arg(long)]
    pub level: Option<PathBuf>,

    /// Dilution export to watch
    #[arg(long)]
    pub dilution: Option<PathBuf>,

    /// Override the queue file location
    #[arg(long, env = "REACTOR_WATCH_QUEUE_FILE")]
    pub queue_file: Option<PathBuf>,

    /// Load the persisted backlog instead of resetting the queue
    #[arg(long)]
    pub keep_queue: bool,

    /// Start watching without the pre-flight health check
    #[arg(long)]
    pub skip_probe: bool,

    /// Stop after this many seconds (0 = until Ctrl+C)
    #[arg(long, default_value = "0", env = "REACTOR_WATCH_DURATION")]
    pub duration_secs: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "REACTOR_WATCH_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `probe` command
#[derive(Parser, Debug)]
pub struct ProbeArgs {
    /// Path to configuration file
    #[arg(short, long, env = "REACTOR_WATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the endpoint base URL
    #[arg(long, env = "REACTOR_WATCH_BASE_URL")]
    pub base_url: Option<String>,

    /// Output the health report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "reactor-watch.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "reactor-watch.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_overrides_parse() {
        let cli = Cli::try_parse_from([
            "reactor-watch",
            "-v",
            "run",
            "--gas",
            "gas.csv",
            "--reactor-id",
            "4",
            "--keep-queue",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.gas, Some(PathBuf::from("gas.csv")));
                assert_eq!(args.reactor_id, Some(4));
                assert!(args.keep_queue);
                assert!(!args.skip_probe);
                assert_eq!(args.duration_secs, 0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["reactor-watch", "-q", "-v", "probe"]).is_err());
    }
}
