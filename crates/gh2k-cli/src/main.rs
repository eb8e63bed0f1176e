//! gh2k CLI - GitHub public events to Amazon Kinesis producer.

use anyhow::Result;
use clap::{Parser, Subcommand};
use gh2k_core::config::LogFormat;
use gh2k_core::Config;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "gh2k.toml";

/// Exit codes for CLI operations.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Successful execution
    Success = 0,
    /// Configuration error (unreadable file, invalid values)
    ConfigError = 1,
    /// Event feed error
    SourceError = 2,
    /// Kinesis error (credentials, connectivity, describe)
    StreamError = 3,
    /// General runtime error
    RuntimeError = 10,
}

impl ExitCode {
    /// Map an error to an exit code from its typed cause.
    fn from_error(error: &anyhow::Error) -> Self {
        match error.downcast_ref::<gh2k_core::Error>() {
            Some(gh2k_core::Error::Config(_)) => ExitCode::ConfigError,
            Some(gh2k_core::Error::Source(_)) => ExitCode::SourceError,
            Some(gh2k_core::Error::Stream(_)) => ExitCode::StreamError,
            _ => ExitCode::RuntimeError,
        }
    }
}

mod commands;
mod server;

#[derive(Parser)]
#[command(name = "gh2k")]
#[command(about = "Stream GitHub public events into Amazon Kinesis", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the feed and publish events until interrupted
    Produce {
        /// Override the feed URL
        #[arg(long)]
        feed_url: Option<String>,

        /// Override the Kinesis stream name
        #[arg(long)]
        stream_name: Option<String>,

        /// Override the AWS region
        #[arg(long)]
        region: Option<String>,

        /// Override the poll interval in seconds
        #[arg(long)]
        poll_interval: Option<u64>,
    },

    /// Describe the target stream and exit
    Describe,

    /// Show status of a running producer
    Status {
        /// Health server URL
        #[arg(long, default_value = "http://localhost:8080")]
        url: String,
    },

    /// Validate configuration
    Validate,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let exit_code = run_cli().await;
    std::process::exit(exit_code as i32);
}

/// Main CLI execution logic with proper error handling.
async fn run_cli() -> ExitCode {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref());

    // A broken config still gets logged, in the default format
    let log_format = config
        .as_ref()
        .map(|c| c.monitoring.log_format)
        .unwrap_or_default();
    init_logging(log_format, cli.verbose);

    let result = match config {
        Ok(config) => execute_command(cli.command, config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::from_error(&e)
        }
    }
}

fn init_logging(log_format: LogFormat, verbose: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    match log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .init();
        }
    }
}

/// Execute the CLI command.
async fn execute_command(command: Commands, mut config: Config) -> Result<()> {
    match command {
        Commands::Produce {
            feed_url,
            stream_name,
            region,
            poll_interval,
        } => {
            if let Some(url) = feed_url {
                config.source.feed_url = url;
            }
            if let Some(name) = stream_name {
                config.stream.stream_name = name;
            }
            if let Some(r) = region {
                config.stream.region = r;
            }
            if let Some(secs) = poll_interval {
                config.poll.interval_seconds = secs;
            }
            commands::produce::run(config).await?;
        }

        Commands::Describe => {
            commands::describe::run(config).await?;
        }

        Commands::Status { url } => {
            commands::status::run(&url).await?;
        }

        Commands::Validate => {
            config.validate()?;
            println!("Configuration is valid");
        }
    }

    Ok(())
}

/// Defaults, then the config file, then `GH2K_*` environment overrides.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            read_config_file(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => Config::default(),
    };
    config.apply_env_overrides()?;
    Ok(config)
}

/// Read a config file, reporting an unreadable path as a config error.
fn read_config_file(path: &Path) -> gh2k_core::Result<Config> {
    Config::from_file(path).map_err(|e| match e {
        gh2k_core::Error::Io(io) => {
            gh2k_core::Error::Config(format!("Cannot read {}: {}", path.display(), io))
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_config_file_exits_with_config_error() {
        let err = load_config(Some(Path::new("/nonexistent/gh2k.toml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/gh2k.toml"));
        assert_eq!(ExitCode::from_error(&err), ExitCode::ConfigError);
    }

    #[test]
    fn test_malformed_config_file_exits_with_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[poll]\ninterval_seconds = \"soon\"").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert_eq!(ExitCode::from_error(&err), ExitCode::ConfigError);
    }

    #[test]
    fn test_stream_error_exit_code() {
        let err = anyhow::Error::from(gh2k_core::Error::from(
            gh2k_core::StreamError::Credentials("no identity".into()),
        ));
        assert_eq!(ExitCode::from_error(&err), ExitCode::StreamError);
    }
}
