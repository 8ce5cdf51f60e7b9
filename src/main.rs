//! RandomTrust CLI
//!
//! Generates auditable numbers, verifies saved ledgers, analyzes number
//! sequences and serves the HTTP API.

use clap::{Parser, Subcommand};
use randomtrust::{FileConfig, RandomTrust, ServiceError};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "randomtrust", version, about = "Auditable random number generation")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate one number with its ledger.
    Generate {
        /// Exclusive upper bound.
        #[arg(long, default_value_t = 1000, allow_negative_numbers = true)]
        max_value: i64,
    },
    /// Verify a saved generation result or verification request.
    Verify {
        /// JSON file with `number`/`final_number`, `steps` and `verification_hash`.
        file: PathBuf,
    },
    /// Analyze a sequence of integers read from a file or stdin.
    Analyze {
        /// Input file; stdin when absent.
        file: Option<PathBuf>,
        /// Bin over `[0, max_value)` instead of the observed range.
        #[arg(long, allow_negative_numbers = true)]
        max_value: Option<i64>,
    },
    /// Generate a stream of numbers from one entropy batch.
    Stream {
        /// Number of values.
        #[arg(long, default_value_t = 1000)]
        count: usize,
        /// Exclusive upper bound.
        #[arg(long, default_value_t = 1000, allow_negative_numbers = true)]
        max_value: i64,
    },
    /// List the configured entropy sources.
    Sources,
    /// Serve the HTTP API.
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on, overriding the configured address.
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not an integer: {0:?}")]
    NotAnInteger(String),

    #[cfg(feature = "server")]
    #[error(transparent)]
    Server(#[from] randomtrust::server::ServerError),

    #[cfg(feature = "server")]
    #[error("failed to start runtime: {0}")]
    Runtime(std::io::Error),
}

/// Outcome that maps to a non-zero exit status without being an error.
enum Outcome {
    Done,
    Rejected,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(Outcome::Done) => {}
        Ok(Outcome::Rejected) => process::exit(2),
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<Outcome, CliError> {
    let config = match &cli.config {
        Some(path) => FileConfig::from_file(path).map_err(ServiceError::from)?,
        None => FileConfig::default(),
    };
    info!("RandomTrust v{}", randomtrust::VERSION);

    let service = RandomTrust::new(config)?;

    match cli.command {
        Command::Generate { max_value } => {
            print_json(&service.generate(max_value)?)?;
        }
        Command::Verify { file } => {
            let result = service.verify_json(read_input(Some(&file))?.as_bytes())?;
            print_json(&result)?;
            if !result.is_valid {
                return Ok(Outcome::Rejected);
            }
        }
        Command::Analyze { file, max_value } => {
            let numbers = parse_numbers(&read_input(file.as_deref())?)?;
            let result = match max_value {
                Some(max_value) => service.analyze_in_range(&numbers, max_value)?,
                None => service.analyze(&numbers)?,
            };
            print_json(&result)?;
        }
        Command::Stream { count, max_value } => {
            print_json(&service.generate_stream(count, max_value)?)?;
        }
        Command::Sources => {
            print_json(&service.sources())?;
        }
        #[cfg(feature = "server")]
        Command::Serve { port } => {
            let mut server_config = service.config().server.clone();
            if let Some(port) = port {
                server_config.bind_addr.set_port(port);
            }
            let server = randomtrust::server::ApiServer::new(
                server_config,
                std::sync::Arc::new(service),
            );
            let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
            runtime.block_on(server.run())?;
        }
    }

    Ok(Outcome::Done)
}

fn read_input(path: Option<&Path>) -> Result<String, CliError> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.display().to_string(),
            source,
        }),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|source| CliError::Read {
                    path: "stdin".into(),
                    source,
                })?;
            Ok(buffer)
        }
    }
}

/// Parses integers separated by whitespace, `,`, `;` or `|`.
fn parse_numbers(input: &str) -> Result<Vec<i64>, CliError> {
    input
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '|'))
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse()
                .map_err(|_| CliError::NotAnInteger(token.to_string()))
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
