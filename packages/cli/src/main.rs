#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line entry point for the digital appropriation prediction
//! service.
//!
//! Starts the API server, runs one-off predictions (in-process or against
//! a running server) and checks the reference data. Without a subcommand
//! it asks interactively what to do.

mod check;
mod predict;

use std::time::Duration;

use apropiacion_geography::GeoError;
use apropiacion_prediction::{ErrorKind, ServiceError};
use apropiacion_server::{ServerConfig, StartupError};
use clap::{Parser, Subcommand};
use dialoguer::Select;
use thiserror::Error;

use crate::predict::{DEFAULT_TIMEOUT_SECS, SurveyArgs};

/// Default server URL for remote predictions.
const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Error)]
pub enum CliError {
    /// Loading the data files or running the server failed.
    #[error(transparent)]
    Startup(#[from] StartupError),

    /// Reference data could not be loaded.
    #[error(transparent)]
    Geo(#[from] GeoError),

    /// An in-process prediction was rejected.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The server could not be reached or answered garbage.
    #[error("Request to {url} failed: {source}")]
    Http {
        /// Endpoint that was called.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The server did not answer in time.
    #[error("Request to {url} timed out after {secs}s")]
    Timeout {
        /// Endpoint that was called.
        url: String,
        /// Timeout that elapsed, in seconds.
        secs: u64,
    },

    /// The server answered with an error body.
    #[error("Server rejected the request ({kind}): {detail}")]
    Remote {
        /// Error class reported by the server.
        kind: ErrorKind,
        /// Server's explanation.
        detail: String,
    },

    /// Reading from the terminal failed.
    #[error(transparent)]
    Dialog(#[from] dialoguer::Error),

    /// The server thread panicked or was cancelled.
    #[error("Server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Parser)]
#[command(name = "apropiacion", about = "Digital appropriation prediction toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        #[command(flatten)]
        config: ServerConfig,
    },
    /// Run one prediction in-process against the local data files
    Predict {
        #[command(flatten)]
        config: ServerConfig,
        #[command(flatten)]
        survey: SurveyArgs,
    },
    /// Send one prediction request to a running server
    RemotePredict {
        /// Base URL of the server
        #[arg(long, env = "API_URL", default_value = DEFAULT_API_URL)]
        api_url: String,
        /// Seconds to wait for an answer
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout: u64,
        #[command(flatten)]
        survey: SurveyArgs,
    },
    /// Load the reference data and report inconsistencies
    Check {
        #[command(flatten)]
        config: ServerConfig,
    },
}

/// Top-level tool selection for interactive mode.
enum Tool {
    Serve,
    Predict,
    RemotePredict,
    Check,
}

impl Tool {
    const ALL: &[Self] = &[Self::Serve, Self::Predict, Self::RemotePredict, Self::Check];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Serve => "Start server",
            Self::Predict => "Predict (local data files)",
            Self::RemotePredict => "Predict (running server)",
            Self::Check => "Check reference data",
        }
    }
}

/// Runs the server on its own actix system so it does not nest inside the
/// tokio runtime driving the CLI.
async fn serve(config: ServerConfig) -> Result<(), CliError> {
    tokio::task::spawn_blocking(move || {
        actix_web::rt::System::new().block_on(apropiacion_server::run_server(config))
    })
    .await??;
    Ok(())
}

async fn serve_interactive() -> Result<(), CliError> {
    tokio::task::spawn_blocking(|| {
        actix_web::rt::System::new().block_on(apropiacion_server::interactive::run())
    })
    .await??;
    Ok(())
}

async fn remote_predict(api_url: &str, timeout: u64, survey: &SurveyArgs) -> Result<(), CliError> {
    let response =
        predict::predict_remote(api_url, Duration::from_secs(timeout), survey).await?;
    predict::print_prediction(&response);
    Ok(())
}

async fn interactive() -> Result<(), CliError> {
    println!("Apropiación Digital Toolchain");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::Serve => serve_interactive().await,
        Tool::Predict => {
            let survey = predict::prompt_survey()?;
            let response = predict::predict_local(&ServerConfig::from_env()?, &survey)?;
            predict::print_prediction(&response);
            Ok(())
        }
        Tool::RemotePredict => {
            let survey = predict::prompt_survey()?;
            let api_url = std::env::var("API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
            remote_predict(&api_url, DEFAULT_TIMEOUT_SECS, &survey).await
        }
        Tool::Check => check::run(&ServerConfig::from_env()?),
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive().await;
    };

    match command {
        Commands::Serve { config } => serve(config).await,
        Commands::Predict { config, survey } => {
            let response = predict::predict_local(&config, &survey)?;
            predict::print_prediction(&response);
            Ok(())
        }
        Commands::RemotePredict {
            api_url,
            timeout,
            survey,
        } => remote_predict(&api_url, timeout, &survey).await,
        Commands::Check { config } => check::run(&config),
    }
}
