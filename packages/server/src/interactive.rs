//! Interactive mode for the server.
//!
//! Prompts the user for the bind address, port and data files before
//! starting the server.

use std::path::PathBuf;

use dialoguer::{Confirm, Input};

use crate::{ServerConfig, StartupError};

fn prompt(label: &str, default: String) -> String {
    Input::new()
        .with_prompt(label)
        .default(default.clone())
        .interact_text()
        .unwrap_or(default)
}

/// Runs the server in interactive mode, prompting for configuration.
///
/// Starts from the environment configuration and lets the user override
/// each setting before delegating to [`super::run_server`].
///
/// # Errors
///
/// Returns [`StartupError`] if the environment configuration is invalid,
/// the entered port is not a number, or the server fails to start.
#[allow(clippy::future_not_send)]
pub async fn run() -> Result<(), StartupError> {
    println!("Apropiación Digital Prediction Server");
    println!();

    let defaults = ServerConfig::from_env()?;

    let bind_addr = prompt("Bind address", defaults.bind_addr.clone());
    let port_str = prompt("Port", defaults.port.to_string());
    let port: u16 = port_str.trim().parse().map_err(|_| StartupError::Config {
        message: format!("Port must be a number, got {port_str:?}"),
    })?;
    let model_path = prompt("Model file", defaults.model_path.display().to_string());
    let master_csv_path = prompt(
        "Master table (CSV)",
        defaults.master_csv_path.display().to_string(),
    );
    let geojson_path = prompt(
        "Boundaries (GeoJSON, blank for default)",
        defaults
            .geojson_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
    );

    let config = ServerConfig {
        bind_addr,
        port,
        model_path: PathBuf::from(model_path),
        master_csv_path: PathBuf::from(master_csv_path),
        geojson_path: Some(geojson_path.trim())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from),
        static_dir: defaults.static_dir,
    };

    if !Confirm::new()
        .with_prompt(format!(
            "Start server on {}:{}?",
            config.bind_addr, config.port
        ))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server(config).await
}
