#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Standalone entry point for the prediction API server.

use apropiacion_server::{ServerConfig, StartupError, run_server};
use clap::Parser;

#[derive(Parser)]
#[command(name = "apropiacion_server", about = "Digital appropriation prediction API")]
struct Cli {
    #[command(flatten)]
    config: ServerConfig,
}

#[actix_web::main]
async fn main() -> Result<(), StartupError> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    run_server(cli.config).await.inspect_err(|e| {
        log::error!("Server failed: {e}");
    })
}
