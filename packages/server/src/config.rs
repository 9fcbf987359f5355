//! Server configuration.
//!
//! Every setting comes from an environment variable with a default, so
//! the server runs unconfigured from the repository root.

use std::path::PathBuf;

use clap::Args;

/// Default bind address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
/// Default port.
pub const DEFAULT_PORT: u16 = 8000;
/// Default exported pipeline location.
pub const DEFAULT_MODEL_PATH: &str = "data/model.json";
/// Default master table location.
pub const DEFAULT_MASTER_CSV_PATH: &str = "data/maestro_global_variables_municipio.csv";
/// Default boundary file location.
pub const DEFAULT_GEOJSON_PATH: &str = "data/colombia_municipios.geojson";

/// Where to find the data files and how to listen.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    #[arg(long, env = "BIND_ADDR", default_value = DEFAULT_BIND_ADDR)]
    pub bind_addr: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Exported pipeline (JSON)
    #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model_path: PathBuf,

    /// Municipality master table (CSV)
    #[arg(long, env = "MASTER_CSV_PATH", default_value = DEFAULT_MASTER_CSV_PATH)]
    pub master_csv_path: PathBuf,

    /// Municipality boundaries (`GeoJSON`). When unset, the default path is
    /// used if it exists and the map endpoints are disabled otherwise
    #[arg(long, env = "GEOJSON_PATH")]
    pub geojson_path: Option<PathBuf>,

    /// Directory of a built frontend to serve at `/`
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            master_csv_path: PathBuf::from(DEFAULT_MASTER_CSV_PATH),
            geojson_path: None,
            static_dir: None,
        }
    }
}

/// Boundary file to load, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometrySource {
    /// Configured explicitly. A missing file is fatal.
    Required(PathBuf),
    /// The default location, which exists.
    Default(PathBuf),
    /// Not configured and absent from the default location.
    Disabled,
}

impl ServerConfig {
    /// Reads the configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` is set but is not a valid port number.
    pub fn from_env() -> Result<Self, crate::StartupError> {
        let defaults = Self::default();
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| crate::StartupError::Config {
                    message: format!("PORT must be a port number, got {port:?}"),
                })?,
            None => defaults.port,
        };

        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port,
            model_path: var("MODEL_PATH").map_or(defaults.model_path, PathBuf::from),
            master_csv_path: var("MASTER_CSV_PATH").map_or(defaults.master_csv_path, PathBuf::from),
            geojson_path: var("GEOJSON_PATH").map(PathBuf::from),
            static_dir: var("STATIC_DIR").map(PathBuf::from),
        })
    }

    /// Resolves which boundary file to load.
    #[must_use]
    pub fn geometry_source(&self) -> GeometrySource {
        match &self.geojson_path {
            Some(path) => GeometrySource::Required(path.clone()),
            None => {
                let path = PathBuf::from(DEFAULT_GEOJSON_PATH);
                if path.exists() {
                    GeometrySource::Default(path)
                } else {
                    GeometrySource::Disabled
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: ServerConfig,
    }

    #[test]
    fn flags_override_defaults() {
        let cli = TestCli::parse_from([
            "test",
            "--port",
            "9000",
            "--model-path",
            "/tmp/model.json",
            "--geojson-path",
            "/tmp/mpios.geojson",
        ]);
        assert_eq!(cli.config.port, 9000);
        assert_eq!(cli.config.model_path, PathBuf::from("/tmp/model.json"));
        assert_eq!(
            cli.config.geometry_source(),
            GeometrySource::Required(PathBuf::from("/tmp/mpios.geojson"))
        );
    }

    #[test]
    fn explicit_geometry_path_is_required() {
        let config = ServerConfig {
            geojson_path: Some(PathBuf::from("/nonexistent/mpios.geojson")),
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.geometry_source(),
            GeometrySource::Required(_)
        ));
    }
}
