#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the digital appropriation prediction service.
//!
//! Loads the master table, the exported pipeline and (optionally) the
//! municipality boundaries once, then serves predictions and the option
//! lists and map layers the dashboard needs. Nothing is reloaded while
//! the server runs.

pub mod config;
mod handlers;
pub mod interactive;

use std::path::Path;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use apropiacion_geography::{GeoError, GeometryStore, ReferenceStore};
use apropiacion_model::{ModelError, Pipeline};
use apropiacion_prediction::{FeatureContractError, PredictionService};
use apropiacion_server_models::ApiError;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use config::{GeometrySource, ServerConfig};

/// Failures that keep the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    /// An environment setting could not be parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// Which setting and why.
        message: String,
    },

    /// The master table or boundary file could not be loaded.
    #[error(transparent)]
    Geo(#[from] GeoError),

    /// The pipeline file could not be loaded.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The pipeline expects different inputs.
    #[error(transparent)]
    FeatureContract(#[from] FeatureContractError),

    /// Binding or running the HTTP server failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// Master table and pipeline.
    pub service: PredictionService,
    /// Municipality boundaries, `None` when the map is disabled.
    pub geometry: Option<Arc<GeometryStore>>,
    /// Where the pipeline was loaded from, for the health check.
    pub model_path: String,
    /// When loading finished.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    #[must_use]
    pub fn new(service: PredictionService, geometry: Option<GeometryStore>, model_path: String) -> Self {
        Self {
            service,
            geometry: geometry.map(Arc::new),
            model_path,
            started_at: Utc::now(),
        }
    }

    /// Loads every data file named by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError`] if the master table or the pipeline cannot
    /// be loaded, if the pipeline was trained on different inputs, or if an
    /// explicitly configured boundary file cannot be loaded.
    pub fn load(config: &ServerConfig) -> Result<Self, StartupError> {
        log::info!("Loading master table from {}...", config.master_csv_path.display());
        let store = ReferenceStore::load(&config.master_csv_path)?;

        log::info!("Loading model from {}...", config.model_path.display());
        let model = Pipeline::load(&config.model_path)?;
        let service = PredictionService::new(Arc::new(store), Arc::new(model))?;

        let geometry = match config.geometry_source() {
            GeometrySource::Required(path) | GeometrySource::Default(path) => {
                log::info!("Loading municipality boundaries from {}...", path.display());
                Some(GeometryStore::load(&path)?)
            }
            GeometrySource::Disabled => {
                log::warn!("No municipality boundaries configured, map endpoints disabled");
                None
            }
        };

        Ok(Self::new(service, geometry, resolved_path(&config.model_path)))
    }
}

/// Absolute form of `path`, or `path` as given when it cannot be resolved.
fn resolved_path(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

/// Registers the `/api` routes and the JSON body settings.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let body = ApiError::validation(format!("Invalid request body: {err}"));
        actix_web::error::InternalError::from_response(
            err,
            HttpResponse::UnprocessableEntity().json(body),
        )
        .into()
    }))
    .service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/version", web::get().to(handlers::version))
            .route("/predict", web::post().to(handlers::predict))
            .route("/catalogs", web::get().to(handlers::catalogs))
            .route("/departments", web::get().to(handlers::departments))
            .route(
                "/departments/{code}/municipalities",
                web::get().to(handlers::municipalities),
            )
            .route("/municipalities/{code}", web::get().to(handlers::municipality))
            .route("/map/{metric}", web::get().to(handlers::map))
            .route("/geometry", web::get().to(handlers::geometry)),
    );
}

/// Starts the prediction API server.
///
/// Loads every data file before binding, so a bad configuration never
/// serves traffic. This is a regular async function; the caller provides
/// the runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`StartupError`] if loading fails, or if the HTTP server fails
/// to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> Result<(), StartupError> {
    let state = web::Data::new(AppState::load(&config)?);

    log::info!(
        "Serving {} municipalities and {} boundaries",
        state.service.store().len(),
        state.geometry.as_ref().map_or(0, |g| g.len())
    );

    let static_dir = config.static_dir.clone();
    let bind_addr = config.bind_addr.clone();
    let port = config.port;

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        let app = App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure);

        // Serve frontend static files (production)
        match &static_dir {
            Some(dir) => app.service(Files::new("/", dir).index_file("index.html")),
            None => app,
        }
    })
    .bind((bind_addr, port))?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn missing_master_table_aborts_startup() {
        let config = ServerConfig {
            master_csv_path: PathBuf::from("/nonexistent/maestro.csv"),
            ..ServerConfig::default()
        };
        let err = AppState::load(&config).err().unwrap();
        assert!(matches!(
            err,
            StartupError::Geo(GeoError::MissingResource { .. })
        ));
    }

    fn write_fixtures(name: &str) -> ServerConfig {
        let dir = std::env::temp_dir().join(format!("apropiacion_server_{name}"));
        std::fs::create_dir_all(&dir).unwrap();

        let master = dir.join("maestro.csv");
        std::fs::write(
            &master,
            "COD_MUNICIPIO,INDICE,ipm_depto,saber_punt_global_mean\n05001,0.73,12.4,245.0\n",
        )
        .unwrap();

        let model = dir.join("model.json");
        let names = apropiacion_features::Feature::names();
        let pipeline = Pipeline::linear(&names, &[1.0; 8], 0.0).unwrap();
        std::fs::write(&model, serde_json::to_string(&pipeline).unwrap()).unwrap();

        ServerConfig {
            master_csv_path: master,
            model_path: model,
            ..ServerConfig::default()
        }
    }

    #[test]
    fn loads_without_boundaries() {
        let state = AppState::load(&write_fixtures("no_boundaries")).unwrap();
        assert_eq!(state.service.store().len(), 1);
        assert!(state.geometry.is_none());
        assert!(state.model_path.ends_with("model.json"));
        assert!(Path::new(&state.model_path).is_absolute());
    }

    #[test]
    fn health_reports_absolute_model_path() {
        let resolved = resolved_path(Path::new("Cargo.toml"));
        assert!(Path::new(&resolved).is_absolute());
        assert!(resolved.ends_with("Cargo.toml"));

        assert_eq!(resolved_path(Path::new("missing/model.json")), "missing/model.json");
    }

    #[test]
    fn configured_boundary_file_must_exist() {
        let config = ServerConfig {
            geojson_path: Some(PathBuf::from("/nonexistent/mpios.geojson")),
            ..write_fixtures("missing_boundaries")
        };
        let err = AppState::load(&config).err().unwrap();
        assert!(matches!(
            err,
            StartupError::Geo(GeoError::MissingResource { .. })
        ));
    }
}
