#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The prediction endpoint's core.
//!
//! Validates a request, enriches it with the municipality's indicators and
//! runs the pre-trained pipeline. Every per-request failure comes back as a
//! [`ServiceError`] whose [`ErrorKind`] tells the caller whether to fix the
//! input, pick another municipality, or try again later.

pub mod request;

use std::sync::Arc;

use apropiacion_features::{EnrichmentError, Feature, FeatureVector, enrich};
use apropiacion_geography::ReferenceStore;
use apropiacion_geography_models::{DepartmentCode, MunicipalityCode};
use apropiacion_model::{ModelError, Regressor};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

pub use request::{FieldError, PredictionInput, PredictionRequest};

/// Broad class of a per-request failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The request itself is malformed.
    Validation,
    /// The municipality is unknown or lacks indicator data.
    NotFound,
    /// The pipeline failed on a well-formed input.
    Internal,
}

/// A per-request failure.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// One or more request fields are missing or invalid.
    #[error("Invalid request: {}", field_list(.fields))]
    Validation {
        /// Every rejected field, in request order.
        fields: Vec<FieldError>,
    },

    /// The municipality is unknown or incomplete.
    #[error(transparent)]
    NotFound(#[from] EnrichmentError),

    /// The pipeline could not produce a score.
    #[error("Inference failed: {0}")]
    Internal(#[from] ModelError),
}

fn field_list(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ServiceError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The municipality code a not-found error refers to.
    #[must_use]
    pub const fn code(&self) -> Option<&MunicipalityCode> {
        match self {
            Self::NotFound(
                EnrichmentError::NotFound { code } | EnrichmentError::MissingIndicators { code, .. },
            ) => Some(code),
            _ => None,
        }
    }

    /// Feature names of the indicators a municipality is missing.
    #[must_use]
    pub fn missing(&self) -> Vec<&'static str> {
        match self {
            Self::NotFound(EnrichmentError::MissingIndicators { missing, .. }) => {
                missing.iter().map(|i| i.feature_name()).collect()
            }
            _ => vec![],
        }
    }

    /// Rejected fields of a validation error.
    #[must_use]
    pub fn fields(&self) -> &[FieldError] {
        match self {
            Self::Validation { fields } => fields,
            _ => &[],
        }
    }
}

/// The loaded pipeline does not take the inputs this service builds.
#[derive(Debug, Error)]
#[error("Model expects features [{}], but inputs are built as [{}]", .expected.join(", "), .provided.join(", "))]
pub struct FeatureContractError {
    /// Feature names the pipeline declares.
    pub expected: Vec<String>,
    /// Feature names in the order the service builds them.
    pub provided: Vec<String>,
}

/// A successful prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// The pipeline output, unrounded.
    pub prediction: f64,
    /// The exact input the pipeline saw.
    pub features_used: FeatureVector,
    /// Canonical municipality code.
    #[serde(skip)]
    pub code: MunicipalityCode,
    /// Request department code, else the one from the master table.
    #[serde(skip)]
    pub department_code: DepartmentCode,
}

/// Validation, enrichment and inference over shared read-only state.
#[derive(Clone)]
pub struct PredictionService {
    store: Arc<ReferenceStore>,
    model: Arc<dyn Regressor>,
}

impl std::fmt::Debug for PredictionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionService")
            .field("municipalities", &self.store.len())
            .field("features", &self.model.feature_names())
            .finish()
    }
}

impl PredictionService {
    /// Pairs the master table with a pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureContractError`] unless the pipeline's declared
    /// inputs are exactly the feature names in model order.
    pub fn new(
        store: Arc<ReferenceStore>,
        model: Arc<dyn Regressor>,
    ) -> Result<Self, FeatureContractError> {
        let provided = Feature::names();
        if model.feature_names().iter().map(String::as_str).ne(provided.iter().copied()) {
            return Err(FeatureContractError {
                expected: model.feature_names().to_vec(),
                provided: provided.into_iter().map(ToString::to_string).collect(),
            });
        }
        Ok(Self { store, model })
    }

    #[must_use]
    pub fn store(&self) -> &ReferenceStore {
        &self.store
    }

    /// Runs one prediction from a raw request body.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] before any lookup if the input
    /// is malformed, [`ServiceError::NotFound`] if the municipality cannot
    /// supply its indicators, or [`ServiceError::Internal`] if the pipeline
    /// fails.
    pub fn predict(&self, input: &PredictionInput) -> Result<PredictionResult, ServiceError> {
        let request = input
            .validate()
            .map_err(|fields| ServiceError::Validation { fields })?;
        self.predict_request(&request)
    }

    /// Runs one prediction from an already validated request.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] or [`ServiceError::Internal`].
    pub fn predict_request(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResult, ServiceError> {
        let enriched = enrich(&self.store, request.code.as_str(), &request.survey)?;
        let department_code = request
            .department_code
            .clone()
            .unwrap_or(enriched.department_code);

        let prediction = self
            .model
            .predict(enriched.features.as_slice())
            .map_err(|e| {
                log::error!(
                    "Inference failed for {} with [{}]: {e}",
                    enriched.code,
                    enriched.features
                );
                ServiceError::Internal(e)
            })?;

        log::debug!(
            "Predicted {prediction} for {} (department {department_code})",
            enriched.code
        );

        Ok(PredictionResult {
            prediction,
            features_used: enriched.features,
            code: enriched.code,
            department_code,
        })
    }
}
