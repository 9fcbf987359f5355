#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the prediction server.
//!
//! The prediction request and response keep the field names the trained
//! model and existing dashboard clients use (`municipio_code`,
//! `features_used`, ...). The dashboard-support endpoints use camelCase
//! like the rest of the API.

use apropiacion_features::{AgeBracket, AreaType, FeatureVector, Sex, Stratum, UsageFrequency};
use apropiacion_geography_models::{
    DepartmentCode, Indicator, MunicipalityCode, MunicipalityRecord,
};
use apropiacion_prediction::{ErrorKind, FieldError, PredictionResult, ServiceError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use apropiacion_prediction::PredictionInput as PredictRequest;

/// Body of a successful `POST /api/predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Predicted digital-appropriation index.
    pub prediction: f64,
    /// Model inputs in model order.
    pub features_used: FeatureVector,
}

impl From<PredictionResult> for PredictResponse {
    fn from(result: PredictionResult) -> Self {
        Self {
            prediction: result.prediction,
            features_used: result.features_used,
        }
    }
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub kind: ErrorKind,
    /// Short human-readable description.
    pub detail: String,
    /// Normalized municipality code, for not-found errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Feature names of missing indicators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
    /// Rejected request fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}

impl ApiError {
    /// A validation error not tied to specific fields.
    #[must_use]
    pub fn validation(detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            detail: detail.into(),
            code: None,
            missing: None,
            fields: None,
        }
    }

    /// A not-found error for a resource other than a prediction.
    #[must_use]
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            ..Self::validation(detail)
        }
    }
}

impl From<&ServiceError> for ApiError {
    fn from(err: &ServiceError) -> Self {
        let missing = err.missing();
        Self {
            kind: err.kind(),
            detail: err.to_string(),
            code: err.code().map(ToString::to_string),
            missing: (!missing.is_empty())
                .then(|| missing.into_iter().map(ToString::to_string).collect()),
            fields: (!err.fields().is_empty()).then(|| err.fields().to_vec()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
    /// Absolute path of the model file the pipeline was loaded from.
    pub model_path: String,
    /// Municipalities in the master table.
    pub municipalities: usize,
    /// Boundary polygons loaded, zero when the map is disabled.
    pub geometries: usize,
    /// When the server finished loading its data.
    pub started_at: DateTime<Utc>,
}

/// Version response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiVersion {
    pub api: String,
}

/// One selectable value of a coded survey answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogOption {
    pub value: u8,
    pub label: String,
}

impl CatalogOption {
    fn new(value: u8, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }
}

/// A selectable map indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricOption {
    /// Key accepted by `/api/map/{metric}`.
    pub key: String,
    pub title: String,
    pub short_title: String,
}

/// Option lists for the dashboard's inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCatalogs {
    pub age_brackets: Vec<CatalogOption>,
    pub strata: Vec<CatalogOption>,
    pub areas: Vec<CatalogOption>,
    pub sexes: Vec<CatalogOption>,
    pub usage_frequencies: Vec<CatalogOption>,
    pub metrics: Vec<MetricOption>,
}

impl ApiCatalogs {
    /// Builds every option list from the survey codes.
    #[must_use]
    pub fn build() -> Self {
        Self {
            age_brackets: AgeBracket::all()
                .into_iter()
                .map(|a| CatalogOption::new(a.code(), a.label()))
                .collect(),
            strata: Stratum::all()
                .into_iter()
                .map(|s| CatalogOption::new(s.code(), s.code().to_string()))
                .collect(),
            areas: AreaType::all()
                .into_iter()
                .map(|a| CatalogOption::new(a.code(), a.as_ref()))
                .collect(),
            sexes: Sex::all()
                .into_iter()
                .map(|s| CatalogOption::new(s.code(), s.as_ref()))
                .collect(),
            usage_frequencies: UsageFrequency::all()
                .into_iter()
                .map(|u| CatalogOption::new(u.code(), u.as_ref()))
                .collect(),
            metrics: Indicator::all()
                .iter()
                .map(|i| MetricOption {
                    key: i.metric_key().to_string(),
                    title: i.title().to_string(),
                    short_title: i.short_title().to_string(),
                })
                .collect(),
        }
    }
}

/// A municipality with its indicators as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMunicipality {
    pub code: MunicipalityCode,
    pub department_code: DepartmentCode,
    pub department_name: Option<String>,
    pub name: Option<String>,
    /// Indicator values keyed by feature name, `null` when absent.
    pub indicators: Vec<ApiIndicatorValue>,
    /// Whether a prediction can be made for this municipality.
    pub complete: bool,
}

/// One indicator of a municipality.
#[derive(Debug, Clone, Serialize)]
pub struct ApiIndicatorValue {
    pub indicator: Indicator,
    pub value: Option<f64>,
}

impl From<&MunicipalityRecord> for ApiMunicipality {
    fn from(record: &MunicipalityRecord) -> Self {
        Self {
            code: record.code.clone(),
            department_code: record.department_code.clone(),
            department_name: record.department_name.clone(),
            name: record.name.clone(),
            indicators: Indicator::all()
                .iter()
                .map(|&indicator| ApiIndicatorValue {
                    indicator,
                    value: record.indicator(indicator).value(),
                })
                .collect(),
            complete: record.missing_indicators().is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use apropiacion_geography_models::IndicatorValue;
    use serde_json::json;

    use super::*;

    #[test]
    fn validation_error_omits_empty_parts() {
        let body = serde_json::to_value(ApiError::validation("Invalid JSON")).unwrap();
        assert_eq!(body, json!({ "kind": "validation", "detail": "Invalid JSON" }));
    }

    #[test]
    fn catalogs_carry_survey_labels() {
        let catalogs = ApiCatalogs::build();
        assert_eq!(catalogs.age_brackets.len(), 7);
        assert_eq!(catalogs.age_brackets[0], CatalogOption::new(1, "12-17"));
        assert_eq!(catalogs.strata.len(), 6);
        assert_eq!(catalogs.areas[0], CatalogOption::new(1, "Urbana"));
        assert_eq!(catalogs.sexes[1], CatalogOption::new(0, "Femenino"));
        assert_eq!(catalogs.usage_frequencies[6].label, "Nunca / No usa / NS");
        let keys: Vec<_> = catalogs.metrics.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, vec!["INDICE", "IPM", "SABER"]);
    }

    #[test]
    fn municipality_reports_absent_indicators_as_null() {
        let record = MunicipalityRecord {
            code: MunicipalityCode::normalize("05002"),
            department_code: DepartmentCode::normalize("05"),
            department_name: Some("ANTIOQUIA".to_string()),
            name: Some("ABEJORRAL".to_string()),
            internet_penetration: IndicatorValue::Present(0.31),
            poverty: IndicatorValue::Absent,
            test_score: IndicatorValue::Present(231.2),
        };
        let body = serde_json::to_value(ApiMunicipality::from(&record)).unwrap();
        assert_eq!(body["code"], json!("05002"));
        assert_eq!(body["departmentCode"], json!("05"));
        assert_eq!(
            body["indicators"][1],
            json!({ "indicator": "ipm_depto", "value": null })
        );
        assert_eq!(body["complete"], json!(false));
    }
}
