//! Joins survey answers with municipality indicators.

use apropiacion_geography::ReferenceStore;
use apropiacion_geography_models::{DepartmentCode, Indicator, MunicipalityCode};
use thiserror::Error;

use crate::{FEATURE_COUNT, Feature, FeatureVector, SurveyFields};

/// Why a municipality could not supply its indicators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrichmentError {
    /// The code is not in the master table.
    #[error("Municipality code not found in master table: {code}")]
    NotFound {
        /// Canonical code that was looked up.
        code: MunicipalityCode,
    },

    /// The municipality exists but lacks one or more indicators.
    #[error("Missing master table data for {code}: {}", feature_list(.missing))]
    MissingIndicators {
        /// Canonical code of the incomplete row.
        code: MunicipalityCode,
        /// Indicators with no value, in model order.
        missing: Vec<Indicator>,
    },
}

fn feature_list(missing: &[Indicator]) -> String {
    missing
        .iter()
        .map(|i| i.feature_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A complete model input for one respondent.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedFeatures {
    /// Canonical code the indicators were read from.
    pub code: MunicipalityCode,
    /// Department of the municipality per the master table.
    pub department_code: DepartmentCode,
    /// Survey answers followed by the indicators, in model order.
    pub features: FeatureVector,
}

/// Builds the model input for a respondent living in `raw_code`.
///
/// The code is canonicalized first, so `"5001"` and `"05001"` resolve to
/// the same municipality.
///
/// # Errors
///
/// Returns [`EnrichmentError::NotFound`] if the municipality is not in the
/// table, or [`EnrichmentError::MissingIndicators`] listing every absent
/// indicator.
pub fn enrich(
    store: &ReferenceStore,
    raw_code: &str,
    survey: &SurveyFields,
) -> Result<EnrichedFeatures, EnrichmentError> {
    let code = MunicipalityCode::normalize(raw_code);
    let record = store
        .lookup(&code)
        .ok_or_else(|| EnrichmentError::NotFound { code: code.clone() })?;

    let missing = record.missing_indicators();
    if !missing.is_empty() {
        return Err(EnrichmentError::MissingIndicators { code, missing });
    }

    let mut values = [0.0; FEATURE_COUNT];
    values[..5].copy_from_slice(&survey.values());
    for &indicator in Indicator::all() {
        if let Some(value) = record.indicator(indicator).value() {
            values[Feature::from_indicator(indicator).position()] = value;
        }
    }

    log::debug!("Enriched {code}: {}", FeatureVector::from_array(values));

    Ok(EnrichedFeatures {
        department_code: record.department_code.clone(),
        code,
        features: FeatureVector::from_array(values),
    })
}
