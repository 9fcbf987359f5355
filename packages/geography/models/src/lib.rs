#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Municipality reference data types.
//!
//! These types describe the read-only reference data the prediction
//! service is built on: one record per Colombian municipality carrying the
//! three socioeconomic indicators fed to the model, plus the summary types
//! served to the dashboard for dropdowns and the choropleth map.

pub mod code;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use code::{DepartmentCode, MunicipalityCode};

/// One of the three municipality-level indicators taken from the master
/// table rather than supplied by the caller.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Indicator {
    /// Internet penetration index.
    #[serde(rename = "INDICE")]
    #[strum(serialize = "INDICE")]
    InternetPenetration,
    /// Multidimensional poverty index.
    #[serde(rename = "ipm_depto")]
    #[strum(serialize = "ipm_depto")]
    Poverty,
    /// Saber 11 standardized test average score.
    #[serde(rename = "saber_punt_global_mean")]
    #[strum(serialize = "saber_punt_global_mean")]
    TestScore,
}

impl Indicator {
    /// Returns all variants in feature order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::InternetPenetration, Self::Poverty, Self::TestScore]
    }

    /// Name of the model input this indicator feeds.
    #[must_use]
    pub const fn feature_name(self) -> &'static str {
        match self {
            Self::InternetPenetration => "INDICE",
            Self::Poverty => "ipm_depto",
            Self::TestScore => "saber_punt_global_mean",
        }
    }

    /// Key used to select this indicator as the map metric.
    #[must_use]
    pub const fn metric_key(self) -> &'static str {
        match self {
            Self::InternetPenetration => "INDICE",
            Self::Poverty => "IPM",
            Self::TestScore => "SABER",
        }
    }

    /// Parses a map metric key (`INDICE`, `IPM`, `SABER`), ignoring case.
    #[must_use]
    pub fn from_metric_key(key: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|i| i.metric_key().eq_ignore_ascii_case(key.trim()))
    }

    /// Human-readable title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::InternetPenetration => "IPI (Índice de penetración de internet)",
            Self::Poverty => "IPM (Índice de pobreza multidimensional)",
            Self::TestScore => "Puntaje Saber (promedio)",
        }
    }

    /// Short title for a map color bar.
    #[must_use]
    pub const fn short_title(self) -> &'static str {
        match self {
            Self::InternetPenetration => "IPI",
            Self::Poverty => "IPM",
            Self::TestScore => "Puntaje Saber 11 (promedio)",
        }
    }
}

/// An indicator value as read from the master table.
///
/// `Absent` means the source had no usable value. It is never the same
/// thing as `Present(0.0)`. Serialized as a JSON number or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum IndicatorValue {
    /// A finite value.
    Present(f64),
    /// Missing, blank or unparseable in the source.
    Absent,
}

impl IndicatorValue {
    /// Coerces a raw cell into an indicator value.
    ///
    /// Accepts a comma as decimal separator (`"0,73"`). Blank cells,
    /// unparseable text and non-finite numbers all become `Absent`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let cleaned = raw.trim().replace(',', ".");
        if cleaned.is_empty() {
            return Self::Absent;
        }
        match cleaned.parse::<f64>() {
            Ok(v) if v.is_finite() => Self::Present(v),
            _ => Self::Absent,
        }
    }

    /// Returns the value if present.
    #[must_use]
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Present(v) => Some(v),
            Self::Absent => None,
        }
    }

    /// Whether the value is absent.
    #[must_use]
    pub const fn is_absent(self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl From<Option<f64>> for IndicatorValue {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Self::Present(v),
            _ => Self::Absent,
        }
    }
}

impl From<IndicatorValue> for Option<f64> {
    fn from(value: IndicatorValue) -> Self {
        value.value()
    }
}

/// A municipality row from the master table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MunicipalityRecord {
    /// Canonical five-digit municipality code.
    pub code: MunicipalityCode,
    /// Department code (from the table, or the code prefix when absent).
    pub department_code: DepartmentCode,
    /// Department name.
    pub department_name: Option<String>,
    /// Municipality name.
    pub name: Option<String>,
    /// Internet penetration index.
    pub internet_penetration: IndicatorValue,
    /// Multidimensional poverty index.
    pub poverty: IndicatorValue,
    /// Saber 11 average score.
    pub test_score: IndicatorValue,
}

impl MunicipalityRecord {
    /// Returns the value of a single indicator.
    #[must_use]
    pub const fn indicator(&self, indicator: Indicator) -> IndicatorValue {
        match indicator {
            Indicator::InternetPenetration => self.internet_penetration,
            Indicator::Poverty => self.poverty,
            Indicator::TestScore => self.test_score,
        }
    }

    /// Indicators that are absent for this municipality, in feature order.
    #[must_use]
    pub fn missing_indicators(&self) -> Vec<Indicator> {
        Indicator::all()
            .iter()
            .copied()
            .filter(|i| self.indicator(*i).is_absent())
            .collect()
    }
}

/// Axis-aligned bounding box in longitude/latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Western longitude.
    pub west: f64,
    /// Southern latitude.
    pub south: f64,
    /// Eastern longitude.
    pub east: f64,
    /// Northern latitude.
    pub north: f64,
}

/// A department entry for selection lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentSummary {
    /// Department code.
    pub code: DepartmentCode,
    /// Department name (the code when the table has no name column).
    pub name: String,
}

/// A municipality entry for selection lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MunicipalitySummary {
    /// Municipality code.
    pub code: MunicipalityCode,
    /// Municipality name (the code when the table has no name column).
    pub name: String,
}

/// One polygon of a choropleth layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoroplethEntry {
    /// Municipality code, matching the geometry's `COD_MUNICIPIO` property.
    pub code: MunicipalityCode,
    /// Indicator value, `null` when not available.
    pub value: Option<f64>,
    /// Department display name.
    pub department: String,
    /// Municipality display name.
    pub municipality: String,
}

/// A map layer coloring every municipality polygon by one indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoroplethLayer {
    /// Indicator shown.
    pub indicator: Indicator,
    /// Layer title.
    pub title: String,
    /// Color bar title.
    pub colorbar_title: String,
    /// Lower end of the color scale.
    pub zmin: f64,
    /// Upper end of the color scale.
    pub zmax: f64,
    /// One entry per geometry, in geometry file order.
    pub entries: Vec<ChoroplethEntry>,
}
