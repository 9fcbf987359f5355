//! Fixed-order model input.
//!
//! The pipeline was trained on columns in exactly the order of
//! [`FEATURE_ORDER`]. Reordering them silently corrupts predictions, so
//! the order lives here and nowhere else.

use std::collections::BTreeMap;
use std::fmt;

use apropiacion_geography_models::Indicator;
use serde::ser::SerializeMap as _;
use serde::{Deserialize, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::FeatureError;

/// Number of model inputs.
pub const FEATURE_COUNT: usize = 8;

/// A named model input.
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
pub enum Feature {
    /// Age bracket (1-7).
    #[serde(rename = "RANGO_EDAD")]
    #[strum(serialize = "RANGO_EDAD")]
    AgeBracket,
    /// Socioeconomic stratum (1-6).
    #[serde(rename = "ESTRATO")]
    #[strum(serialize = "ESTRATO")]
    Stratum,
    /// Urban (1) or rural (0) household.
    #[serde(rename = "PB1_bin")]
    #[strum(serialize = "PB1_bin")]
    AreaType,
    /// Male (1) or female (0).
    #[serde(rename = "SEXO_bin")]
    #[strum(serialize = "SEXO_bin")]
    Sex,
    /// Internet use frequency (0 daily - 6 never).
    #[serde(rename = "P33")]
    #[strum(serialize = "P33")]
    UsageFrequency,
    /// Municipality internet penetration index.
    #[serde(rename = "INDICE")]
    #[strum(serialize = "INDICE")]
    InternetPenetration,
    /// Multidimensional poverty index.
    #[serde(rename = "ipm_depto")]
    #[strum(serialize = "ipm_depto")]
    Poverty,
    /// Saber 11 average score.
    #[serde(rename = "saber_punt_global_mean")]
    #[strum(serialize = "saber_punt_global_mean")]
    TestScore,
}

/// Model input order.
pub const FEATURE_ORDER: [Feature; FEATURE_COUNT] = [
    Feature::AgeBracket,
    Feature::Stratum,
    Feature::AreaType,
    Feature::Sex,
    Feature::UsageFrequency,
    Feature::InternetPenetration,
    Feature::Poverty,
    Feature::TestScore,
];

impl Feature {
    /// Position of this feature in [`FEATURE_ORDER`].
    #[must_use]
    pub const fn position(self) -> usize {
        self as usize
    }

    /// The feature an indicator feeds.
    #[must_use]
    pub const fn from_indicator(indicator: Indicator) -> Self {
        match indicator {
            Indicator::InternetPenetration => Self::InternetPenetration,
            Indicator::Poverty => Self::Poverty,
            Indicator::TestScore => Self::TestScore,
        }
    }

    /// Feature names in model order.
    #[must_use]
    pub fn names() -> Vec<&'static str> {
        FEATURE_ORDER.iter().map(AsRef::as_ref).collect()
    }
}

/// One model input row.
///
/// Serializes as a JSON object whose keys appear in model order.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>")]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Wraps values already in model order.
    #[must_use]
    pub const fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    /// Builds a vector from name/value pairs in any order.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError`] if a name is unknown, repeated, or if a
    /// feature is missing.
    pub fn from_named<'a, I>(pairs: I) -> Result<Self, FeatureError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut slots: [Option<f64>; FEATURE_COUNT] = [None; FEATURE_COUNT];
        for (name, value) in pairs {
            let feature: Feature = name.parse().map_err(|_| FeatureError::Unknown {
                name: name.to_string(),
            })?;
            if slots[feature.position()].replace(value).is_some() {
                return Err(FeatureError::Duplicate { feature });
            }
        }

        let mut values = [0.0; FEATURE_COUNT];
        for (feature, (slot, value)) in FEATURE_ORDER.iter().zip(slots.iter().zip(&mut values)) {
            *value = slot.ok_or(FeatureError::Missing { feature: *feature })?;
        }
        Ok(Self { values })
    }

    /// Values in model order.
    #[must_use]
    pub const fn to_array(&self) -> [f64; FEATURE_COUNT] {
        self.values
    }

    /// Values in model order, borrowed.
    #[must_use]
    pub const fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// The value of one feature.
    #[must_use]
    pub const fn get(&self, feature: Feature) -> f64 {
        self.values[feature.position()]
    }

    /// Feature/value pairs in model order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        FEATURE_ORDER.iter().copied().zip(self.values.iter().copied())
    }
}

impl TryFrom<BTreeMap<String, f64>> for FeatureVector {
    type Error = FeatureError;

    fn try_from(map: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        Self::from_named(map.iter().map(|(k, v)| (k.as_str(), *v)))
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (feature, value) in self.iter() {
            map.serialize_entry(feature.as_ref(), &value)?;
        }
        map.end()
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{}", parts.join(", "))
    }
}
