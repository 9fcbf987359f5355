#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Model input assembly.
//!
//! Combines the five survey answers a respondent gives with the three
//! municipality indicators from the master table into one fixed-order
//! [`FeatureVector`].

pub mod enrich;
pub mod survey;
pub mod vector;

use thiserror::Error;

pub use enrich::{EnrichedFeatures, EnrichmentError, enrich};
pub use survey::{AgeBracket, AreaType, Sex, Stratum, SurveyError, SurveyFields, UsageFrequency};
pub use vector::{FEATURE_COUNT, FEATURE_ORDER, Feature, FeatureVector};

/// Errors building a [`FeatureVector`] from named values.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// A name that is not one of the model inputs.
    #[error("Unknown feature: {name}")]
    Unknown {
        /// The name as given.
        name: String,
    },

    /// The same input appeared twice.
    #[error("Feature {feature} given more than once")]
    Duplicate {
        /// The repeated input.
        feature: Feature,
    },

    /// A model input has no value.
    #[error("Missing feature: {feature}")]
    Missing {
        /// The absent input.
        feature: Feature,
    },
}
