#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Municipality reference data loading.
//!
//! Loads the municipality master table (CSV) and the municipality boundary
//! polygons (`GeoJSON`) once at startup, canonicalizes their join keys to
//! five-digit DANE codes, and exposes read-only lookups. Both stores are
//! immutable after load; picking up new data requires a restart.

pub mod choropleth;
pub mod columns;
pub mod geometry;
pub mod reference;

use std::path::PathBuf;

use thiserror::Error;

pub use columns::ColumnField;
pub use geometry::{GeometryStore, MunicipalityGeometry};
pub use reference::ReferenceStore;

/// Errors that can occur while loading reference data.
///
/// All of these are configuration errors: the service must not start
/// serving when one is returned.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Reading a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// A configured resource file does not exist.
    #[error("{what} not found at {}", .path.display())]
    MissingResource {
        /// Which resource was expected.
        what: &'static str,
        /// Where it was expected.
        path: PathBuf,
    },

    /// None of the accepted header names for a required column is present.
    #[error("No {field} column in master table (tried {tried:?}, found {available:?})")]
    MissingColumn {
        /// Logical column that could not be located.
        field: ColumnField,
        /// Aliases that were tried, in order.
        tried: Vec<String>,
        /// Headers actually present.
        available: Vec<String>,
    },

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
