//! Column alias registry for the municipality master table.
//!
//! The upstream table has been published under several header spellings,
//! so each logical column lists the names it may appear under. The list
//! is embedded from `columns.toml` and resolved once per load.

use std::collections::BTreeMap;

use serde::Deserialize;
use strum_macros::{AsRefStr, Display};

use crate::GeoError;

/// Number of logical columns. Enforced by a test.
#[cfg(test)]
const EXPECTED_COLUMN_COUNT: usize = 7;

const COLUMNS_TOML: &str = include_str!("../columns.toml");

/// A logical column of the master table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ColumnField {
    /// DANE municipality code.
    MunicipalityCode,
    /// DANE department code.
    DepartmentCode,
    /// Department name.
    DepartmentName,
    /// Municipality name.
    MunicipalityName,
    /// Internet penetration index.
    InternetPenetration,
    /// Multidimensional poverty index.
    Poverty,
    /// Saber 11 average score.
    TestScore,
}

/// Accepted header names for one logical column.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSpec {
    /// Logical column.
    pub field: ColumnField,
    /// Whether loading fails when none of the aliases is present.
    pub required: bool,
    /// Header names in priority order.
    pub aliases: Vec<String>,
}

impl ColumnSpec {
    /// Returns the index of the first alias present in `headers`.
    #[must_use]
    pub fn pick(&self, headers: &[String]) -> Option<(usize, String)> {
        self.aliases.iter().find_map(|alias| {
            headers
                .iter()
                .position(|h| h == alias)
                .map(|idx| (idx, alias.clone()))
        })
    }
}

#[derive(Debug, Deserialize)]
struct ColumnRegistry {
    column: Vec<ColumnSpec>,
}

/// Returns every column spec from the embedded registry.
///
/// # Panics
///
/// Panics if the embedded TOML fails to parse. It is a compile-time
/// constant, so a failure is a development error caught by the tests.
#[must_use]
pub fn all_columns() -> Vec<ColumnSpec> {
    toml::de::from_str::<ColumnRegistry>(COLUMNS_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse column registry: {e}"))
        .column
}

/// Header positions resolved for one master table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedColumns {
    entries: BTreeMap<ColumnField, (usize, String)>,
}

impl ResolvedColumns {
    /// Resolves every registered column against the given headers.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::MissingColumn`] for the first required column
    /// none of whose aliases is present.
    pub fn resolve(headers: &[String]) -> Result<Self, GeoError> {
        let mut entries = BTreeMap::new();

        for spec in all_columns() {
            match spec.pick(headers) {
                Some(found) => {
                    entries.insert(spec.field, found);
                }
                None if spec.required => {
                    return Err(GeoError::MissingColumn {
                        field: spec.field,
                        tried: spec.aliases,
                        available: headers.to_vec(),
                    });
                }
                None => {
                    log::info!("Optional column {} not present in master table", spec.field);
                }
            }
        }

        Ok(Self { entries })
    }

    /// Position of a column in each row.
    #[must_use]
    pub fn index(&self, field: ColumnField) -> Option<usize> {
        self.entries.get(&field).map(|(idx, _)| *idx)
    }

    /// Header the column was found under.
    #[must_use]
    pub fn header(&self, field: ColumnField) -> Option<&str> {
        self.entries.get(&field).map(|(_, name)| name.as_str())
    }

    /// Every resolved column with the header it was found under.
    pub fn iter(&self) -> impl Iterator<Item = (ColumnField, &str)> {
        self.entries.iter().map(|(field, (_, name))| (*field, name.as_str()))
    }
}
