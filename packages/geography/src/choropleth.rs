//! Choropleth map layers.
//!
//! Joins every boundary polygon with one indicator from the master table so
//! a map client can draw the whole country, leaving municipalities without
//! data uncolored instead of dropping them.

use apropiacion_geography_models::{ChoroplethEntry, ChoroplethLayer, Indicator};

use crate::{GeometryStore, ReferenceStore};

/// Builds the map layer for one indicator.
///
/// Names come from the master table when the municipality is there and
/// from the boundary properties otherwise. The color range spans the
/// values present, or `0..1` when there are none.
#[must_use]
pub fn choropleth_layer(
    geometry: &GeometryStore,
    store: &ReferenceStore,
    indicator: Indicator,
) -> ChoroplethLayer {
    let entries: Vec<ChoroplethEntry> = geometry
        .iter()
        .map(|g| {
            let record = store.lookup(&g.code);
            ChoroplethEntry {
                code: g.code.clone(),
                value: record.and_then(|r| r.indicator(indicator).value()),
                department: record
                    .and_then(|r| r.department_name.clone())
                    .or_else(|| g.department_name.clone())
                    .unwrap_or_default(),
                municipality: record
                    .and_then(|r| r.name.clone())
                    .or_else(|| g.municipality_name.clone())
                    .unwrap_or_default(),
            }
        })
        .collect();

    let (zmin, zmax) = entries
        .iter()
        .filter_map(|e| e.value)
        .fold(None, |range: Option<(f64, f64)>, v| {
            Some(range.map_or((v, v), |(lo, hi)| (lo.min(v), hi.max(v))))
        })
        .unwrap_or((0.0, 1.0));

    ChoroplethLayer {
        indicator,
        title: indicator.title().to_string(),
        colorbar_title: indicator.short_title().to_string(),
        zmin,
        zmax,
        entries,
    }
}
