//! Municipality boundary polygons.
//!
//! Loads a `GeoJSON` `FeatureCollection` of municipality boundaries and
//! derives each feature's five-digit join key from its DANE properties.
//! Newer boundary files split the code into `DPTO_CCDGO` and `MPIO_CCDGO`;
//! older ones carry a single `MpCodigo`.

use std::collections::BTreeMap;
use std::path::Path;

use apropiacion_geography_models::{BoundingBox, MunicipalityCode};
use geo::BoundingRect;
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject};

use crate::GeoError;

/// Property the derived join key is written to on every feature.
pub const CODE_PROPERTY: &str = "COD_MUNICIPIO";

/// A municipality boundary with its canonical code.
#[derive(Debug, Clone)]
pub struct MunicipalityGeometry {
    /// Canonical five-digit municipality code.
    pub code: MunicipalityCode,
    /// Department name from the feature properties.
    pub department_name: Option<String>,
    /// Municipality name from the feature properties.
    pub municipality_name: Option<String>,
    /// Bounding box of the boundary, if it has a geometry.
    pub bbox: Option<BoundingBox>,
    feature: Feature,
}

impl MunicipalityGeometry {
    /// The `GeoJSON` feature, with [`CODE_PROPERTY`] set.
    #[must_use]
    pub const fn feature(&self) -> &Feature {
        &self.feature
    }
}

/// Read-only set of municipality boundaries in file order.
#[derive(Debug, Clone, Default)]
pub struct GeometryStore {
    geometries: Vec<MunicipalityGeometry>,
    index: BTreeMap<MunicipalityCode, usize>,
    skipped: usize,
}

impl GeometryStore {
    /// Loads boundaries from a `GeoJSON` file.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::MissingResource`] if the file does not exist, or
    /// a parse error if it is not a `GeoJSON` `FeatureCollection`.
    pub fn load(path: &Path) -> Result<Self, GeoError> {
        if !path.exists() {
            return Err(GeoError::MissingResource {
                what: "Boundary GeoJSON",
                path: path.to_path_buf(),
            });
        }

        let body = std::fs::read_to_string(path)?;
        let store = Self::from_geojson_str(&body)?;

        log::info!(
            "Loaded {} municipality boundaries from {} ({} skipped)",
            store.len(),
            path.display(),
            store.skipped
        );
        Ok(store)
    }

    /// Parses boundaries from a `GeoJSON` string.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the string is not valid `GeoJSON` or is not a
    /// `FeatureCollection`.
    pub fn from_geojson_str(body: &str) -> Result<Self, GeoError> {
        let GeoJson::FeatureCollection(collection) = body.parse::<GeoJson>()? else {
            return Err(GeoError::Conversion {
                message: "Boundary file is not a GeoJSON FeatureCollection".to_string(),
            });
        };
        Ok(Self::from_features(collection.features))
    }

    /// Builds the store from already-parsed features.
    ///
    /// Features without a derivable code are skipped.
    #[must_use]
    pub fn from_features(features: Vec<Feature>) -> Self {
        let mut store = Self::default();

        for mut feature in features {
            let props = feature.properties.clone().unwrap_or_default();
            let Some(code) = derive_code(&props) else {
                log::warn!(
                    "Skipping boundary feature without a municipality code: {:?}",
                    feature.id
                );
                store.skipped += 1;
                continue;
            };

            feature.set_property(CODE_PROPERTY, code.as_str());

            let bbox = feature.geometry.as_ref().and_then(|geometry| {
                let geometry: geo::Geometry<f64> = geometry.clone().try_into().ok()?;
                geometry.bounding_rect().map(|rect| BoundingBox {
                    west: rect.min().x,
                    south: rect.min().y,
                    east: rect.max().x,
                    north: rect.max().y,
                })
            });

            store.index.entry(code.clone()).or_insert(store.geometries.len());
            store.geometries.push(MunicipalityGeometry {
                code,
                department_name: property_text(&props, "DPTO_CNMBR")
                    .or_else(|| property_text(&props, "DEPTO")),
                municipality_name: property_text(&props, "MPIO_CNMBR")
                    .or_else(|| property_text(&props, "MPIO_CCDGO")),
                bbox,
                feature,
            });
        }

        store
    }

    /// Looks up the first boundary with the given code.
    #[must_use]
    pub fn get(&self, code: &MunicipalityCode) -> Option<&MunicipalityGeometry> {
        self.index.get(code).map(|idx| &self.geometries[*idx])
    }

    /// Codes of every boundary, in file order.
    pub fn codes(&self) -> impl Iterator<Item = &MunicipalityCode> {
        self.geometries.iter().map(|g| &g.code)
    }

    /// Every boundary, in file order.
    pub fn iter(&self) -> impl Iterator<Item = &MunicipalityGeometry> {
        self.geometries.iter()
    }

    /// Number of boundaries kept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    /// Whether no boundaries were kept.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// Number of features dropped because no code could be derived.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    /// Rebuilds a `FeatureCollection` of the kept boundaries.
    #[must_use]
    pub fn feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.geometries.iter().map(|g| g.feature.clone()).collect(),
            foreign_members: None,
        }
    }
}

/// Derives the join key of a boundary feature.
///
/// Prefers `DPTO_CCDGO` + `MPIO_CCDGO`; falls back to the legacy
/// `MpCodigo` (or a bare `MPIO_CCDGO`) normalized to five digits.
#[must_use]
pub fn derive_code(props: &JsonObject) -> Option<MunicipalityCode> {
    let dpto = property_text(props, "DPTO_CCDGO");
    let mpio = property_text(props, "MPIO_CCDGO");

    if let (Some(d), Some(m)) = (dpto.as_deref(), mpio.as_deref())
        && let Some(code) = MunicipalityCode::from_parts(d, m)
    {
        return Some(code);
    }

    let legacy = property_text(props, "MpCodigo").or(mpio)?;
    let code = MunicipalityCode::normalize(&legacy);
    (!code.is_unassigned()).then_some(code)
}

/// Reads a property as text. Integral numbers are written without a
/// fractional part so `5001.0` stays `"5001"`.
fn property_text(props: &JsonObject, key: &str) -> Option<String> {
    match props.get(key)? {
        serde_json::Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(f) = n.as_f64()
                && f.is_finite()
                && f.fract().abs() < f64::EPSILON
            {
                Some(format!("{f:.0}"))
            } else {
                Some(n.to_string())
            }
        }
        _ => None,
    }
}
