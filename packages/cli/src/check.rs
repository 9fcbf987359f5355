//! Reference data consistency report.

use std::sync::Arc;

use apropiacion_geography::{GeometryStore, ReferenceStore};
use apropiacion_geography_models::MunicipalityCode;
use apropiacion_model::Pipeline;
use apropiacion_prediction::PredictionService;
use apropiacion_server::{GeometrySource, ServerConfig};

use crate::CliError;

/// How many codes to list per section before summarizing.
const LIST_LIMIT: usize = 20;

/// Loads every configured data file and prints what would keep a
/// municipality from being predicted or drawn.
///
/// # Errors
///
/// Returns [`CliError`] if the master table or a configured boundary file
/// cannot be loaded. A missing or mismatched model is reported, not fatal.
pub fn run(config: &ServerConfig) -> Result<(), CliError> {
    let store = ReferenceStore::load(&config.master_csv_path)?;

    println!("Master table: {}", config.master_csv_path.display());
    println!("  {} municipalities", store.len());
    for (field, header) in store.columns().iter() {
        println!("  {field:<22} <- {header}");
    }

    let incomplete: Vec<_> = store.incomplete().collect();
    println!("  {} municipalities with missing indicators", incomplete.len());
    for (record, missing) in incomplete.iter().take(LIST_LIMIT) {
        let names: Vec<&str> = missing.iter().map(|i| i.feature_name()).collect();
        println!(
            "    {} {}: {}",
            record.code,
            record.name.as_deref().unwrap_or(""),
            names.join(", ")
        );
    }
    print_overflow(incomplete.len());

    match Pipeline::load(&config.model_path) {
        Ok(model) => {
            println!("Model: {}", config.model_path.display());
            let name = model.name.clone().unwrap_or_else(|| "<unnamed>".to_string());
            match PredictionService::new(Arc::new(store.clone()), Arc::new(model)) {
                Ok(_) => println!("  {name}: inputs match"),
                Err(e) => println!("  {name}: {e}"),
            }
        }
        Err(e) => println!("Model: {e}"),
    }

    let path = match config.geometry_source() {
        GeometrySource::Required(path) | GeometrySource::Default(path) => path,
        GeometrySource::Disabled => {
            println!("Boundaries: not configured");
            return Ok(());
        }
    };

    let geometry = GeometryStore::load(&path)?;
    println!("Boundaries: {}", path.display());
    println!(
        "  {} polygons ({} without a code)",
        geometry.len(),
        geometry.skipped()
    );

    let unmatched = unmatched_geometry(&geometry, &store);
    println!("  {} polygons without a master table row", unmatched.len());
    print_codes(&unmatched);

    let undrawn: Vec<&MunicipalityCode> = store
        .all_codes()
        .filter(|code| geometry.get(code).is_none())
        .collect();
    println!("  {} master table rows without a polygon", undrawn.len());
    print_codes(&undrawn);

    Ok(())
}

/// Boundary codes with no master table row, in file order.
fn unmatched_geometry<'a>(
    geometry: &'a GeometryStore,
    store: &ReferenceStore,
) -> Vec<&'a MunicipalityCode> {
    geometry
        .codes()
        .filter(|code| store.lookup(code).is_none())
        .collect()
}

fn print_codes(codes: &[&MunicipalityCode]) {
    if codes.is_empty() {
        return;
    }
    let shown: Vec<&str> = codes.iter().take(LIST_LIMIT).map(|c| c.as_str()).collect();
    println!("    {}", shown.join(" "));
    print_overflow(codes.len());
}

fn print_overflow(total: usize) {
    if total > LIST_LIMIT {
        println!("    ... and {} more", total - LIST_LIMIT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_polygons_without_rows() {
        let store = ReferenceStore::from_reader(
            "COD_MUNICIPIO,INDICE,ipm_depto,saber_punt_global_mean\n05001,0.7,12,245\n".as_bytes(),
        )
        .unwrap();
        let geometry = GeometryStore::from_geojson_str(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    { "type": "Feature", "properties": { "MpCodigo": "5001" }, "geometry": null },
                    { "type": "Feature", "properties": { "MpCodigo": "5004" }, "geometry": null }
                ]
            }"#,
        )
        .unwrap();

        let unmatched = unmatched_geometry(&geometry, &store);
        assert_eq!(unmatched, vec![&MunicipalityCode::normalize("05004")]);
    }
}
