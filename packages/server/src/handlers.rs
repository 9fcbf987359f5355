//! HTTP handler functions for the prediction API.

use actix_web::{HttpResponse, web};
use apropiacion_geography::choropleth::choropleth_layer;
use apropiacion_geography_models::{DepartmentCode, Indicator, MunicipalityCode};
use apropiacion_prediction::ErrorKind;
use apropiacion_server_models::{
    ApiCatalogs, ApiError, ApiHealth, ApiMunicipality, ApiVersion, PredictRequest,
    PredictResponse,
};

use crate::AppState;

/// Maps an error body to the status its kind calls for.
fn error_response(body: &ApiError) -> HttpResponse {
    match body.kind {
        ErrorKind::Validation => HttpResponse::UnprocessableEntity().json(body),
        ErrorKind::NotFound => HttpResponse::NotFound().json(body),
        ErrorKind::Internal => HttpResponse::InternalServerError().json(body),
    }
}

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_path: state.model_path.clone(),
        municipalities: state.service.store().len(),
        geometries: state.geometry.as_ref().map_or(0, |g| g.len()),
        started_at: state.started_at,
    })
}

/// `GET /api/version`
pub async fn version() -> HttpResponse {
    HttpResponse::Ok().json(ApiVersion {
        api: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /api/predict`
///
/// Predicts the index for one respondent. Validation failures are 422,
/// unknown or incomplete municipalities 404, inference failures 500.
pub async fn predict(
    state: web::Data<AppState>,
    body: web::Json<PredictRequest>,
) -> HttpResponse {
    match state.service.predict(&body) {
        Ok(result) => HttpResponse::Ok().json(PredictResponse::from(result)),
        Err(e) => {
            if e.kind() != ErrorKind::Internal {
                log::info!("Rejected prediction request: {e}");
            }
            error_response(&ApiError::from(&e))
        }
    }
}

/// `GET /api/catalogs`
///
/// Returns the option lists for every survey input and map metric.
pub async fn catalogs() -> HttpResponse {
    HttpResponse::Ok().json(ApiCatalogs::build())
}

/// `GET /api/departments`
pub async fn departments(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.service.store().departments())
}

/// `GET /api/departments/{code}/municipalities`
pub async fn municipalities(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let department = DepartmentCode::normalize(&path);
    HttpResponse::Ok().json(state.service.store().municipalities_in(&department))
}

/// `GET /api/municipalities/{code}`
pub async fn municipality(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let code = MunicipalityCode::normalize(&path);
    match state.service.store().lookup(&code) {
        Some(record) => HttpResponse::Ok().json(ApiMunicipality::from(record)),
        None => error_response(&ApiError {
            code: Some(code.to_string()),
            ..ApiError::not_found(format!(
                "Municipality code not found in master table: {code}"
            ))
        }),
    }
}

/// `GET /api/map/{metric}`
///
/// Returns one choropleth layer covering every boundary polygon.
pub async fn map(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let Some(indicator) = Indicator::from_metric_key(&path) else {
        let keys: Vec<&str> = Indicator::all().iter().map(|i| i.metric_key()).collect();
        return error_response(&ApiError::not_found(format!(
            "Unknown map metric {:?} (expected one of {})",
            path.as_str(),
            keys.join(", ")
        )));
    };

    let Some(geometry) = &state.geometry else {
        return error_response(&ApiError::not_found("Map geometry is not configured"));
    };

    HttpResponse::Ok().json(choropleth_layer(
        geometry,
        state.service.store(),
        indicator,
    ))
}

/// `GET /api/geometry`
///
/// Returns the boundaries as a `GeoJSON` `FeatureCollection` whose
/// features carry the normalized `COD_MUNICIPIO` property.
pub async fn geometry(state: web::Data<AppState>) -> HttpResponse {
    match &state.geometry {
        Some(geometry) => HttpResponse::Ok().json(geometry.feature_collection()),
        None => error_response(&ApiError::not_found("Map geometry is not configured")),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test};
    use apropiacion_features::Feature;
    use apropiacion_geography::{GeometryStore, ReferenceStore};
    use apropiacion_model::Pipeline;
    use apropiacion_prediction::PredictionService;
    use serde_json::{Value, json};

    use super::*;

    const MASTER: &str = "\
COD_DEPARTAMENTO,DEPARTAMENTO,COD_MUNICIPIO,MUNICIPIO,INDICE,ipm_depto,saber_punt_global_mean
05,ANTIOQUIA,05001,MEDELLÍN,0.73,12.4,245.0
05,ANTIOQUIA,05002,ABEJORRAL,0.31,,231.2
11,BOGOTÁ D.C.,11001,BOGOTÁ,0.81,4.4,262.9
";

    const BOUNDARIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": { "DPTO_CCDGO": "05", "MPIO_CCDGO": "001" }, "geometry": null },
            { "type": "Feature", "properties": { "DPTO_CCDGO": "05", "MPIO_CCDGO": "004", "MPIO_CNMBR": "ABRIAQUÍ" }, "geometry": null }
        ]
    }"#;

    fn state(with_geometry: bool) -> web::Data<AppState> {
        let store = ReferenceStore::from_reader(MASTER.as_bytes()).unwrap();
        let model = Pipeline::linear(&Feature::names(), &[1.0; 8], 0.0).unwrap();
        let service = PredictionService::new(Arc::new(store), Arc::new(model)).unwrap();
        let geometry = with_geometry.then(|| GeometryStore::from_geojson_str(BOUNDARIES).unwrap());
        web::Data::new(AppState::new(
            service,
            geometry,
            "memory://model.json".to_string(),
        ))
    }

    fn scenario_a() -> Value {
        json!({
            "municipio_code": "5001",
            "RANGO_EDAD": 2,
            "ESTRATO": 3,
            "PB1_bin": 1,
            "SEXO_bin": 1,
            "P33": 0
        })
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(App::new().app_data($state).configure(crate::configure)).await
        };
    }

    #[actix_web::test]
    async fn predicts_and_echoes_features() {
        let app = app!(state(false));
        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(scenario_a())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        let prediction = body["prediction"].as_f64().unwrap();
        assert!((prediction - 265.13).abs() < 1e-9);
        assert_eq!(
            body["features_used"],
            json!({
                "RANGO_EDAD": 2.0,
                "ESTRATO": 3.0,
                "PB1_bin": 1.0,
                "SEXO_bin": 1.0,
                "P33": 0.0,
                "INDICE": 0.73,
                "ipm_depto": 12.4,
                "saber_punt_global_mean": 245.0
            })
        );
    }

    #[actix_web::test]
    async fn inference_failure_is_500_with_detail() {
        let store = ReferenceStore::from_reader(MASTER.as_bytes()).unwrap();
        let model = Pipeline::linear(&Feature::names(), &[f64::MAX; 8], 0.0).unwrap();
        let service = PredictionService::new(Arc::new(store), Arc::new(model)).unwrap();
        let state = web::Data::new(AppState::new(service, None, "memory://model.json".to_string()));

        let app = app!(state);
        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(scenario_a())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], json!("internal"));
        assert_eq!(
            body["detail"],
            json!("Inference failed: Non-finite value in output")
        );
        assert!(body.get("code").is_none());
    }

    #[actix_web::test]
    async fn unknown_municipality_is_404() {
        let app = app!(state(false));
        let mut body = scenario_a();
        body["municipio_code"] = json!("99999");
        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], json!("not_found"));
        assert_eq!(body["code"], json!("99999"));
    }

    #[actix_web::test]
    async fn missing_indicator_is_404_naming_it() {
        let app = app!(state(false));
        let mut body = scenario_a();
        body["municipio_code"] = json!(5002);
        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["missing"], json!(["ipm_depto"]));
        assert_eq!(body["code"], json!("05002"));
    }

    #[actix_web::test]
    async fn invalid_fields_are_422() {
        let app = app!(state(false));
        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(json!({ "municipio_code": "05001", "RANGO_EDAD": 12 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], json!("validation"));
        let fields: Vec<&str> = body["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["RANGO_EDAD", "ESTRATO", "PB1_bin", "SEXO_bin", "P33"]);
    }

    #[actix_web::test]
    async fn malformed_json_is_a_validation_error() {
        let app = app!(state(false));
        let req = test::TestRequest::post()
            .uri("/api/predict")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], json!("validation"));
    }

    #[actix_web::test]
    async fn health_reports_loaded_data() {
        let app = app!(state(true));
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], json!(true));
        assert_eq!(body["modelPath"], json!("memory://model.json"));
        assert_eq!(body["municipalities"], json!(3));
        assert_eq!(body["geometries"], json!(2));
        assert!(body["startedAt"].is_string());

        let req = test::TestRequest::get().uri("/api/version").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["api"], json!(env!("CARGO_PKG_VERSION")));
    }

    #[actix_web::test]
    async fn lists_departments_and_municipalities() {
        let app = app!(state(false));
        let req = test::TestRequest::get().uri("/api/departments").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0], json!({ "code": "05", "name": "ANTIOQUIA" }));

        let req = test::TestRequest::get()
            .uri("/api/departments/5/municipalities")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[0]["name"], json!("ABEJORRAL"));

        let req = test::TestRequest::get()
            .uri("/api/municipalities/11001")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["name"], json!("BOGOTÁ"));
        assert_eq!(body["complete"], json!(true));

        let req = test::TestRequest::get()
            .uri("/api/municipalities/99999")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn map_layer_covers_every_boundary() {
        let app = app!(state(true));
        let req = test::TestRequest::get().uri("/api/map/indice").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let entries = body["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["value"], json!(0.73));
        assert_eq!(entries[1]["value"], Value::Null);

        let req = test::TestRequest::get().uri("/api/map/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/api/geometry").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["type"], json!("FeatureCollection"));
        assert_eq!(
            body["features"][1]["properties"]["COD_MUNICIPIO"],
            json!("05004")
        );
    }

    #[actix_web::test]
    async fn map_endpoints_404_without_geometry() {
        let app = app!(state(false));
        for uri in ["/api/map/IPM", "/api/geometry"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[actix_web::test]
    async fn catalogs_list_survey_options() {
        let app = app!(state(false));
        let req = test::TestRequest::get().uri("/api/catalogs").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["ageBrackets"][1], json!({ "value": 2, "label": "18-24" }));
        assert_eq!(body["usageFrequencies"].as_array().unwrap().len(), 7);
    }
}
