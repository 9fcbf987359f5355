//! One-off predictions from the command line.
//!
//! Runs either in-process against the local data files or against a
//! running server. Survey answers are passed through unvalidated so the
//! service reports problems exactly as it would for any other client.

use std::time::Duration;

use apropiacion_features::{AgeBracket, AreaType, Feature, Sex, Stratum, UsageFrequency};
use apropiacion_prediction::ErrorKind;
use apropiacion_server::{AppState, ServerConfig};
use apropiacion_server_models::{ApiError, PredictRequest, PredictResponse};
use clap::Args;
use dialoguer::{Input, Select};
use serde_json::Value;

use crate::CliError;

/// Default caller-side timeout for remote predictions, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Survey answers and municipality for one respondent.
#[derive(Debug, Clone, Args)]
pub struct SurveyArgs {
    /// Municipality DANE code (e.g. 05001)
    #[arg(long)]
    pub municipio: String,
    /// Age bracket, 1 (12-17) to 7 (65-75)
    #[arg(long)]
    pub rango_edad: f64,
    /// Socioeconomic stratum, 1 to 6
    #[arg(long)]
    pub estrato: f64,
    /// 1 for urban, 0 for rural
    #[arg(long)]
    pub pb1_bin: f64,
    /// 1 for male, 0 for female
    #[arg(long)]
    pub sexo_bin: f64,
    /// Internet use frequency, 0 (daily) to 6 (never)
    #[arg(long)]
    pub p33: f64,
    /// Department code, informational only
    #[arg(long)]
    pub dept_code: Option<String>,
}

impl SurveyArgs {
    /// The request body the server would receive.
    #[must_use]
    pub fn to_request(&self) -> PredictRequest {
        PredictRequest {
            municipio_code: Some(Value::from(self.municipio.as_str())),
            age_bracket: Some(Value::from(self.rango_edad)),
            stratum: Some(Value::from(self.estrato)),
            area: Some(Value::from(self.pb1_bin)),
            sex: Some(Value::from(self.sexo_bin)),
            usage_frequency: Some(Value::from(self.p33)),
            dept_code: self.dept_code.as_deref().map(Value::from),
        }
    }
}

/// Runs one prediction in-process.
///
/// # Errors
///
/// Returns [`CliError`] if the data files cannot be loaded or the service
/// rejects the request.
pub fn predict_local(config: &ServerConfig, survey: &SurveyArgs) -> Result<PredictResponse, CliError> {
    let state = AppState::load(config)?;
    let result = state.service.predict(&survey.to_request())?;
    Ok(result.into())
}

/// Sends one prediction request to a running server.
///
/// # Errors
///
/// Returns [`CliError::Timeout`] if the server does not answer within
/// `timeout`, [`CliError::Remote`] if it answers with an error body, or
/// [`CliError::Http`] for any other transport failure.
pub async fn predict_remote(
    api_url: &str,
    timeout: Duration,
    survey: &SurveyArgs,
) -> Result<PredictResponse, CliError> {
    let url = format!("{}/api/predict", api_url.trim_end_matches('/'));
    let transport = |source: reqwest::Error| {
        if source.is_timeout() {
            CliError::Timeout {
                url: url.clone(),
                secs: timeout.as_secs(),
            }
        } else {
            CliError::Http {
                url: url.clone(),
                source,
            }
        }
    };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(transport)?;

    log::debug!("POST {url}");
    let response = client
        .post(&url)
        .json(&survey.to_request())
        .send()
        .await
        .map_err(transport)?;

    let status = response.status();
    if status.is_success() {
        return response.json::<PredictResponse>().await.map_err(transport);
    }

    let body = response.json::<ApiError>().await.unwrap_or_else(|_| ApiError {
        kind: ErrorKind::Internal,
        ..ApiError::validation(format!("Server answered {status}"))
    });
    Err(CliError::Remote {
        kind: body.kind,
        detail: body.detail,
    })
}

/// Prints a prediction and the inputs it was made from.
pub fn print_prediction(response: &PredictResponse) {
    println!("Predicted index: {:.4}", response.prediction);
    println!();
    println!("{:<24} VALUE", "FEATURE");
    println!("{}", "-".repeat(36));
    for (feature, value) in response.features_used.iter() {
        println!("{feature:<24} {value}");
    }
}

/// Asks for every survey answer using the labeled option lists.
///
/// # Errors
///
/// Returns [`dialoguer::Error`] if the terminal cannot be read.
pub fn prompt_survey() -> Result<SurveyArgs, dialoguer::Error> {
    let municipio: String = Input::new()
        .with_prompt("Municipality code (DANE)")
        .default("05001".to_string())
        .interact_text()?;

    let ages = AgeBracket::all();
    let labels: Vec<String> = ages
        .iter()
        .map(|a| format!("{} ({})", a.code(), a.label()))
        .collect();
    let age = ages[select(Feature::AgeBracket, &labels)?];

    let strata = Stratum::all();
    let labels: Vec<String> = strata.iter().map(|s| s.code().to_string()).collect();
    let stratum = strata[select(Feature::Stratum, &labels)?];

    let areas = AreaType::all();
    let labels: Vec<String> = areas.iter().map(ToString::to_string).collect();
    let area = areas[select(Feature::AreaType, &labels)?];

    let sexes = Sex::all();
    let labels: Vec<String> = sexes.iter().map(ToString::to_string).collect();
    let sex = sexes[select(Feature::Sex, &labels)?];

    let usages = UsageFrequency::all();
    let labels: Vec<String> = usages.iter().map(ToString::to_string).collect();
    let usage = usages[select(Feature::UsageFrequency, &labels)?];

    Ok(SurveyArgs {
        municipio,
        rango_edad: f64::from(age.code()),
        estrato: f64::from(stratum.code()),
        pb1_bin: f64::from(area.code()),
        sexo_bin: f64::from(sex.code()),
        p33: f64::from(usage.code()),
        dept_code: None,
    })
}

fn select(feature: Feature, labels: &[String]) -> Result<usize, dialoguer::Error> {
    Select::new()
        .with_prompt(feature.to_string())
        .items(labels)
        .default(0)
        .interact()
}
