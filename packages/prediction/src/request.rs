//! Prediction request parsing.
//!
//! Clients send survey answers as JSON numbers or numeric strings (the
//! dashboard sends both, and regional formatting uses a decimal comma), so
//! every field is accepted as a raw JSON value and checked here.

use apropiacion_features::{
    AgeBracket, AreaType, Feature, Sex, Stratum, SurveyError, SurveyFields, UsageFrequency,
};
use apropiacion_geography_models::{DepartmentCode, MunicipalityCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire name of the municipality code field.
pub const MUNICIPALITY_FIELD: &str = "municipio_code";
/// Wire name of the optional department code field.
pub const DEPARTMENT_FIELD: &str = "dept_code";

/// The prediction request body as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    #[serde(default)]
    pub municipio_code: Option<Value>,
    #[serde(rename = "RANGO_EDAD", default)]
    pub age_bracket: Option<Value>,
    #[serde(rename = "ESTRATO", default)]
    pub stratum: Option<Value>,
    #[serde(rename = "PB1_bin", default)]
    pub area: Option<Value>,
    #[serde(rename = "SEXO_bin", default)]
    pub sex: Option<Value>,
    #[serde(rename = "P33", default)]
    pub usage_frequency: Option<Value>,
    #[serde(default)]
    pub dept_code: Option<Value>,
}

/// One rejected request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Wire name of the field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl FieldError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<SurveyError> for FieldError {
    fn from(err: SurveyError) -> Self {
        Self::new(err.feature().as_ref(), err.to_string())
    }
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRequest {
    pub code: MunicipalityCode,
    pub survey: SurveyFields,
    pub department_code: Option<DepartmentCode>,
}

impl PredictionInput {
    /// Builds an input from already-typed values.
    #[must_use]
    pub fn from_survey(code: &str, survey: &SurveyFields, dept_code: Option<&str>) -> Self {
        let [age, stratum, area, sex, usage] = survey.values().map(Value::from);
        Self {
            municipio_code: Some(Value::from(code)),
            age_bracket: Some(age),
            stratum: Some(stratum),
            area: Some(area),
            sex: Some(sex),
            usage_frequency: Some(usage),
            dept_code: dept_code.map(Value::from),
        }
    }

    /// Checks every field and collects all problems.
    ///
    /// # Errors
    ///
    /// Returns one [`FieldError`] per invalid field if any field is
    /// missing, non-numeric, fractional or out of range, or if the
    /// municipality code carries no digits.
    pub fn validate(&self) -> Result<PredictionRequest, Vec<FieldError>> {
        let mut errors = Vec::new();

        let code = match code_text(MUNICIPALITY_FIELD, self.municipio_code.as_ref()) {
            Ok(Some(raw)) => {
                let code = MunicipalityCode::normalize(&raw);
                if code.is_unassigned() {
                    errors.push(FieldError::new(
                        MUNICIPALITY_FIELD,
                        "must contain a municipality code",
                    ));
                    None
                } else {
                    Some(code)
                }
            }
            Ok(None) => {
                errors.push(FieldError::new(MUNICIPALITY_FIELD, "field required"));
                None
            }
            Err(err) => {
                errors.push(err);
                None
            }
        };

        let age = survey_field(
            Feature::AgeBracket,
            self.age_bracket.as_ref(),
            AgeBracket::from_value,
            &mut errors,
        );
        let stratum = survey_field(
            Feature::Stratum,
            self.stratum.as_ref(),
            Stratum::from_value,
            &mut errors,
        );
        let area = survey_field(
            Feature::AreaType,
            self.area.as_ref(),
            AreaType::from_value,
            &mut errors,
        );
        let sex = survey_field(Feature::Sex, self.sex.as_ref(), Sex::from_value, &mut errors);
        let usage = survey_field(
            Feature::UsageFrequency,
            self.usage_frequency.as_ref(),
            UsageFrequency::from_value,
            &mut errors,
        );

        let department_code = match code_text(DEPARTMENT_FIELD, self.dept_code.as_ref()) {
            Ok(raw) => raw
                .map(|raw| DepartmentCode::normalize(&raw))
                .filter(|d| !d.is_unassigned()),
            Err(err) => {
                errors.push(err);
                None
            }
        };

        match (code, age, stratum, area, sex, usage) {
            (
                Some(code),
                Some(age_bracket),
                Some(stratum),
                Some(area),
                Some(sex),
                Some(usage_frequency),
            ) if errors.is_empty() => Ok(PredictionRequest {
                code,
                survey: SurveyFields {
                    age_bracket,
                    stratum,
                    area,
                    sex,
                    usage_frequency,
                },
                department_code,
            }),
            _ => Err(errors),
        }
    }
}

fn survey_field<T>(
    feature: Feature,
    raw: Option<&Value>,
    parse: fn(f64) -> Result<T, SurveyError>,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    let value = match numeric_value(raw) {
        Ok(value) => value,
        Err(message) => {
            errors.push(FieldError::new(feature.as_ref(), message));
            return None;
        }
    };
    parse(value).map_err(|e| errors.push(e.into())).ok()
}

fn numeric_value(raw: Option<&Value>) -> Result<f64, &'static str> {
    match raw {
        None | Some(Value::Null) => Err("field required"),
        Some(Value::Number(n)) => n.as_f64().ok_or("must be a number"),
        Some(Value::String(s)) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|_| "must be a number"),
        Some(_) => Err("must be a number"),
    }
}

/// Reads a code field given as a string or a number. `None` means the
/// field was absent, null or blank.
fn code_text(field: &str, raw: Option<&Value>) -> Result<Option<String>, FieldError> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
        Some(Value::Number(n)) => Ok(Some(match (n.as_u64(), n.as_f64()) {
            (Some(u), _) => u.to_string(),
            (None, Some(f)) if f.is_finite() && f.fract().abs() < f64::EPSILON => {
                format!("{f:.0}")
            }
            _ => n.to_string(),
        })),
        Some(_) => Err(FieldError::new(field, "must be a string or a number")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn input(body: &Value) -> PredictionInput {
        serde_json::from_value(body.clone()).unwrap()
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let request = input(&json!({
            "municipio_code": 5001.0,
            "RANGO_EDAD": "2",
            "ESTRATO": 3,
            "PB1_bin": "1,0",
            "SEXO_bin": 1.0,
            "P33": 0,
            "dept_code": "5"
        }))
        .validate()
        .unwrap();

        assert_eq!(request.code.as_str(), "05001");
        assert_eq!(request.survey.values(), [2.0, 3.0, 1.0, 1.0, 0.0]);
        assert_eq!(request.department_code.unwrap().as_str(), "05");
    }

    #[test]
    fn reports_every_problem_together() {
        let errors = input(&json!({
            "RANGO_EDAD": 9,
            "ESTRATO": "tres",
            "PB1_bin": 1,
            "SEXO_bin": 0.5
        }))
        .validate()
        .unwrap_err();

        assert_eq!(
            fields(&errors),
            vec!["municipio_code", "RANGO_EDAD", "ESTRATO", "SEXO_bin", "P33"]
        );
        assert_eq!(errors[4].message, "field required");
    }

    #[test]
    fn rejects_codes_without_digits() {
        let errors = input(&json!({
            "municipio_code": "sin código",
            "RANGO_EDAD": 2, "ESTRATO": 3, "PB1_bin": 1, "SEXO_bin": 1, "P33": 0
        }))
        .validate()
        .unwrap_err();
        assert_eq!(fields(&errors), vec!["municipio_code"]);

        let errors = input(&json!({
            "municipio_code": true,
            "RANGO_EDAD": 2, "ESTRATO": 3, "PB1_bin": 1, "SEXO_bin": 1, "P33": 0
        }))
        .validate()
        .unwrap_err();
        assert_eq!(errors[0].message, "must be a string or a number");
    }

    #[test]
    fn blank_department_code_is_ignored() {
        let request = input(&json!({
            "municipio_code": "05001",
            "RANGO_EDAD": 2, "ESTRATO": 3, "PB1_bin": 1, "SEXO_bin": 1, "P33": 0,
            "dept_code": ""
        }))
        .validate()
        .unwrap();
        assert!(request.department_code.is_none());
    }

    #[test]
    fn typed_survey_round_trips_through_input() {
        let survey = SurveyFields::from_values(7.0, 6.0, 0.0, 0.0, 6.0).unwrap();
        let request = PredictionInput::from_survey("76001", &survey, None)
            .validate()
            .unwrap();
        assert_eq!(request.survey, survey);
        assert_eq!(request.code.as_str(), "76001");
    }
}
