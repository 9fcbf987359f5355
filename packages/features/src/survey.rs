//! Answers a respondent gives about themselves.
//!
//! Each answer is an integer code from the national ICT survey. The
//! constructors take the raw number a client sent and reject anything that
//! is not a whole number inside the code's range.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::Feature;

/// A survey answer that is not a valid code.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SurveyError {
    /// The answer has a fractional part or is not finite.
    #[error("{feature} must be a whole number, got {value}")]
    NotWhole {
        /// Which answer.
        feature: Feature,
        /// Value received.
        value: f64,
    },

    /// The answer is a whole number outside the code range.
    #[error("{feature} must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// Which answer.
        feature: Feature,
        /// Value received.
        value: f64,
        /// Lowest valid code.
        min: u8,
        /// Highest valid code.
        max: u8,
    },
}

impl SurveyError {
    /// The input the error refers to.
    #[must_use]
    pub const fn feature(&self) -> Feature {
        match self {
            Self::NotWhole { feature, .. } | Self::OutOfRange { feature, .. } => *feature,
        }
    }
}

fn whole_in_range(feature: Feature, value: f64, min: u8, max: u8) -> Result<u8, SurveyError> {
    if !value.is_finite() || value.fract().abs() > 0.0 {
        return Err(SurveyError::NotWhole { feature, value });
    }
    if value < f64::from(min) || value > f64::from(max) {
        return Err(SurveyError::OutOfRange {
            feature,
            value,
            min,
            max,
        });
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(value as u8)
}

/// Age bracket, coded 1 (12-17) through 7 (65-75).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "u8")]
pub struct AgeBracket(u8);

impl TryFrom<f64> for AgeBracket {
    type Error = SurveyError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<AgeBracket> for u8 {
    fn from(value: AgeBracket) -> Self {
        value.0
    }
}

impl AgeBracket {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 7;

    /// # Errors
    ///
    /// Returns [`SurveyError`] if `value` is not a whole number in `1..=7`.
    pub fn from_value(value: f64) -> Result<Self, SurveyError> {
        whole_in_range(Feature::AgeBracket, value, Self::MIN, Self::MAX).map(Self)
    }

    #[must_use]
    pub const fn code(self) -> u8 {
        self.0
    }

    /// Age range in years.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self.0 {
            1 => "12-17",
            2 => "18-24",
            3 => "25-34",
            4 => "35-44",
            5 => "45-54",
            6 => "55-64",
            _ => "65-75",
        }
    }

    /// Every bracket in code order.
    #[must_use]
    pub fn all() -> Vec<Self> {
        (Self::MIN..=Self::MAX).map(Self).collect()
    }
}

/// Socioeconomic stratum, 1 (lowest) through 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "u8")]
pub struct Stratum(u8);

impl TryFrom<f64> for Stratum {
    type Error = SurveyError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<Stratum> for u8 {
    fn from(value: Stratum) -> Self {
        value.0
    }
}

impl Stratum {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    /// # Errors
    ///
    /// Returns [`SurveyError`] if `value` is not a whole number in `1..=6`.
    pub fn from_value(value: f64) -> Result<Self, SurveyError> {
        whole_in_range(Feature::Stratum, value, Self::MIN, Self::MAX).map(Self)
    }

    #[must_use]
    pub const fn code(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn all() -> Vec<Self> {
        (Self::MIN..=Self::MAX).map(Self).collect()
    }
}

/// Household area.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum AreaType {
    #[strum(serialize = "Rural")]
    Rural = 0,
    #[strum(serialize = "Urbana")]
    Urban = 1,
}

impl AreaType {
    /// # Errors
    ///
    /// Returns [`SurveyError`] if `value` is not `0` or `1`.
    pub fn from_value(value: f64) -> Result<Self, SurveyError> {
        Ok(match whole_in_range(Feature::AreaType, value, 0, 1)? {
            0 => Self::Rural,
            _ => Self::Urban,
        })
    }

    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn all() -> [Self; 2] {
        [Self::Urban, Self::Rural]
    }
}

/// Respondent sex.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum Sex {
    #[strum(serialize = "Femenino")]
    Female = 0,
    #[strum(serialize = "Masculino")]
    Male = 1,
}

impl Sex {
    /// # Errors
    ///
    /// Returns [`SurveyError`] if `value` is not `0` or `1`.
    pub fn from_value(value: f64) -> Result<Self, SurveyError> {
        Ok(match whole_in_range(Feature::Sex, value, 0, 1)? {
            0 => Self::Female,
            _ => Self::Male,
        })
    }

    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn all() -> [Self; 2] {
        [Self::Male, Self::Female]
    }
}

/// How often the respondent uses the internet (survey question P33).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum UsageFrequency {
    #[strum(serialize = "Todos los días")]
    Daily = 0,
    #[strum(serialize = "De 4 a 6 veces a la semana")]
    FourToSixWeekly = 1,
    #[strum(serialize = "De 2 a 3 veces a la semana")]
    TwoToThreeWeekly = 2,
    #[strum(serialize = "Una vez a la semana")]
    Weekly = 3,
    #[strum(serialize = "Una vez cada quince días")]
    Fortnightly = 4,
    #[strum(serialize = "Una vez al mes")]
    Monthly = 5,
    #[strum(serialize = "Nunca / No usa / NS")]
    Never = 6,
}

impl UsageFrequency {
    /// # Errors
    ///
    /// Returns [`SurveyError`] if `value` is not a whole number in `0..=6`.
    pub fn from_value(value: f64) -> Result<Self, SurveyError> {
        let code = whole_in_range(Feature::UsageFrequency, value, 0, 6)?;
        Ok(Self::all()[usize::from(code)])
    }

    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Every answer in code order.
    #[must_use]
    pub const fn all() -> [Self; 7] {
        [
            Self::Daily,
            Self::FourToSixWeekly,
            Self::TwoToThreeWeekly,
            Self::Weekly,
            Self::Fortnightly,
            Self::Monthly,
            Self::Never,
        ]
    }
}

/// The five per-respondent model inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyFields {
    pub age_bracket: AgeBracket,
    pub stratum: Stratum,
    pub area: AreaType,
    pub sex: Sex,
    pub usage_frequency: UsageFrequency,
}

impl SurveyFields {
    /// Validates all five raw answers at once.
    ///
    /// # Errors
    ///
    /// Returns every invalid answer, in model input order, if any fails.
    pub fn from_values(
        age_bracket: f64,
        stratum: f64,
        area: f64,
        sex: f64,
        usage_frequency: f64,
    ) -> Result<Self, Vec<SurveyError>> {
        let age_bracket = AgeBracket::from_value(age_bracket);
        let stratum = Stratum::from_value(stratum);
        let area = AreaType::from_value(area);
        let sex = Sex::from_value(sex);
        let usage_frequency = UsageFrequency::from_value(usage_frequency);

        match (age_bracket, stratum, area, sex, usage_frequency) {
            (Ok(age_bracket), Ok(stratum), Ok(area), Ok(sex), Ok(usage_frequency)) => Ok(Self {
                age_bracket,
                stratum,
                area,
                sex,
                usage_frequency,
            }),
            (a, b, c, d, e) => Err([a.err(), b.err(), c.err(), d.err(), e.err()]
                .into_iter()
                .flatten()
                .collect()),
        }
    }

    /// Model values for the survey inputs, in model order.
    #[must_use]
    pub fn values(&self) -> [f64; 5] {
        [
            f64::from(self.age_bracket.code()),
            f64::from(self.stratum.code()),
            f64::from(self.area.code()),
            f64::from(self.sex.code()),
            f64::from(self.usage_frequency.code()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_every_code_in_range() {
        assert_eq!(AgeBracket::all().len(), 7);
        assert_eq!(Stratum::all().len(), 6);
        for code in 0..=6u8 {
            let usage = UsageFrequency::from_value(f64::from(code)).unwrap();
            assert_eq!(usage.code(), code);
        }
        assert_eq!(AreaType::from_value(1.0).unwrap(), AreaType::Urban);
        assert_eq!(Sex::from_value(0.0).unwrap(), Sex::Female);
    }

    #[test]
    fn rejects_out_of_range_and_fractional_values() {
        assert!(matches!(
            AgeBracket::from_value(8.0),
            Err(SurveyError::OutOfRange {
                feature: Feature::AgeBracket,
                min: 1,
                max: 7,
                ..
            })
        ));
        assert!(matches!(
            Stratum::from_value(0.0),
            Err(SurveyError::OutOfRange { .. })
        ));
        assert!(matches!(
            Stratum::from_value(2.5),
            Err(SurveyError::NotWhole { .. })
        ));
        assert!(matches!(
            Sex::from_value(f64::NAN),
            Err(SurveyError::NotWhole { .. })
        ));
        assert!(AreaType::from_value(-1.0).is_err());
    }

    #[test]
    fn labels_match_survey_catalog() {
        assert_eq!(AgeBracket::from_value(1.0).unwrap().label(), "12-17");
        assert_eq!(AgeBracket::from_value(7.0).unwrap().label(), "65-75");
        assert_eq!(UsageFrequency::Never.to_string(), "Nunca / No usa / NS");
        assert_eq!(AreaType::Urban.as_ref(), "Urbana");
        assert_eq!(Sex::Male.to_string(), "Masculino");
    }

    #[test]
    fn reports_every_invalid_answer() {
        let errors = SurveyFields::from_values(2.0, 9.0, 1.0, 3.0, 0.0).unwrap_err();
        let fields: Vec<_> = errors.iter().map(SurveyError::feature).collect();
        assert_eq!(fields, vec![Feature::Stratum, Feature::Sex]);
    }

    #[test]
    fn deserializing_checks_ranges() {
        assert!(serde_json::from_str::<AgeBracket>("0").is_err());
        assert!(serde_json::from_str::<Stratum>("2.5").is_err());
        assert_eq!(serde_json::from_str::<Stratum>("6").unwrap().code(), 6);

        let body = r#"{
            "age_bracket": 99,
            "stratum": 0,
            "area": "Urban",
            "sex": "Male",
            "usage_frequency": "Daily"
        }"#;
        assert!(serde_json::from_str::<SurveyFields>(body).is_err());

        let survey = SurveyFields::from_values(3.0, 2.0, 1.0, 0.0, 4.0).unwrap();
        let json = serde_json::to_string(&survey).unwrap();
        assert!(json.contains(r#""age_bracket":3"#));
        assert_eq!(serde_json::from_str::<SurveyFields>(&json).unwrap(), survey);
    }

    #[test]
    fn values_follow_model_order() {
        let survey = SurveyFields::from_values(2.0, 3.0, 1.0, 1.0, 0.0).unwrap();
        assert_eq!(survey.values(), [2.0, 3.0, 1.0, 1.0, 0.0]);
    }
}
