//! DANE geographic code utilities.
//!
//! Colombian municipality codes are five digits: two for the department
//! followed by three for the municipality within it. The master table, the
//! boundary polygons and incoming requests all spell them differently
//! (dropped leading zeros, separators, stray prefixes), so every code that
//! enters the system is canonicalized with [`normalize_code`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Width of a canonical municipality code (`DDMMM`).
pub const MUNICIPALITY_CODE_WIDTH: usize = 5;

/// Width of a canonical department code (`DD`).
pub const DEPARTMENT_CODE_WIDTH: usize = 2;

/// Width of the municipality part of a municipality code.
const MUNICIPALITY_PART_WIDTH: usize = 3;

/// Canonicalizes a geographic code to a zero-padded digit string of
/// exactly `width` characters.
///
/// Every non-digit character is dropped. If more than `width` digits
/// remain only the trailing `width` are kept. Input without any digit
/// yields an all-zero code, which never matches a real municipality.
#[must_use]
pub fn normalize_code(raw: &str, width: usize) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let tail = &digits[digits.len().saturating_sub(width)..];
    format!("{tail:0>width$}")
}

fn has_digits(raw: &str) -> bool {
    raw.chars().any(|c| c.is_ascii_digit())
}

fn is_all_zero(code: &str) -> bool {
    code.bytes().all(|b| b == b'0')
}

/// A canonical five-digit municipality code (e.g. `"05001"` for Medellín).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MunicipalityCode(String);

impl MunicipalityCode {
    /// Normalizes any digit-bearing representation into a municipality code.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        Self(normalize_code(raw, MUNICIPALITY_CODE_WIDTH))
    }

    /// Builds a code from separate department and municipality fragments
    /// (`"5"` + `"1"` becomes `"05001"`).
    ///
    /// Returns `None` if either fragment carries no digits.
    #[must_use]
    pub fn from_parts(department: &str, municipality: &str) -> Option<Self> {
        if !has_digits(department) || !has_digits(municipality) {
            return None;
        }
        let dept = normalize_code(department, DEPARTMENT_CODE_WIDTH);
        let mpio = normalize_code(municipality, MUNICIPALITY_PART_WIDTH);
        Some(Self(format!("{dept}{mpio}")))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the department this municipality belongs to.
    #[must_use]
    pub fn department(&self) -> DepartmentCode {
        DepartmentCode(self.0[..DEPARTMENT_CODE_WIDTH].to_string())
    }

    /// Whether this is the all-zero placeholder produced from input
    /// without digits. Such a code must be treated as "not found".
    #[must_use]
    pub fn is_unassigned(&self) -> bool {
        is_all_zero(&self.0)
    }
}

impl From<String> for MunicipalityCode {
    fn from(raw: String) -> Self {
        Self::normalize(&raw)
    }
}

impl From<MunicipalityCode> for String {
    fn from(code: MunicipalityCode) -> Self {
        code.0
    }
}

impl AsRef<str> for MunicipalityCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MunicipalityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A canonical two-digit department code (e.g. `"05"` for Antioquia).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DepartmentCode(String);

impl DepartmentCode {
    /// Normalizes any digit-bearing representation into a department code.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        Self(normalize_code(raw, DEPARTMENT_CODE_WIDTH))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// See [`MunicipalityCode::is_unassigned`].
    #[must_use]
    pub fn is_unassigned(&self) -> bool {
        is_all_zero(&self.0)
    }
}

impl From<String> for DepartmentCode {
    fn from(raw: String) -> Self {
        Self::normalize(&raw)
    }
}

impl From<DepartmentCode> for String {
    fn from(code: DepartmentCode) -> Self {
        code.0
    }
}

impl AsRef<str> for DepartmentCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DepartmentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_and_strips_separators() {
        for raw in ["5001", "05001", "5.001", " 05-001 ", "05,001"] {
            assert_eq!(MunicipalityCode::normalize(raw).as_str(), "05001", "{raw}");
        }
    }

    #[test]
    fn keeps_trailing_digits_when_too_long() {
        assert_eq!(MunicipalityCode::normalize("005001").as_str(), "05001");
        assert_eq!(MunicipalityCode::normalize("CO-1705001").as_str(), "05001");
        assert_eq!(DepartmentCode::normalize("105").as_str(), "05");
    }

    #[test]
    fn normalization_is_idempotent() {
        for n in [1u32, 42, 999, 5001, 11001, 99773] {
            for raw in [n.to_string(), format!("{n:05}"), format!("#{n}")] {
                let once = normalize_code(&raw, MUNICIPALITY_CODE_WIDTH);
                let twice = normalize_code(&once, MUNICIPALITY_CODE_WIDTH);
                assert_eq!(once, twice, "{raw}");
                assert_eq!(once, format!("{n:05}"));
            }
        }
    }

    #[test]
    fn input_without_digits_is_unassigned() {
        let code = MunicipalityCode::normalize("n/a");
        assert_eq!(code.as_str(), "00000");
        assert!(code.is_unassigned());
        assert!(MunicipalityCode::normalize("").is_unassigned());
        assert!(DepartmentCode::normalize("--").is_unassigned());
        assert!(!MunicipalityCode::normalize("5001").is_unassigned());
    }

    #[test]
    fn builds_from_department_and_municipality_parts() {
        let code = MunicipalityCode::from_parts("05", "001").unwrap();
        assert_eq!(code.as_str(), "05001");
        assert_eq!(
            MunicipalityCode::from_parts("5", "1").unwrap().as_str(),
            "05001"
        );
        // Some boundary files repeat the department inside MPIO_CCDGO.
        assert_eq!(
            MunicipalityCode::from_parts("05", "05001").unwrap().as_str(),
            "05001"
        );
        assert!(MunicipalityCode::from_parts("", "001").is_none());
        assert!(MunicipalityCode::from_parts("05", "abc").is_none());
    }

    #[test]
    fn department_is_code_prefix() {
        let code = MunicipalityCode::normalize("76001");
        assert_eq!(code.department().as_str(), "76");
    }

    #[test]
    fn serde_normalizes_on_the_way_in() {
        let code: MunicipalityCode = serde_json::from_str("\"5.001\"").unwrap();
        assert_eq!(code.as_str(), "05001");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"05001\"");
    }
}
