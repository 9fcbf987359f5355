//! Municipality master table.
//!
//! One row per municipality with its department, names and the three
//! indicators used as model inputs. Codes are canonicalized at load time
//! and duplicate codes keep their first row.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::io::Read;
use std::path::Path;

use apropiacion_geography_models::{
    DepartmentCode, DepartmentSummary, Indicator, IndicatorValue, MunicipalityCode,
    MunicipalityRecord, MunicipalitySummary,
};

use crate::GeoError;
use crate::columns::{ColumnField, ResolvedColumns};

/// Read-only index of the master table keyed by municipality code.
#[derive(Debug, Clone)]
pub struct ReferenceStore {
    records: BTreeMap<MunicipalityCode, MunicipalityRecord>,
    columns: ResolvedColumns,
}

impl ReferenceStore {
    /// Loads the master table from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::MissingResource`] if the file does not exist,
    /// [`GeoError::MissingColumn`] if a required column cannot be located,
    /// or an I/O or CSV error if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self, GeoError> {
        if !path.exists() {
            return Err(GeoError::MissingResource {
                what: "Master table",
                path: path.to_path_buf(),
            });
        }

        let file = std::fs::File::open(path)?;
        let store = Self::from_reader(file)?;

        log::info!(
            "Loaded {} municipalities from {}",
            store.len(),
            path.display()
        );
        Ok(store)
    }

    /// Parses the master table from any CSV source.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::MissingColumn`] if a required column cannot be
    /// located, or a CSV error if the data is malformed.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, GeoError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_owned())
            .collect();

        let columns = ResolvedColumns::resolve(&headers)?;
        let mut records = BTreeMap::new();
        let mut duplicates = 0u64;
        let mut unassigned = 0u64;

        for result in reader.records() {
            let row = result?;
            let cell = |field: ColumnField| {
                columns
                    .index(field)
                    .and_then(|idx| row.get(idx))
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
            };

            let code = MunicipalityCode::normalize(
                cell(ColumnField::MunicipalityCode).unwrap_or_default(),
            );
            if code.is_unassigned() {
                unassigned += 1;
                continue;
            }

            let department_code = cell(ColumnField::DepartmentCode)
                .map(DepartmentCode::normalize)
                .filter(|d| !d.is_unassigned())
                .unwrap_or_else(|| code.department());

            let record = MunicipalityRecord {
                code: code.clone(),
                department_code,
                department_name: cell(ColumnField::DepartmentName).map(ToOwned::to_owned),
                name: cell(ColumnField::MunicipalityName).map(ToOwned::to_owned),
                internet_penetration: parse_indicator(cell(ColumnField::InternetPenetration)),
                poverty: parse_indicator(cell(ColumnField::Poverty)),
                test_score: parse_indicator(cell(ColumnField::TestScore)),
            };

            match records.entry(code) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(_) => duplicates += 1,
            }
        }

        if unassigned > 0 {
            log::warn!("Skipped {unassigned} master table rows without a municipality code");
        }
        if duplicates > 0 {
            log::warn!("Dropped {duplicates} duplicate municipality rows (kept first occurrence)");
        }

        Ok(Self { records, columns })
    }

    /// Looks up a municipality by canonical code.
    #[must_use]
    pub fn lookup(&self, code: &MunicipalityCode) -> Option<&MunicipalityRecord> {
        self.records.get(code)
    }

    /// Every municipality code in the table, in ascending order.
    pub fn all_codes(&self) -> impl Iterator<Item = &MunicipalityCode> {
        self.records.keys()
    }

    /// Every record in the table, ordered by code.
    pub fn records(&self) -> impl Iterator<Item = &MunicipalityRecord> {
        self.records.values()
    }

    /// Number of municipalities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records lacking at least one indicator, with the indicators they lack.
    pub fn incomplete(&self) -> impl Iterator<Item = (&MunicipalityRecord, Vec<Indicator>)> {
        self.records.values().filter_map(|r| {
            let missing = r.missing_indicators();
            (!missing.is_empty()).then_some((r, missing))
        })
    }

    /// Headers the logical columns were resolved to.
    #[must_use]
    pub const fn columns(&self) -> &ResolvedColumns {
        &self.columns
    }

    /// Distinct departments sorted by name.
    ///
    /// A department's name is taken from its first municipality that has
    /// one; departments without any name are listed under their code.
    #[must_use]
    pub fn departments(&self) -> Vec<DepartmentSummary> {
        let mut names: BTreeMap<&DepartmentCode, Option<&str>> = BTreeMap::new();
        for record in self.records.values() {
            let name = names.entry(&record.department_code).or_default();
            if name.is_none() {
                *name = record.department_name.as_deref();
            }
        }

        let mut departments: Vec<DepartmentSummary> = names
            .into_iter()
            .map(|(code, name)| DepartmentSummary {
                code: code.clone(),
                name: name.map_or_else(|| code.to_string(), ToOwned::to_owned),
            })
            .collect();
        departments.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
        departments
    }

    /// Municipalities of one department sorted by name.
    #[must_use]
    pub fn municipalities_in(&self, department: &DepartmentCode) -> Vec<MunicipalitySummary> {
        let mut municipalities: Vec<MunicipalitySummary> = self
            .records
            .values()
            .filter(|r| &r.department_code == department)
            .map(|r| MunicipalitySummary {
                code: r.code.clone(),
                name: r.name.clone().unwrap_or_else(|| r.code.to_string()),
            })
            .collect();
        municipalities.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
        municipalities
    }
}

fn parse_indicator(raw: Option<&str>) -> IndicatorValue {
    raw.map_or(IndicatorValue::Absent, IndicatorValue::parse)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "\
COD_DEPARTAMENTO,DEPARTAMENTO,COD_MUNICIPIO,MUNICIPIO,INDICE,ipm_depto,saber_punt_global_mean
5,ANTIOQUIA,5001,MEDELLÍN,\"0,73\",12.4,245.0
5,ANTIOQUIA,5002,ABEJORRAL,0.31,,231.2
5,ANTIOQUIA,5.001,MEDELLÍN DUPLICADO,0.99,99,999
11,BOGOTÁ D.C.,11001,BOGOTÁ,0.81,4.4,262.9
76,VALLE DEL CAUCA,76001,CALI,0.70,n/d,250
,,,FILA SIN CÓDIGO,1,1,1
";

    fn store() -> ReferenceStore {
        ReferenceStore::from_reader(MASTER.as_bytes()).unwrap()
    }

    #[test]
    fn normalizes_codes_and_keeps_first_duplicate() {
        let store = store();
        assert_eq!(store.len(), 4);
        let medellin = store.lookup(&MunicipalityCode::normalize("05001")).unwrap();
        assert_eq!(medellin.name.as_deref(), Some("MEDELLÍN"));
        assert_eq!(medellin.department_code.as_str(), "05");
        assert_eq!(medellin.internet_penetration, IndicatorValue::Present(0.73));
        assert_eq!(medellin.poverty, IndicatorValue::Present(12.4));
        assert_eq!(medellin.test_score, IndicatorValue::Present(245.0));
    }

    #[test]
    fn unparseable_indicators_are_absent() {
        let store = store();
        let abejorral = store.lookup(&MunicipalityCode::normalize("5002")).unwrap();
        assert_eq!(abejorral.missing_indicators(), vec![Indicator::Poverty]);
        let cali = store.lookup(&MunicipalityCode::normalize("76001")).unwrap();
        assert!(cali.poverty.is_absent());
        assert_eq!(cali.test_score, IndicatorValue::Present(250.0));
    }

    #[test]
    fn lists_incomplete_records() {
        let store = store();
        let incomplete: Vec<_> = store
            .incomplete()
            .map(|(r, missing)| (r.code.as_str(), missing))
            .collect();
        assert_eq!(
            incomplete,
            vec![
                ("05002", vec![Indicator::Poverty]),
                ("76001", vec![Indicator::Poverty]),
            ]
        );
    }

    #[test]
    fn lookup_is_total_over_all_codes() {
        let store = store();
        let codes: Vec<_> = store.all_codes().cloned().collect();
        assert_eq!(codes.len(), store.len());
        for code in &codes {
            assert!(store.lookup(code).is_some(), "{code}");
        }
    }

    #[test]
    fn unassigned_code_is_never_found() {
        assert!(store().lookup(&MunicipalityCode::normalize("")).is_none());
    }

    #[test]
    fn accepts_alias_headers_and_missing_optional_columns() {
        let csv = " MpCodigo ;indice;ipm;saber_global\n".replace(';', ",")
            + "5001,0.5,10,200\n";
        let store = ReferenceStore::from_reader(csv.as_bytes()).unwrap();
        let record = store.lookup(&MunicipalityCode::normalize("05001")).unwrap();
        assert_eq!(record.department_code.as_str(), "05");
        assert!(record.name.is_none());
        assert_eq!(store.columns().header(ColumnField::MunicipalityCode), Some("MpCodigo"));
    }

    #[test]
    fn missing_required_column_fails_load() {
        let csv = "COD_MUNICIPIO,INDICE,ipm_depto\n5001,0.5,10\n";
        let err = ReferenceStore::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            GeoError::MissingColumn {
                field: ColumnField::TestScore,
                ..
            }
        ));
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let err = ReferenceStore::load(Path::new("/nonexistent/maestro.csv")).unwrap_err();
        assert!(matches!(err, GeoError::MissingResource { .. }));
    }

    #[test]
    fn lists_departments_and_municipalities_by_name() {
        let store = store();
        let departments = store.departments();
        let names: Vec<_> = departments.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["ANTIOQUIA", "BOGOTÁ D.C.", "VALLE DEL CAUCA"]);
        assert_eq!(departments[1].code.as_str(), "11");

        let antioquia = store.municipalities_in(&DepartmentCode::normalize("05"));
        let names: Vec<_> = antioquia.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["ABEJORRAL", "MEDELLÍN"]);
        assert!(store.municipalities_in(&DepartmentCode::normalize("99")).is_empty());
    }
}
