use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::error::Result;

/// One raw international arrival event from a monthly I94 extract.
///
/// The upstream archive decode renders every column as text; numeric fields
/// arrive as SAS float strings ("2016.0"). Columns beyond this set are
/// dropped before processing.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawImmigrationRecord {
    pub cicid: Option<String>,
    pub i94yr: Option<String>,
    pub i94mon: Option<String>,
    pub i94cit: Option<String>,
    pub i94res: Option<String>,
    pub i94port: Option<String>,
    pub arrdate: Option<String>,
    pub i94mode: Option<String>,
    pub i94addr: Option<String>,
    pub i94bir: Option<String>,
    pub i94visa: Option<String>,
    pub count: Option<String>,
    pub gender: Option<String>,
    pub admnum: Option<String>,
}

/// File name of one monthly extract, e.g. `i94_jun16_sub.csv`.
pub fn month_file_name(year: i32, month: &str) -> String {
    format!("i94_{}{:02}_sub.csv", month, year.rem_euclid(100))
}

/// Read the configured subset of monthly extracts from `dir`.
///
/// Every named month must be present; a missing file is fatal because a
/// partial year would silently understate arrival counts.
pub fn read_months(dir: &Path, year: i32, months: &[String]) -> Result<Vec<RawImmigrationRecord>> {
    let mut records = Vec::new();
    for month in months {
        let path = dir.join(month_file_name(year, month));
        let month_records: Vec<RawImmigrationRecord> =
            super::read_records("immigration", &path, b',')?;
        info!(month = %month, rows = month_records.len(), "read immigration extract");
        records.extend(month_records);
    }
    Ok(records)
}
