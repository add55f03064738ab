use serde::Deserialize;
use std::path::Path;

use crate::error::Result;

/// One row of the semicolon-delimited city demographics extract.
///
/// Numeric fields stay as raw text here; the cleaner applies the tolerant
/// casts. Columns not listed (race breakdown, household size, veterans) are
/// dropped at the reader boundary.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Hash)]
pub struct RawDemographicsRecord {
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "State Code")]
    pub state_code: String,
    #[serde(rename = "Median Age")]
    pub median_age: Option<String>,
    #[serde(rename = "Male Population")]
    pub male_population: Option<String>,
    #[serde(rename = "Female Population")]
    pub female_population: Option<String>,
    #[serde(rename = "Total Population")]
    pub total_population: Option<String>,
    #[serde(rename = "Foreign-born")]
    pub foreign_born: Option<String>,
}

pub fn read(path: &Path) -> Result<Vec<RawDemographicsRecord>> {
    super::read_records("demographics", path, b';')
}
