use serde::Deserialize;
use std::path::Path;

use crate::error::Result;

/// One row of the airport directory extract.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Hash)]
pub struct RawAirportRecord {
    pub ident: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub elevation_ft: Option<String>,
    pub iso_country: Option<String>,
    pub iso_region: Option<String>,
    pub municipality: Option<String>,
}

pub fn read(path: &Path) -> Result<Vec<RawAirportRecord>> {
    super::read_records("airports", path, b',')
}
