use serde::Deserialize;
use std::path::Path;

use crate::error::Result;

/// One row of the historical city temperature readings.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTemperatureRecord {
    /// ISO date of the reading.
    #[serde(rename = "dt")]
    pub dt: String,
    #[serde(rename = "AverageTemperature")]
    pub average_temperature: Option<String>,
    #[serde(rename = "AverageTemperatureUncertainty")]
    pub average_temperature_uncertainty: Option<String>,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Country")]
    pub country: String,
}

pub fn read(path: &Path) -> Result<Vec<RawTemperatureRecord>> {
    super::read_records("temperature", path, b',')
}
