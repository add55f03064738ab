//! Pipeline configuration: raw source locations, the monthly immigration
//! subset to process, and the output location.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EtlError, Result};

/// The twelve month tokens used in immigration extract file names.
pub const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub sources: SourcesConfig,
    #[serde(default)]
    pub immigration: ImmigrationConfig,
    pub output: OutputConfig,
}

/// Locations of the four raw inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub demographics: PathBuf,
    pub airports: PathBuf,
    pub temperature: PathBuf,
    /// Directory holding the per-month immigration extracts.
    pub immigration_dir: PathBuf,
}

/// Which monthly immigration extracts to include in the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImmigrationConfig {
    #[serde(default = "default_year")]
    pub year: i32,
    /// Named month subset; defaults to all twelve months of `year`.
    #[serde(default = "all_months")]
    pub months: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root of the published fact table. Overwritten wholesale on each run.
    pub path: PathBuf,
    /// Also persist the cleaned dimension tables next to the fact table.
    #[serde(default)]
    pub write_dimensions: bool,
}

fn default_year() -> i32 {
    2016
}

fn all_months() -> Vec<String> {
    MONTHS.iter().map(|m| (*m).to_string()).collect()
}

impl Default for ImmigrationConfig {
    fn default() -> Self {
        Self {
            year: default_year(),
            months: all_months(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            EtlError::Config(format!("cannot parse config file {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the configured month subset, e.g. from a CLI override.
    pub fn with_months(mut self, months: Vec<String>) -> Result<Self> {
        self.immigration.months = months;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.immigration.months.is_empty() {
            return Err(EtlError::Config(
                "immigration month subset must not be empty".to_string(),
            ));
        }
        for month in &self.immigration.months {
            if !MONTHS.contains(&month.as_str()) {
                return Err(EtlError::Config(format!(
                    "unknown immigration month '{}' (expected one of {:?})",
                    month, MONTHS
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
        [sources]
        demographics = "data/us-cities-demographics.csv"
        airports = "data/airport-codes.csv"
        temperature = "data/temperatures.csv"
        immigration_dir = "data/i94"

        [immigration]
        year = 2016
        months = ["apr", "may", "jun"]

        [output]
        path = "output/fact_arrivals"
        write_dimensions = true
    "#;

    #[test]
    fn parses_full_config() {
        let config: PipelineConfig = toml::from_str(EXAMPLE).unwrap();
        assert_eq!(config.immigration.year, 2016);
        assert_eq!(config.immigration.months, vec!["apr", "may", "jun"]);
        assert!(config.output.write_dimensions);
        config.validate().unwrap();
    }

    #[test]
    fn months_default_to_full_year() {
        let minimal = r#"
            [sources]
            demographics = "a.csv"
            airports = "b.csv"
            temperature = "c.csv"
            immigration_dir = "i94"

            [output]
            path = "out"
        "#;
        let config: PipelineConfig = toml::from_str(minimal).unwrap();
        assert_eq!(config.immigration.months.len(), 12);
        assert!(!config.output.write_dimensions);
    }

    #[test]
    fn rejects_unknown_month() {
        let config: PipelineConfig = toml::from_str(EXAMPLE).unwrap();
        let result = config.with_months(vec!["smarch".to_string()]);
        assert!(result.is_err());
    }
}
