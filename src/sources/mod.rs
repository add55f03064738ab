//! Readers for the four raw inputs.
//!
//! Each reader is row-tolerant (a malformed row is logged and skipped) but
//! file-fatal: a missing or unreadable source aborts the run immediately
//! with the offending source named, since the pipeline cannot proceed
//! without its inputs.

use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{EtlError, Result};

pub mod airports;
pub mod demographics;
pub mod immigration;
pub mod temperature;

pub use airports::RawAirportRecord;
pub use demographics::RawDemographicsRecord;
pub use immigration::RawImmigrationRecord;
pub use temperature::RawTemperatureRecord;

/// Read every decodable row of a delimited file with a header row.
fn read_records<T: DeserializeOwned>(
    name: &'static str,
    path: &Path,
    delimiter: u8,
) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|source| EtlError::Source {
            name,
            path: path.to_path_buf(),
            source,
        })?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for row in reader.deserialize::<T>() {
        match row {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                warn!(source = name, error = %e, "skipping undecodable row");
            }
        }
    }

    info!(
        source = name,
        path = %path.display(),
        rows = records.len(),
        skipped,
        "read raw source"
    );
    Ok(records)
}
