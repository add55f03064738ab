//! Columnar output for the fact table and the cleaned dimensions.
//!
//! The fact relation is written as ZSTD-compressed parquet partitioned by
//! (dest_city, dest_state), hive style. Publication is atomic: everything
//! lands in a staging directory that is renamed over the output path, so a
//! reader never observes a half-written table.

use chrono::Utc;
use parquet::basic::{Compression, ZstdLevel};
use parquet::data_type::{ByteArray, ByteArrayType, DoubleType, Int64Type};
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::error::{EtlError, Result};
use crate::pipeline::dimensions::airports::AirportAggregate;
use crate::pipeline::dimensions::demographics::DemographicsRecord;
use crate::pipeline::dimensions::temperature::TemperatureAggregate;
use crate::pipeline::fact::FactRow;
use crate::pipeline::immigration::ImmigrationAggregate;

/// One column of values in schema order. Every column is written as
/// optional with definition levels, matching the nullable output of the
/// upstream set transformations.
pub enum ColumnValues {
    Int64(Vec<Option<i64>>),
    Double(Vec<Option<f64>>),
    Utf8(Vec<Option<String>>),
}

/// Partition columns are encoded in the directory path, not the file.
const FACT_FILE_SCHEMA: &str = "
    message fact_arrivals {
        optional int64 year;
        optional int64 month;
        optional binary org_country (UTF8);
        optional double avg_temp;
        optional int64 num_airports;
        optional int64 population;
        optional double pct_foreign_born;
        optional int64 imigration_count;
    }
";

const TEMPERATURE_SCHEMA: &str = "
    message dim_temperature {
        optional binary city (UTF8);
        optional int64 month;
        optional double avg_temperature;
        optional double avg_temperature_uncertainty;
    }
";

const AIRPORTS_SCHEMA: &str = "
    message dim_airports {
        optional binary city (UTF8);
        optional binary state (UTF8);
        optional int64 num_airports;
    }
";

const DEMOGRAPHICS_SCHEMA: &str = "
    message dim_demographics {
        optional binary city (UTF8);
        optional binary state (UTF8);
        optional double median_age;
        optional int64 population;
        optional double pct_male_population;
        optional double pct_female_population;
        optional double pct_foreign_born;
    }
";

const IMMIGRATION_SCHEMA: &str = "
    message dim_immigration {
        optional int64 year;
        optional int64 month;
        optional binary dest_city_code (UTF8);
        optional binary dest_state (UTF8);
        optional int64 age;
        optional int64 visa_type;
        optional binary gender (UTF8);
        optional binary dest_city_name (UTF8);
        optional binary org_country_name (UTF8);
        optional int64 count;
    }
";

/// The cleaned dimension tables, published alongside the fact table when
/// `output.write_dimensions` is set.
pub struct DimensionTables<'a> {
    pub temperature: &'a [TemperatureAggregate],
    pub airports: &'a [AirportAggregate],
    pub demographics: &'a [DemographicsRecord],
    pub immigration: &'a [ImmigrationAggregate],
}

/// Write one parquet file from columns in schema order.
fn write_table(path: &Path, message_type: &str, columns: &[ColumnValues]) -> Result<()> {
    let schema = Arc::new(parse_message_type(message_type)?);
    let props = Arc::new(
        WriterProperties::builder()
            .set_compression(Compression::ZSTD(ZstdLevel::default()))
            .build(),
    );

    let file = File::create(path)?;
    let mut writer = SerializedFileWriter::new(file, schema, props)?;
    let mut row_group = writer.next_row_group()?;

    let mut index = 0usize;
    while let Some(mut column_writer) = row_group.next_column()? {
        let Some(values) = columns.get(index) else {
            return Err(EtlError::Parquet(ParquetError::General(
                "schema declares more columns than were provided".to_string(),
            )));
        };
        match values {
            ColumnValues::Int64(values) => {
                let defs: Vec<i16> = values.iter().map(|v| i16::from(v.is_some())).collect();
                let data: Vec<i64> = values.iter().filter_map(|v| *v).collect();
                column_writer
                    .typed::<Int64Type>()
                    .write_batch(&data, Some(&defs), None)?;
            }
            ColumnValues::Double(values) => {
                let defs: Vec<i16> = values.iter().map(|v| i16::from(v.is_some())).collect();
                let data: Vec<f64> = values.iter().filter_map(|v| *v).collect();
                column_writer
                    .typed::<DoubleType>()
                    .write_batch(&data, Some(&defs), None)?;
            }
            ColumnValues::Utf8(values) => {
                let defs: Vec<i16> = values.iter().map(|v| i16::from(v.is_some())).collect();
                let data: Vec<ByteArray> = values
                    .iter()
                    .flatten()
                    .map(|s| ByteArray::from(s.as_str()))
                    .collect();
                column_writer
                    .typed::<ByteArrayType>()
                    .write_batch(&data, Some(&defs), None)?;
            }
        }
        column_writer.close()?;
        index += 1;
    }

    row_group.close()?;
    writer.close()?;
    Ok(())
}

fn fact_file_columns(rows: &[&FactRow]) -> Vec<ColumnValues> {
    vec![
        ColumnValues::Int64(rows.iter().map(|r| r.year).collect()),
        ColumnValues::Int64(rows.iter().map(|r| Some(r.month)).collect()),
        ColumnValues::Utf8(rows.iter().map(|r| r.org_country.clone()).collect()),
        ColumnValues::Double(rows.iter().map(|r| r.avg_temp).collect()),
        ColumnValues::Int64(rows.iter().map(|r| Some(r.num_airports)).collect()),
        ColumnValues::Int64(rows.iter().map(|r| r.population).collect()),
        ColumnValues::Double(rows.iter().map(|r| r.pct_foreign_born).collect()),
        ColumnValues::Int64(rows.iter().map(|r| Some(r.imigration_count)).collect()),
    ]
}

/// Write the fact rows as hive-partitioned files under `root`.
fn write_partitioned_fact(fact: &[FactRow], root: &Path) -> Result<Vec<PathBuf>> {
    let mut partitions: BTreeMap<(&str, &str), Vec<&FactRow>> = BTreeMap::new();
    for row in fact {
        partitions
            .entry((row.dest_city.as_str(), row.dest_state.as_str()))
            .or_default()
            .push(row);
    }

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let mut written = Vec::new();
    for ((city, state), rows) in partitions {
        let partition_dir = root
            .join(format!("dest_city={}", city))
            .join(format!("dest_state={}", state));
        fs::create_dir_all(&partition_dir)?;
        let file_path = partition_dir.join(format!("part-{}.parquet", timestamp));
        write_table(&file_path, FACT_FILE_SCHEMA, &fact_file_columns(&rows))?;
        written.push(file_path);
    }
    Ok(written)
}

fn write_dimensions(tables: &DimensionTables<'_>, root: &Path) -> Result<()> {
    fs::create_dir_all(root)?;

    let t = tables.temperature;
    write_table(
        &root.join("temperature.parquet"),
        TEMPERATURE_SCHEMA,
        &[
            ColumnValues::Utf8(t.iter().map(|r| Some(r.city.clone())).collect()),
            ColumnValues::Int64(t.iter().map(|r| Some(i64::from(r.month))).collect()),
            ColumnValues::Double(t.iter().map(|r| r.avg_temperature).collect()),
            ColumnValues::Double(t.iter().map(|r| r.avg_temperature_uncertainty).collect()),
        ],
    )?;

    let a = tables.airports;
    write_table(
        &root.join("airports.parquet"),
        AIRPORTS_SCHEMA,
        &[
            ColumnValues::Utf8(a.iter().map(|r| Some(r.city.clone())).collect()),
            ColumnValues::Utf8(a.iter().map(|r| Some(r.state.clone())).collect()),
            ColumnValues::Int64(a.iter().map(|r| Some(r.num_airports)).collect()),
        ],
    )?;

    let d = tables.demographics;
    write_table(
        &root.join("demographics.parquet"),
        DEMOGRAPHICS_SCHEMA,
        &[
            ColumnValues::Utf8(d.iter().map(|r| Some(r.city.clone())).collect()),
            ColumnValues::Utf8(d.iter().map(|r| Some(r.state.clone())).collect()),
            ColumnValues::Double(d.iter().map(|r| r.median_age).collect()),
            ColumnValues::Int64(d.iter().map(|r| r.population).collect()),
            ColumnValues::Double(d.iter().map(|r| r.pct_male_population).collect()),
            ColumnValues::Double(d.iter().map(|r| r.pct_female_population).collect()),
            ColumnValues::Double(d.iter().map(|r| r.pct_foreign_born).collect()),
        ],
    )?;

    let i = tables.immigration;
    write_table(
        &root.join("immigration.parquet"),
        IMMIGRATION_SCHEMA,
        &[
            ColumnValues::Int64(i.iter().map(|r| r.year).collect()),
            ColumnValues::Int64(i.iter().map(|r| r.month).collect()),
            ColumnValues::Utf8(i.iter().map(|r| Some(r.dest_city_code.clone())).collect()),
            ColumnValues::Utf8(i.iter().map(|r| r.dest_state.clone()).collect()),
            ColumnValues::Int64(i.iter().map(|r| r.age).collect()),
            ColumnValues::Int64(i.iter().map(|r| r.visa_type).collect()),
            ColumnValues::Utf8(i.iter().map(|r| r.gender.clone()).collect()),
            ColumnValues::Utf8(i.iter().map(|r| r.dest_city_name.clone()).collect()),
            ColumnValues::Utf8(i.iter().map(|r| r.org_country_name.clone()).collect()),
            ColumnValues::Int64(i.iter().map(|r| Some(r.count)).collect()),
        ],
    )?;

    Ok(())
}

/// Publish the fact table (and optionally the dimensions) at `out_path`,
/// replacing any previous run's output in one rename.
pub fn publish(
    fact: &[FactRow],
    dimensions: Option<&DimensionTables<'_>>,
    out_path: &Path,
) -> Result<Vec<PathBuf>> {
    let parent = out_path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let dir_name = out_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| EtlError::Config(format!("invalid output path {}", out_path.display())))?;
    let staging = parent.join(format!(".{}.staging", dir_name));
    if staging.exists() {
        // Leftover from an interrupted run; safe to discard.
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    let staged_files = write_partitioned_fact(fact, &staging)?;
    if let Some(tables) = dimensions {
        write_dimensions(tables, &staging.join("_dimensions"))?;
    }

    if out_path.exists() {
        fs::remove_dir_all(out_path)?;
    }
    fs::rename(&staging, out_path)?;

    let published: Vec<PathBuf> = staged_files
        .iter()
        .filter_map(|p| p.strip_prefix(&staging).ok())
        .map(|rel| out_path.join(rel))
        .collect();

    info!(
        partitions = published.len(),
        path = %out_path.display(),
        "published fact table"
    );
    Ok(published)
}
