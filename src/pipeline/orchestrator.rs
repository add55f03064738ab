//! End-to-end pipeline orchestration.
//!
//! The four cleaning stages are mutually independent and run on blocking
//! workers; the fact build waits on all of them. Everything up to the final
//! write is side-effect-free, so a failed run can simply be re-executed
//! from the raw inputs.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::pipeline::dimensions::airports::{self, AirportRecord};
use crate::pipeline::dimensions::demographics::{self, DemographicsRecord};
use crate::pipeline::dimensions::temperature::{self, TemperatureAggregate};
use crate::pipeline::fact;
use crate::pipeline::immigration::{self, ImmigrationAggregate};
use crate::pipeline::parquet_out::{self, DimensionTables};
use crate::pipeline::quality_gate::{self, QualityReport};
use crate::sources;

/// Outcome of one pipeline invocation.
#[derive(Debug)]
pub struct RunSummary {
    pub fact_rows: usize,
    pub report: QualityReport,
    pub published: bool,
    pub output_path: Option<PathBuf>,
    pub partition_files: usize,
}

/// Run the full pipeline. With `publish` unset the run stops after the
/// quality gate (the `check` subcommand).
pub async fn run(config: &PipelineConfig, publish: bool) -> Result<RunSummary> {
    config.validate()?;
    info!(
        year = config.immigration.year,
        months = ?config.immigration.months,
        "starting pipeline run"
    );

    let demographics_path = config.sources.demographics.clone();
    let demographics_task = tokio::task::spawn_blocking(
        move || -> crate::error::Result<Vec<DemographicsRecord>> {
            let raw = sources::demographics::read(&demographics_path)?;
            Ok(demographics::clean(&raw))
        },
    );

    let airports_path = config.sources.airports.clone();
    let airports_task =
        tokio::task::spawn_blocking(move || -> crate::error::Result<Vec<AirportRecord>> {
            let raw = sources::airports::read(&airports_path)?;
            Ok(airports::clean(&raw))
        });

    let temperature_path = config.sources.temperature.clone();
    let temperature_task =
        tokio::task::spawn_blocking(move || -> crate::error::Result<Vec<TemperatureAggregate>> {
            let raw = sources::temperature::read(&temperature_path)?;
            Ok(temperature::clean(&raw))
        });

    let immigration_dir = config.sources.immigration_dir.clone();
    let year = config.immigration.year;
    let months = config.immigration.months.clone();
    let immigration_task =
        tokio::task::spawn_blocking(move || -> crate::error::Result<Vec<ImmigrationAggregate>> {
            let raw = sources::immigration::read_months(&immigration_dir, year, &months)?;
            Ok(immigration::clean_and_aggregate(&raw))
        });

    let (demographics_rows, airport_records, temperature_rows, immigration_rows) = tokio::try_join!(
        demographics_task,
        airports_task,
        temperature_task,
        immigration_task
    )
    .context("cleaning stage worker panicked")?;
    let demographics_rows = demographics_rows?;
    let airport_records = airport_records?;
    let temperature_rows = temperature_rows?;
    let immigration_rows = immigration_rows?;

    let airport_counts = airports::aggregate(&airport_records);
    let fact_rows = fact::build_fact(
        &immigration_rows,
        &temperature_rows,
        &airport_counts,
        &demographics_rows,
    );

    let report = quality_gate::validate(&fact_rows, &immigration_rows);

    if !publish {
        return Ok(RunSummary {
            fact_rows: fact_rows.len(),
            report,
            published: false,
            output_path: None,
            partition_files: 0,
        });
    }

    write_report(&report, &config.output.path)?;

    if !report.passed() {
        warn!("quality gate withheld publication; output left untouched");
        return Ok(RunSummary {
            fact_rows: fact_rows.len(),
            report,
            published: false,
            output_path: None,
            partition_files: 0,
        });
    }

    let dimensions = DimensionTables {
        temperature: &temperature_rows,
        airports: &airport_counts,
        demographics: &demographics_rows,
        immigration: &immigration_rows,
    };
    let tables = config.output.write_dimensions.then_some(&dimensions);
    let files = parquet_out::publish(&fact_rows, tables, &config.output.path)?;

    Ok(RunSummary {
        fact_rows: fact_rows.len(),
        report,
        published: true,
        output_path: Some(config.output.path.clone()),
        partition_files: files.len(),
    })
}

/// Persist the quality diagnostics next to the output location so a failed
/// run leaves an inspectable trail.
fn write_report(report: &QualityReport, out_path: &Path) -> crate::error::Result<()> {
    let parent = out_path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let report_path = parent.join("quality_report.json");
    fs::write(&report_path, serde_json::to_vec_pretty(report)?)?;
    info!(path = %report_path.display(), "wrote quality report");
    Ok(())
}
