//! Fact builder: joins the cleaned dimensions and re-aggregates to the
//! final fact grain.
//!
//! All joins are inner joins. An arrival whose city or month has no
//! temperature, airport, or demographic context carries nothing worth
//! reporting and is dropped; the quality gate accounts for the drops.

use std::collections::HashMap;
use tracing::info;

use crate::pipeline::dimensions::airports::AirportAggregate;
use crate::pipeline::dimensions::demographics::DemographicsRecord;
use crate::pipeline::dimensions::temperature::TemperatureAggregate;
use crate::pipeline::immigration::ImmigrationAggregate;

/// One row of the denormalized fact table at its final grain.
#[derive(Debug, Clone, PartialEq)]
pub struct FactRow {
    pub year: Option<i64>,
    pub month: i64,
    pub dest_city: String,
    pub dest_state: String,
    pub org_country: Option<String>,
    pub avg_temp: Option<f64>,
    pub num_airports: i64,
    pub population: Option<i64>,
    pub pct_foreign_born: Option<f64>,
    pub imigration_count: i64,
}

/// Column names of the fact relation, in output order.
pub const FACT_COLUMNS: [&str; 10] = [
    "year",
    "month",
    "dest_city",
    "dest_state",
    "org_country",
    "avg_temp",
    "num_airports",
    "population",
    "pct_foreign_born",
    "imigration_count",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FactKey {
    year: Option<i64>,
    month: i64,
    dest_city: String,
    dest_state: String,
    org_country: Option<String>,
}

struct FactAcc {
    avg_temp: Option<f64>,
    num_airports: i64,
    population: Option<i64>,
    pct_foreign_born: Option<f64>,
    imigration_count: i64,
}

pub fn build_fact(
    immigration: &[ImmigrationAggregate],
    temperature: &[TemperatureAggregate],
    airports: &[AirportAggregate],
    demographics: &[DemographicsRecord],
) -> Vec<FactRow> {
    // Index each dimension by its join key. Keys are unique per cleaned
    // table; first row wins if an upstream cleaner ever regresses on that.
    let mut temperature_by_key: HashMap<(&str, i64), &TemperatureAggregate> = HashMap::new();
    for t in temperature {
        temperature_by_key
            .entry((t.city.as_str(), i64::from(t.month)))
            .or_insert(t);
    }
    let mut airports_by_key: HashMap<(&str, &str), i64> = HashMap::new();
    for a in airports {
        airports_by_key
            .entry((a.city.as_str(), a.state.as_str()))
            .or_insert(a.num_airports);
    }
    let mut demographics_by_key: HashMap<(&str, &str), &DemographicsRecord> = HashMap::new();
    for d in demographics {
        demographics_by_key
            .entry((d.city.as_str(), d.state.as_str()))
            .or_insert(d);
    }

    // Join and re-aggregate in one pass. The age/visa/gender dimensions of
    // the immigration aggregate are dropped here, so several input rows
    // fold into each fact row.
    let mut groups: HashMap<FactKey, FactAcc> = HashMap::new();
    let mut dropped = 0usize;

    for arrival in immigration {
        let (Some(city), Some(state), Some(month)) = (
            arrival.dest_city_name.as_deref(),
            arrival.dest_state.as_deref(),
            arrival.month,
        ) else {
            dropped += 1;
            continue;
        };
        let Some(temp) = temperature_by_key.get(&(city, month)) else {
            dropped += 1;
            continue;
        };
        let Some(num_airports) = airports_by_key.get(&(city, state)).copied() else {
            dropped += 1;
            continue;
        };
        let Some(demo) = demographics_by_key.get(&(city, state)) else {
            dropped += 1;
            continue;
        };

        let key = FactKey {
            year: arrival.year,
            month,
            dest_city: city.to_string(),
            dest_state: state.to_string(),
            org_country: arrival.org_country_name.clone(),
        };
        let acc = groups.entry(key).or_insert_with(|| FactAcc {
            avg_temp: temp.avg_temperature,
            num_airports,
            population: demo.population,
            pct_foreign_born: demo.pct_foreign_born,
            imigration_count: 0,
        });
        acc.imigration_count += arrival.count;
    }

    let mut fact: Vec<FactRow> = groups
        .into_iter()
        .map(|(key, acc)| FactRow {
            year: key.year,
            month: key.month,
            dest_city: key.dest_city,
            dest_state: key.dest_state,
            org_country: key.org_country,
            avg_temp: acc.avg_temp,
            num_airports: acc.num_airports,
            population: acc.population,
            pct_foreign_born: acc.pct_foreign_born,
            imigration_count: acc.imigration_count,
        })
        .collect();

    // Display ordering; persisted storage does not depend on it.
    fact.sort_by(|a, b| {
        (a.dest_city.as_str(), a.org_country.as_deref())
            .cmp(&(b.dest_city.as_str(), b.org_country.as_deref()))
    });

    info!(
        immigration_rows = immigration.len(),
        fact_rows = fact.len(),
        dropped_rows = dropped,
        "built fact table"
    );
    fact
}
