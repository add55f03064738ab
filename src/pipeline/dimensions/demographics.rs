//! Demographics dimension cleaner.
//!
//! Casts the population figures and derives the percentage fields. A zero or
//! missing total population leaves the percentages null; the condition is a
//! data-quality fact to surface downstream, never a reason to abort.

use std::collections::HashSet;
use tracing::info;

use crate::cast;
use crate::sources::RawDemographicsRecord;

/// Cleaned demographics for one (city, state) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DemographicsRecord {
    pub city: String,
    pub state: String,
    pub median_age: Option<f64>,
    pub population: Option<i64>,
    pub pct_male_population: Option<f64>,
    pub pct_female_population: Option<f64>,
    pub pct_foreign_born: Option<f64>,
}

fn pct(part: Option<i64>, total: Option<i64>) -> Option<f64> {
    let total = total?;
    if total == 0 {
        return None;
    }
    let part = part?;
    Some(part as f64 / total as f64 * 100.0)
}

pub fn clean(raw: &[RawDemographicsRecord]) -> Vec<DemographicsRecord> {
    // The raw extract repeats each city once per race breakdown row; those
    // rows are identical once projected to this field set.
    let mut seen_raw: HashSet<&RawDemographicsRecord> = HashSet::new();
    let mut cleaned: Vec<DemographicsRecord> = Vec::new();

    for record in raw {
        if !seen_raw.insert(record) {
            continue;
        }

        let population = cast::to_i64(record.total_population.as_deref());
        let row = DemographicsRecord {
            city: cast::to_upper(&record.city),
            state: record.state_code.trim().to_string(),
            median_age: cast::to_f64(record.median_age.as_deref()),
            population,
            pct_male_population: pct(cast::to_i64(record.male_population.as_deref()), population),
            pct_female_population: pct(
                cast::to_i64(record.female_population.as_deref()),
                population,
            ),
            pct_foreign_born: pct(cast::to_i64(record.foreign_born.as_deref()), population),
        };
        if !cleaned.contains(&row) {
            cleaned.push(row);
        }
    }

    info!(
        input_rows = raw.len(),
        output_rows = cleaned.len(),
        "cleaned demographics dimension"
    );
    cleaned
}
