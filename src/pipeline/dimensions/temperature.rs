//! Temperature dimension cleaner.
//!
//! Collapses the historical per-day readings into one row per U.S. city and
//! calendar month, averaged over all years present in the source.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use tracing::info;

use crate::cast;
use crate::sources::RawTemperatureRecord;

/// Mean temperature and uncertainty for one (city, month) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureAggregate {
    /// Upper-cased for join compatibility with the other dimensions.
    pub city: String,
    pub month: u32,
    pub avg_temperature: Option<f64>,
    pub avg_temperature_uncertainty: Option<f64>,
}

/// Arithmetic mean that skips null readings; null when nothing was summable.
#[derive(Debug, Default)]
struct MeanAcc {
    sum: f64,
    n: u64,
}

impl MeanAcc {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.n += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.n == 0 {
            None
        } else {
            Some(self.sum / self.n as f64)
        }
    }
}

pub fn clean(raw: &[RawTemperatureRecord]) -> Vec<TemperatureAggregate> {
    let mut groups: BTreeMap<(String, u32), (MeanAcc, MeanAcc)> = BTreeMap::new();
    let mut unparsed_dates = 0usize;

    for record in raw {
        if record.country.trim() != "United States" {
            continue;
        }
        // A reading without a parseable date has no month to group under and
        // can never join the fact grain; drop it like any other null key.
        let Ok(date) = NaiveDate::parse_from_str(record.dt.trim(), "%Y-%m-%d") else {
            unparsed_dates += 1;
            continue;
        };

        let key = (cast::to_upper(&record.city), date.month());
        let (temp, uncertainty) = groups.entry(key).or_default();
        temp.push(cast::to_f64(record.average_temperature.as_deref()));
        uncertainty.push(cast::to_f64(
            record.average_temperature_uncertainty.as_deref(),
        ));
    }

    let cleaned: Vec<TemperatureAggregate> = groups
        .into_iter()
        .map(|((city, month), (temp, uncertainty))| TemperatureAggregate {
            city,
            month,
            avg_temperature: temp.mean(),
            avg_temperature_uncertainty: uncertainty.mean(),
        })
        .collect();

    info!(
        input_rows = raw.len(),
        output_rows = cleaned.len(),
        unparsed_dates,
        "cleaned temperature dimension"
    );
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(dt: &str, temp: Option<&str>, city: &str, country: &str) -> RawTemperatureRecord {
        RawTemperatureRecord {
            dt: dt.to_string(),
            average_temperature: temp.map(String::from),
            average_temperature_uncertainty: temp.map(|_| "0.5".to_string()),
            city: city.to_string(),
            country: country.to_string(),
        }
    }

    #[test]
    fn keeps_only_united_states_cities() {
        let raw = vec![
            reading("2012-06-01", Some("20.0"), "Seattle", "United States"),
            reading("2012-06-01", Some("15.0"), "Vancouver", "Canada"),
        ];
        let cleaned = clean(&raw);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].city, "SEATTLE");
    }

    #[test]
    fn averages_across_years_per_city_month() {
        let raw = vec![
            reading("2011-06-01", Some("18.0"), "Seattle", "United States"),
            reading("2012-06-01", Some("22.0"), "Seattle", "United States"),
            reading("2012-07-01", Some("30.0"), "Seattle", "United States"),
        ];
        let cleaned = clean(&raw);
        assert_eq!(cleaned.len(), 2);
        let june = cleaned.iter().find(|t| t.month == 6).unwrap();
        assert_eq!(june.avg_temperature, Some(20.0));
        let july = cleaned.iter().find(|t| t.month == 7).unwrap();
        assert_eq!(july.avg_temperature, Some(30.0));
    }

    #[test]
    fn mean_skips_null_readings_and_stays_null_when_all_null() {
        let raw = vec![
            reading("2011-06-01", None, "Boise", "United States"),
            reading("2012-06-01", None, "Boise", "United States"),
        ];
        let cleaned = clean(&raw);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].avg_temperature, None);
    }

    #[test]
    fn unparseable_dates_are_dropped_not_fatal() {
        let raw = vec![
            reading("not-a-date", Some("20.0"), "Seattle", "United States"),
            reading("2012-06-01", Some("20.0"), "Seattle", "United States"),
        ];
        let cleaned = clean(&raw);
        assert_eq!(cleaned.len(), 1);
    }
}
