//! Immigration cleaner and pre-aggregator.
//!
//! Filters the raw arrival events down to air arrivals carrying an origin
//! code and destination port, applies the tolerant casts, enriches with the
//! static lookups, and pre-aggregates to one row per full dimension key.
//! Sum of `count` per (year, month) stays equal to the number of raw rows
//! passing the air-arrival filter for that period.

use std::collections::{BTreeMap, HashSet};
use tracing::info;

use crate::cast;
use crate::lookup;
use crate::sources::RawImmigrationRecord;

/// Arrival mode code for air arrivals in the raw extract.
const MODE_AIR: i64 = 1;

/// Projected, renamed arrival row; the pre-aggregation distinct unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CleanedArrival {
    year: Option<i64>,
    month: Option<i64>,
    dest_city_code: String,
    dest_state: Option<String>,
    age: Option<i64>,
    visa_type: Option<i64>,
    gender: Option<String>,
    org_country_code: Option<i64>,
    count: Option<i64>,
}

/// Grouping key for the pre-aggregated table. Null dimension values group
/// with themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct ArrivalKey {
    year: Option<i64>,
    month: Option<i64>,
    dest_city_code: String,
    dest_state: Option<String>,
    age: Option<i64>,
    visa_type: Option<i64>,
    gender: Option<String>,
    dest_city_name: Option<String>,
    org_country_name: Option<String>,
}

/// One row of the cleaned, enriched, pre-aggregated immigration table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImmigrationAggregate {
    pub year: Option<i64>,
    pub month: Option<i64>,
    pub dest_city_code: String,
    pub dest_state: Option<String>,
    pub age: Option<i64>,
    pub visa_type: Option<i64>,
    pub gender: Option<String>,
    pub dest_city_name: Option<String>,
    pub org_country_name: Option<String>,
    pub count: i64,
}

pub fn clean_and_aggregate(raw: &[RawImmigrationRecord]) -> Vec<ImmigrationAggregate> {
    let mut distinct: HashSet<CleanedArrival> = HashSet::new();
    let mut air_arrivals = 0usize;

    for record in raw {
        if cast::to_i64(record.i94mode.as_deref()) != Some(MODE_AIR) {
            continue;
        }
        // The filter demands a present code; whether it casts cleanly is a
        // separate, tolerated question.
        if record.i94cit.as_deref().and_then(cast::non_blank).is_none() {
            continue;
        }
        let Some(port) = record.i94port.as_deref().and_then(cast::non_blank) else {
            continue;
        };
        air_arrivals += 1;

        distinct.insert(CleanedArrival {
            year: cast::to_i64(record.i94yr.as_deref()),
            month: cast::to_i64(record.i94mon.as_deref()),
            dest_city_code: port.to_string(),
            dest_state: record
                .i94addr
                .as_deref()
                .and_then(cast::non_blank)
                .map(String::from),
            age: cast::to_i64(record.i94bir.as_deref()),
            visa_type: cast::to_i64(record.i94visa.as_deref()),
            gender: record
                .gender
                .as_deref()
                .and_then(cast::non_blank)
                .map(String::from),
            org_country_code: cast::to_i64(record.i94cit.as_deref()),
            count: cast::to_i64(record.count.as_deref()),
        });
    }

    let mut groups: BTreeMap<ArrivalKey, i64> = BTreeMap::new();
    for arrival in &distinct {
        let key = ArrivalKey {
            year: arrival.year,
            month: arrival.month,
            dest_city_code: arrival.dest_city_code.clone(),
            dest_state: arrival.dest_state.clone(),
            age: arrival.age,
            visa_type: arrival.visa_type,
            gender: arrival.gender.clone(),
            dest_city_name: lookup::resolve_port(&arrival.dest_city_code).map(String::from),
            org_country_name: arrival
                .org_country_code
                .and_then(lookup::resolve_country)
                .map(String::from),
        };
        *groups.entry(key).or_insert(0) += arrival.count.unwrap_or(0);
    }

    let aggregated: Vec<ImmigrationAggregate> = groups
        .into_iter()
        .map(|(key, count)| ImmigrationAggregate {
            year: key.year,
            month: key.month,
            dest_city_code: key.dest_city_code,
            dest_state: key.dest_state,
            age: key.age,
            visa_type: key.visa_type,
            gender: key.gender,
            dest_city_name: key.dest_city_name,
            org_country_name: key.org_country_name,
            count,
        })
        .collect();

    info!(
        input_rows = raw.len(),
        air_arrivals,
        distinct_rows = distinct.len(),
        output_rows = aggregated.len(),
        "cleaned and aggregated immigration records"
    );
    aggregated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrival(port: &str, cit: &str, mode: &str, state: Option<&str>) -> RawImmigrationRecord {
        RawImmigrationRecord {
            cicid: Some("1.0".to_string()),
            i94yr: Some("2016.0".to_string()),
            i94mon: Some("6.0".to_string()),
            i94cit: Some(cit.to_string()),
            i94res: Some(cit.to_string()),
            i94port: Some(port.to_string()),
            arrdate: Some("20612.0".to_string()),
            i94mode: Some(mode.to_string()),
            i94addr: state.map(String::from),
            i94bir: Some("34.0".to_string()),
            i94visa: Some("2.0".to_string()),
            count: Some("1.0".to_string()),
            gender: Some("F".to_string()),
            admnum: Some("667643185.0".to_string()),
        }
    }

    #[test]
    fn keeps_only_air_arrivals_with_present_keys() {
        let land_arrival = arrival("JFK", "582", "3.0", Some("NY"));
        let mut no_port = arrival("JFK", "582", "1.0", Some("NY"));
        no_port.i94port = None;
        let mut no_country = arrival("JFK", "582", "1.0", Some("NY"));
        no_country.i94cit = None;

        let raw = vec![arrival("JFK", "582", "1.0", Some("NY")), land_arrival, no_port, no_country];
        let aggregated = clean_and_aggregate(&raw);
        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].count, 1);
    }

    #[test]
    fn uncastable_country_code_is_kept_with_null_enrichment() {
        // Present but malformed: passes the non-null filter, casts to null.
        let aggregated = clean_and_aggregate(&[arrival("JFK", "bogus", "1.0", Some("NY"))]);
        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].org_country_name, None);
        assert_eq!(aggregated[0].count, 1);
    }

    #[test]
    fn enriches_city_and_country_names() {
        let aggregated = clean_and_aggregate(&[arrival("JFK", "582", "1.0", Some("NY"))]);
        let row = &aggregated[0];
        assert_eq!(row.dest_city_name.as_deref(), Some("NEW YORK"));
        assert_eq!(row.org_country_name.as_deref(), Some("MEXICO"));
        assert_eq!(row.year, Some(2016));
        assert_eq!(row.month, Some(6));
        assert_eq!(row.age, Some(34));
        assert_eq!(row.visa_type, Some(2));
    }

    #[test]
    fn unknown_codes_enrich_to_null_not_error() {
        let aggregated = clean_and_aggregate(&[arrival("ZZZ", "12345", "1.0", Some("NY"))]);
        let row = &aggregated[0];
        assert_eq!(row.dest_city_name, None);
        assert_eq!(row.org_country_name, None);
    }

    #[test]
    fn exact_duplicate_rows_collapse_before_aggregation() {
        let raw = vec![
            arrival("JFK", "582", "1.0", Some("NY")),
            arrival("JFK", "582", "1.0", Some("NY")),
        ];
        let aggregated = clean_and_aggregate(&raw);
        assert_eq!(aggregated.len(), 1);
        // The duplicate collapses in the distinct pass, so it contributes
        // one arrival, not two.
        assert_eq!(aggregated[0].count, 1);
    }

    #[test]
    fn distinct_arrivals_sum_per_dimension_key() {
        let mut male = arrival("JFK", "582", "1.0", Some("NY"));
        male.cicid = Some("2.0".to_string());
        male.gender = Some("M".to_string());
        let mut second_female = arrival("JFK", "582", "1.0", Some("NY"));
        second_female.i94bir = Some("52.0".to_string());

        let raw = vec![arrival("JFK", "582", "1.0", Some("NY")), male, second_female];
        let aggregated = clean_and_aggregate(&raw);
        assert_eq!(aggregated.len(), 3);
        let total: i64 = aggregated.iter().map(|a| a.count).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn null_dimension_values_group_together() {
        let mut a = arrival("JFK", "582", "1.0", None);
        a.gender = None;
        a.i94bir = Some("29.0".to_string());
        let mut b = arrival("JFK", "582", "1.0", None);
        b.gender = None;
        b.i94bir = Some("29.0".to_string());
        b.cicid = Some("99.0".to_string());

        // Same dimension key with null state and gender; cicid is projected
        // away so the rows differ only before projection.
        let aggregated = clean_and_aggregate(&[a, b]);
        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].count, 1);
    }
}
