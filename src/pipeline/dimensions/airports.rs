//! Airport dimension cleaner.
//!
//! Keeps U.S. civil airports, derives the state from the ISO region, and
//! counts distinct airports per (city, state) for the fact join.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::info;

use crate::cast;
use crate::sources::RawAirportRecord;

/// Airport types that count toward the per-city airport total.
const COUNTED_KINDS: [&str; 3] = ["small_airport", "medium_airport", "large_airport"];

/// One cleaned, projected airport row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AirportRecord {
    pub airport_id: String,
    pub city: String,
    pub state: String,
    pub name: String,
    pub kind: String,
    pub elevation_ft: Option<i64>,
}

/// Distinct-airport count for one (city, state) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirportAggregate {
    pub city: String,
    pub state: String,
    pub num_airports: i64,
}

pub fn clean(raw: &[RawAirportRecord]) -> Vec<AirportRecord> {
    let mut seen_raw: HashSet<&RawAirportRecord> = HashSet::new();
    // Distinct rows may collapse again once projected down to the canonical
    // field set, so the projected rows get their own dedup pass.
    let mut projected: BTreeSet<AirportRecord> = BTreeSet::new();

    for record in raw {
        if record.iso_country.as_deref().map(str::trim) != Some("US") {
            continue;
        }
        if !COUNTED_KINDS.contains(&record.kind.as_str()) {
            continue;
        }
        if !seen_raw.insert(record) {
            continue;
        }

        // A row without a municipality or a parseable region has no join key
        // and would never reach the fact table.
        let Some(city) = record.municipality.as_deref().and_then(cast::non_blank) else {
            continue;
        };
        let Some(state) = record
            .iso_region
            .as_deref()
            .and_then(|region| region.split('-').nth(1))
            .and_then(cast::non_blank)
        else {
            continue;
        };

        projected.insert(AirportRecord {
            airport_id: record.ident.clone(),
            city: cast::to_upper(city),
            state: state.to_string(),
            name: record.name.clone(),
            kind: record.kind.clone(),
            elevation_ft: cast::to_i64(record.elevation_ft.as_deref()),
        });
    }

    let cleaned: Vec<AirportRecord> = projected.into_iter().collect();
    info!(
        input_rows = raw.len(),
        output_rows = cleaned.len(),
        "cleaned airport dimension"
    );
    cleaned
}

/// Pre-aggregate the cleaned rows to the fact join grain.
pub fn aggregate(records: &[AirportRecord]) -> Vec<AirportAggregate> {
    let mut groups: BTreeMap<(&str, &str), BTreeSet<&str>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.city.as_str(), record.state.as_str()))
            .or_default()
            .insert(record.airport_id.as_str());
    }

    groups
        .into_iter()
        .map(|((city, state), ids)| AirportAggregate {
            city: city.to_string(),
            state: state.to_string(),
            num_airports: ids.len() as i64,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airport(ident: &str, kind: &str, region: &str, municipality: &str) -> RawAirportRecord {
        RawAirportRecord {
            ident: ident.to_string(),
            kind: kind.to_string(),
            name: format!("{} field", ident),
            elevation_ft: Some("433.0".to_string()),
            iso_country: Some("US".to_string()),
            iso_region: Some(region.to_string()),
            municipality: Some(municipality.to_string()),
        }
    }

    #[test]
    fn filters_country_and_type() {
        let mut foreign = airport("CYVR", "large_airport", "CA-BC", "Vancouver");
        foreign.iso_country = Some("CA".to_string());

        let raw = vec![
            airport("KSEA", "large_airport", "US-WA", "Seattle"),
            airport("WA01", "heliport", "US-WA", "Seattle"),
            foreign,
        ];
        let cleaned = clean(&raw);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].airport_id, "KSEA");
        assert_eq!(cleaned[0].city, "SEATTLE");
        assert_eq!(cleaned[0].state, "WA");
        assert_eq!(cleaned[0].elevation_ft, Some(433));
    }

    #[test]
    fn byte_identical_rows_collapse_to_one() {
        let raw = vec![
            airport("KBFI", "medium_airport", "US-WA", "Seattle"),
            airport("KBFI", "medium_airport", "US-WA", "Seattle"),
        ];
        let cleaned = clean(&raw);
        assert_eq!(cleaned.len(), 1);

        let agg = aggregate(&cleaned);
        assert_eq!(agg.len(), 1);
        assert_eq!(agg[0].num_airports, 1);
    }

    #[test]
    fn counts_distinct_airports_per_city_state() {
        let raw = vec![
            airport("KSEA", "large_airport", "US-WA", "Seattle"),
            airport("KBFI", "medium_airport", "US-WA", "Seattle"),
            airport("KPDX", "large_airport", "US-OR", "Portland"),
        ];
        let agg = aggregate(&clean(&raw));
        assert_eq!(agg.len(), 2);
        let seattle = agg.iter().find(|a| a.city == "SEATTLE").unwrap();
        assert_eq!(seattle.num_airports, 2);
    }

    #[test]
    fn malformed_elevation_becomes_null() {
        let mut record = airport("KSEA", "large_airport", "US-WA", "Seattle");
        record.elevation_ft = Some("unknown".to_string());
        let cleaned = clean(&[record]);
        assert_eq!(cleaned[0].elevation_ft, None);
    }
}
