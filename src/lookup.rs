//! Static code-to-name reference data for enriching arrival records.
//!
//! The port and country tables ship with the pipeline and are parsed once on
//! first use. Unknown codes resolve to `None`; the caller propagates the
//! missing value instead of failing the run.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static PORT_CITIES: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| parse_pairs(include_str!("../data/i94_ports.csv")).collect());

static COUNTRY_NAMES: Lazy<HashMap<i64, &'static str>> = Lazy::new(|| {
    parse_pairs(include_str!("../data/i94_countries.csv"))
        .filter_map(|(code, name)| Some((code.parse::<i64>().ok()?, name)))
        .collect()
});

fn parse_pairs(data: &'static str) -> impl Iterator<Item = (&'static str, &'static str)> {
    data.lines()
        .skip(1)
        .filter_map(|line| line.split_once(','))
        .map(|(code, name)| (code.trim(), name.trim()))
}

/// Resolve an I94 port-of-entry code to its destination city name.
pub fn resolve_port(code: &str) -> Option<&'static str> {
    PORT_CITIES.get(code.trim()).copied()
}

/// Resolve an I94 numeric country code to a country name.
pub fn resolve_country(code: i64) -> Option<&'static str> {
    COUNTRY_NAMES.get(&code).copied()
}
