//! Tolerant scalar casts shared by every cleaner.
//!
//! Raw extracts carry numbers as text, and SAS-derived files render integers
//! as floats ("2016.0"). A cast that cannot make sense of its input yields
//! `None` rather than an error; nulls then flow through joins and
//! aggregations the same way they would in a bulk query engine.

/// Parse an integer field, accepting float renderings of whole numbers.
pub fn to_i64(raw: Option<&str>) -> Option<i64> {
    let s = non_blank(raw?)?;
    if let Ok(n) = s.parse::<i64>() {
        return Some(n);
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => Some(f.trunc() as i64),
        _ => None,
    }
}

/// Parse a float field. Non-finite values count as malformed.
pub fn to_f64(raw: Option<&str>) -> Option<f64> {
    let s = non_blank(raw?)?;
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => Some(f),
        _ => None,
    }
}

/// Trimmed, non-empty view of a raw field.
pub fn non_blank(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Upper-case normalization used for every city join key.
pub fn to_upper(s: &str) -> String {
    s.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_cast_accepts_sas_float_rendering() {
        assert_eq!(to_i64(Some("2016.0")), Some(2016));
        assert_eq!(to_i64(Some("6")), Some(6));
        assert_eq!(to_i64(Some(" 44 ")), Some(44));
    }

    #[test]
    fn integer_cast_yields_none_for_garbage() {
        assert_eq!(to_i64(Some("abc")), None);
        assert_eq!(to_i64(Some("")), None);
        assert_eq!(to_i64(Some("NaN")), None);
        assert_eq!(to_i64(None), None);
    }

    #[test]
    fn float_cast_rejects_non_finite() {
        assert_eq!(to_f64(Some("12.5")), Some(12.5));
        assert_eq!(to_f64(Some("inf")), None);
        assert_eq!(to_f64(Some("nan")), None);
        assert_eq!(to_f64(Some("x")), None);
    }

    #[test]
    fn upper_trims_and_normalizes() {
        assert_eq!(to_upper("  New York "), "NEW YORK");
    }
}
