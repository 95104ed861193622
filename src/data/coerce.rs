//! Raw cell -> `f64` conversion. Unparseable values become NaN, never errors.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::model::CellValue;

/// Naive layouts tried after RFC 3339, all read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S%.f %p",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Convert one cell to a number: numbers pass through, text is stripped of
/// thousands separators and parsed, anything else is NaN.
pub fn parse_number(value: &CellValue) -> f64 {
    match value {
        CellValue::Integer(i) => *i as f64,
        CellValue::Float(v) => *v,
        CellValue::Text(s) => parse_text_number(s),
        CellValue::Null => f64::NAN,
    }
}

/// Parse a numeric literal that may contain `,` thousands separators.
pub fn parse_text_number(s: &str) -> f64 {
    let cleaned: String = s.trim().chars().filter(|&c| c != ',').collect();
    if cleaned.is_empty() {
        return f64::NAN;
    }
    cleaned.parse::<f64>().unwrap_or(f64::NAN)
}

/// Numeric series for an ordinary data column.
pub fn numeric_series<'a, I>(cells: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a CellValue>,
{
    cells.into_iter().map(parse_number).collect()
}

/// Calendar timestamp in microseconds since the Unix epoch.
pub fn parse_timestamp_micros(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_micros());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.timestamp_micros());
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp_micros());
        }
    }

    // Date only: midnight UTC
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_micros())
}

/// Time column policy.
///
/// If any value parses as a number the column is numeric. Otherwise every
/// value is read as a calendar timestamp and converted to seconds elapsed since
/// the earliest valid timestamp (not the first row). Rows that fail both stay
/// NaN.
pub fn time_series<'a, I>(cells: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a CellValue>,
{
    let cells: Vec<&CellValue> = cells.into_iter().collect();
    let numeric: Vec<f64> = cells.iter().map(|c| parse_number(c)).collect();
    if numeric.iter().any(|v| !v.is_nan()) {
        return numeric;
    }

    let stamps: Vec<Option<i64>> = cells
        .iter()
        .map(|c| match c {
            CellValue::Text(s) => parse_timestamp_micros(s),
            _ => None,
        })
        .collect();

    let Some(earliest) = stamps.iter().flatten().min().copied() else {
        log::debug!("time column has no numeric or timestamp values");
        return vec![f64::NAN; cells.len()];
    };

    stamps
        .iter()
        .map(|s| match s {
            Some(us) => (us - earliest) as f64 / 1e6,
            None => f64::NAN,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn numbers_pass_through_and_text_is_cleaned() {
        assert_eq!(parse_number(&CellValue::Integer(3)), 3.0);
        assert_eq!(parse_number(&CellValue::Float(-1.25)), -1.25);
        assert_eq!(parse_number(&text(" 1,234.5 ")), 1234.5);
        assert!(parse_number(&text("abc")).is_nan());
        assert!(parse_number(&text("")).is_nan());
        assert!(parse_number(&CellValue::Null).is_nan());
    }

    #[test]
    fn numeric_time_column_is_used_verbatim() {
        let cells = vec![CellValue::Float(0.0), text("bad"), CellValue::Float(0.2)];
        let t = time_series(&cells);
        assert_eq!(t[0], 0.0);
        assert!(t[1].is_nan());
        assert_eq!(t[2], 0.2);
    }

    #[test]
    fn timestamps_are_relative_to_earliest() {
        let cells = vec![
            text("2024-05-01T12:00:01.500Z"),
            text("2024-05-01T12:00:00Z"),
            text("not a time"),
            text("2024-05-01 12:00:03"),
        ];
        let t = time_series(&cells);
        assert!((t[0] - 1.5).abs() < 1e-9);
        assert_eq!(t[1], 0.0);
        assert!(t[2].is_nan());
        assert!((t[3] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn unparseable_time_column_is_all_nan() {
        let cells = vec![text("a"), CellValue::Null, text("b")];
        let t = time_series(&cells);
        assert_eq!(t.len(), 3);
        assert!(t.iter().all(|v| v.is_nan()));
    }
}
