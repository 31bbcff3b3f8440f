//! Wire value coercion by declared data type.
//!
//! Every function here is total: values that cannot be converted come back
//! unchanged so the caller decides what to do with them.

pub mod dataset;
pub mod field;

pub use dataset::{
    DatasetOption, coerce_for_existing_values, map_initial_list_to_dataset_values,
    map_initial_to_dataset_value, normalize_dataset_options, normalize_existing_options,
};
pub use field::{FieldKind, FieldMeta, label_from_name, locale_chain};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::model::{DataType, FieldValue, Scalar};

/// Coerce one value to the representation expected for `data_type`.
#[must_use]
pub fn coerce(value: &Scalar, data_type: DataType) -> Scalar {
    match data_type {
        DataType::Date => to_iso_date_if_possible(value),
        DataType::DateTime => to_iso_datetime_if_possible(value),
        DataType::Number | DataType::Decimal | DataType::Integer => coerce_number(value),
        DataType::Boolean => Scalar::Bool(coerce_bool(value)),
        DataType::String | DataType::KeyValue => Scalar::Text(value.as_text().into_owned()),
    }
}

/// Coerce a possibly missing value.
///
/// Text types turn a missing value into `""` and booleans into `false`;
/// the other types keep it missing.
#[must_use]
pub fn coerce_opt(value: Option<&Scalar>, data_type: DataType) -> Option<Scalar> {
    match (value, data_type) {
        (Some(v), dt) => Some(coerce(v, dt)),
        (None, DataType::String | DataType::KeyValue) => Some(Scalar::Text(String::new())),
        (None, DataType::Boolean) => Some(Scalar::Bool(false)),
        (None, _) => None,
    }
}

/// Coerce every element of a field value.
#[must_use]
pub fn coerce_field(value: &FieldValue, data_type: DataType) -> FieldValue {
    match value {
        FieldValue::Single(s) => FieldValue::Single(coerce(s, data_type)),
        FieldValue::Multi(items) => {
            FieldValue::Multi(items.iter().map(|s| coerce(s, data_type)).collect())
        }
    }
}

/// Coerce, print, and trim. Missing values compare as `""`.
#[must_use]
pub fn normalize_text(value: Option<&Scalar>, data_type: DataType) -> String {
    coerce_opt(value, data_type)
        .map(|s| s.as_text().trim().to_string())
        .unwrap_or_default()
}

fn coerce_number(value: &Scalar) -> Scalar {
    match value {
        Scalar::Number(_) => value.clone(),
        Scalar::Bool(b) => Scalar::Number(if *b { 1.0 } else { 0.0 }),
        Scalar::Text(s) => {
            let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
            if compact.is_empty() {
                return value.clone();
            }
            compact
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map_or_else(|| value.clone(), Scalar::Number)
        }
    }
}

fn coerce_bool(value: &Scalar) -> bool {
    match value {
        Scalar::Bool(b) => *b,
        Scalar::Text(s) if s == "true" || s == "1" => true,
        Scalar::Text(s) if s == "false" || s == "0" => false,
        other => other.truthy(),
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

fn is_iso_date(bytes: &[u8]) -> bool {
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// `YYYY-MM-DD` alone, or followed by `T` or whitespace.
fn has_iso_date_prefix(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() < 10 || !is_iso_date(&bytes[..10]) {
        return false;
    }
    match s[10..].chars().next() {
        None | Some('T') => true,
        Some(c) => c.is_whitespace(),
    }
}

/// A successfully parsed free-form date.
struct LooseDate {
    /// Wall-clock time in the offset it was written with.
    local: NaiveDateTime,
    /// The same instant in UTC (equal to `local` when no offset was given).
    utc: NaiveDateTime,
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%B %d, %Y", "%d %B %Y"];

fn parse_loose(s: &str) -> Option<LooseDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let with_offset = DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_rfc2822(s))
        .ok()
        .map(|dt| LooseDate {
            local: dt.naive_local(),
            utc: dt.naive_utc(),
        });

    let naive = || {
        NAIVE_DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .or_else(|| {
                NAIVE_DATE_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                    .map(|d| d.and_time(NaiveTime::MIN))
            })
            .map(|dt| LooseDate { local: dt, utc: dt })
    };

    with_offset
        .or_else(naive)
        .filter(|d| (1..=9999).contains(&chrono::Datelike::year(&d.local)))
}

/// Normalize to `YYYY-MM-DD` when the value parses as a date.
#[must_use]
pub fn to_iso_date_if_possible(value: &Scalar) -> Scalar {
    if !value.truthy() {
        return value.clone();
    }
    let text = value.as_text();
    if is_iso_date(text.as_bytes()) {
        return value.clone();
    }
    parse_loose(&text).map_or_else(
        || value.clone(),
        |d| Scalar::Text(d.local.format("%Y-%m-%d").to_string()),
    )
}

/// Parse `D[D].M[M].YYYY[ H[H]:m[m][:s[s]]]` into an ISO local datetime.
fn parse_locale_datetime(s: &str) -> Option<String> {
    fn digits(part: &str, min: usize, max: usize) -> Option<&str> {
        (part.len() >= min && part.len() <= max && part.bytes().all(|b| b.is_ascii_digit()))
            .then_some(part)
    }

    let (date_part, time_part) = match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], Some(s[idx..].trim_start())),
        None => (s, None),
    };

    let mut date = date_part.split('.');
    let day = digits(date.next()?, 1, 2)?;
    let month = digits(date.next()?, 1, 2)?;
    let year = digits(date.next()?, 4, 4)?;
    if date.next().is_some() {
        return None;
    }

    let (hour, minute, second) = match time_part {
        None => ("0", "0", "0"),
        Some(t) => {
            let mut parts = t.split(':');
            let h = digits(parts.next()?, 1, 2)?;
            let m = digits(parts.next()?, 1, 2)?;
            let sec = match parts.next() {
                Some(p) => digits(p, 1, 2)?,
                None => "0",
            };
            if parts.next().is_some() {
                return None;
            }
            (h, m, sec)
        }
    };

    Some(format!(
        "{year}-{month:0>2}-{day:0>2}T{hour:0>2}:{minute:0>2}:{second:0>2}"
    ))
}

/// Normalize to `YYYY-MM-DDTHH:mm:ss` when the value looks like a datetime.
#[must_use]
pub fn to_iso_datetime_if_possible(value: &Scalar) -> Scalar {
    if matches!(value, Scalar::Text(s) if s.is_empty()) {
        return value.clone();
    }
    let text = value.as_text();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return value.clone();
    }
    if has_iso_date_prefix(trimmed) {
        return Scalar::Text(trimmed.to_string());
    }
    if let Some(iso) = parse_locale_datetime(trimmed) {
        return Scalar::Text(iso);
    }
    parse_loose(trimmed).map_or_else(
        || value.clone(),
        |d| Scalar::Text(d.utc.format("%Y-%m-%dT%H:%M:%S").to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Scalar {
        Scalar::from(s)
    }

    #[test]
    fn datetime_locale_pattern_is_reformatted() {
        assert_eq!(
            to_iso_datetime_if_possible(&text("04.11.2021 11:19:29")),
            text("2021-11-04T11:19:29")
        );
        assert_eq!(
            to_iso_datetime_if_possible(&text("4.1.2021")),
            text("2021-01-04T00:00:00")
        );
        assert_eq!(
            to_iso_datetime_if_possible(&text("4.1.2021 7:05")),
            text("2021-01-04T07:05:00")
        );
    }

    #[test]
    fn datetime_iso_input_passes_through() {
        let iso = text("2026-02-06T15:13:42.000+01:00");
        assert_eq!(to_iso_datetime_if_possible(&iso), iso);
        assert_eq!(to_iso_datetime_if_possible(&text("2021-11-04")), text("2021-11-04"));
    }

    #[test]
    fn datetime_leaves_non_dates_alone() {
        for raw in ["212,54 KB", "Freigabe", "T000000825", ""] {
            assert_eq!(to_iso_datetime_if_possible(&text(raw)), text(raw), "{raw}");
        }
    }

    #[test]
    fn datetime_generic_parse_is_utc() {
        assert_eq!(
            to_iso_datetime_if_possible(&text("Thu, 04 Nov 2021 11:19:29 +0100")),
            text("2021-11-04T10:19:29")
        );
    }

    #[test]
    fn date_normalization() {
        assert_eq!(to_iso_date_if_possible(&text("2021-11-04")), text("2021-11-04"));
        assert_eq!(
            to_iso_date_if_possible(&text("2021-11-04T23:30:00+01:00")),
            text("2021-11-04")
        );
        assert_eq!(to_iso_date_if_possible(&text("11/04/2021")), text("2021-11-04"));
        assert_eq!(to_iso_date_if_possible(&text("soon")), text("soon"));
        assert_eq!(to_iso_date_if_possible(&text("")), text(""));
    }

    #[test]
    fn numbers_strip_whitespace() {
        assert_eq!(coerce(&text(" 1 000 "), DataType::Number), Scalar::Number(1000.0));
        assert_eq!(coerce(&text("12.5"), DataType::Decimal), Scalar::Number(12.5));
        assert_eq!(coerce(&text("abc"), DataType::Integer), text("abc"));
        assert_eq!(coerce(&text(""), DataType::Number), text(""));
        assert_eq!(coerce(&text("inf"), DataType::Number), text("inf"));
        assert_eq!(coerce_opt(None, DataType::Number), None);
    }

    #[test]
    fn booleans() {
        assert_eq!(coerce(&text("true"), DataType::Boolean), Scalar::Bool(true));
        assert_eq!(coerce(&text("0"), DataType::Boolean), Scalar::Bool(false));
        assert_eq!(coerce(&Scalar::Number(1.0), DataType::Boolean), Scalar::Bool(true));
        assert_eq!(coerce(&text("no"), DataType::Boolean), Scalar::Bool(true));
        assert_eq!(coerce(&text(""), DataType::Boolean), Scalar::Bool(false));
    }

    #[test]
    fn strings_stringify_and_default_to_empty() {
        assert_eq!(coerce(&Scalar::Number(3.0), DataType::String), text("3"));
        assert_eq!(coerce_opt(None, DataType::KeyValue), Some(text("")));
        assert_eq!(normalize_text(Some(&text("  x ")), DataType::String), "x");
        assert_eq!(normalize_text(None, DataType::Date), "");
    }
}
