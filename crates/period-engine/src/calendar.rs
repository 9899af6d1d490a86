//! Date-string canonicalization and the calendar helpers shared by the
//! offset engine and the aligner.
//!
//! All intermediate arithmetic happens at 12:00:00.000 on the day in question,
//! so interpolated timestamps never straddle a day boundary by accident.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};

use crate::error::{PeriodError, Result};

/// Hour of day every computation is anchored to.
pub const ANCHOR_HOUR: u32 = 12;

/// Last year with a four-digit `YYYY-MM-DD` form. Arithmetic may pass it;
/// stored ranges may not.
pub const MAX_CANONICAL_YEAR: i32 = 9999;

/// Parse a strict `YYYY-MM-DD` date string.
///
/// Unlike `NaiveDate::parse_from_str`, this refuses unpadded fields and signed
/// years, so only the canonical form is accepted.
///
/// # Errors
///
/// Returns [`PeriodError::InvalidDateString`] for any other shape, and for
/// dates that do not exist (e.g. `2014-02-31`).
///
/// # Examples
///
/// ```
/// use period_engine::calendar::{format_date, parse_date};
///
/// let date = parse_date("2014-06-01").unwrap();
/// assert_eq!(format_date(date), "2014-06-01");
/// assert!(parse_date("2014-6-1").is_err());
/// ```
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let bytes = s.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return Err(PeriodError::InvalidDateString(format!(
            "'{s}': expected YYYY-MM-DD"
        )));
    }

    let field = |range: std::ops::Range<usize>| s[range].parse::<u32>().unwrap_or(0);
    let (year, month, day) = (field(0..4) as i32, field(5..7), field(8..10));

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| PeriodError::InvalidDateString(format!("'{s}': no such calendar date")))
}

/// Render a date as zero-padded `YYYY-MM-DD`.
///
/// Years outside `0..=9999` do not fit four digits and will not parse back;
/// use [`check_canonical`] before storing such a date.
pub fn format_date(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// Check that `date` has a canonical `YYYY-MM-DD` form.
///
/// # Errors
///
/// Returns [`PeriodError::OutOfRange`] for years outside `0..=9999`.
pub fn check_canonical(date: NaiveDate) -> Result<NaiveDate> {
    if (0..=MAX_CANONICAL_YEAR).contains(&date.year()) {
        Ok(date)
    } else {
        Err(out_of_range(format!("{date} has no YYYY-MM-DD form")))
    }
}

/// The date at the fixed noon anchor.
pub(crate) fn at_noon(date: NaiveDate) -> Result<NaiveDateTime> {
    date.and_hms_opt(ANCHOR_HOUR, 0, 0)
        .ok_or_else(|| out_of_range(format!("{date} at noon")))
}

/// Build `(year, month0, day)` by rolling forward from the first of the
/// month, so a day past the month's end spills into the following month
/// instead of being clamped.
pub(crate) fn rolled_date(year: i32, month0: u32, day: u32) -> Result<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month0 + 1, 1)
        .ok_or_else(|| out_of_range(format!("year {year}, month {}", month0 + 1)))?;
    first
        .checked_add_days(Days::new(u64::from(day.saturating_sub(1))))
        .ok_or_else(|| out_of_range(format!("day {day} after {first}")))
}

pub(crate) fn out_of_range(what: String) -> PeriodError {
    PeriodError::OutOfRange(what)
}

/// Serde adapter for `Option<NaiveDate>` that reads and writes the canonical
/// `YYYY-MM-DD` form used by [`parse_date`] and [`format_date`]. `null` and the
/// empty string both read as unset.
pub mod optional_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::{format_date, parse_date};

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_str(&format_date(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(deserializer)?.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => parse_date(s).map(Some).map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_canonical() {
        assert_eq!(parse_date("2014-01-01").unwrap(), date(2014, 1, 1));
        assert_eq!(parse_date("0999-12-31").unwrap(), date(999, 12, 31));
    }

    #[test]
    fn test_parse_date_rejects_shape() {
        for s in ["2014-1-01", "2014/01/01", "14-01-01", "2014-01-01T00:00", "+2014-01-0", ""] {
            let err = parse_date(s).unwrap_err().to_string();
            assert!(err.contains("expected YYYY-MM-DD"), "{s:?} got: {err}");
        }
    }

    #[test]
    fn test_parse_date_rejects_impossible_dates() {
        let err = parse_date("2014-02-31").unwrap_err().to_string();
        assert!(err.contains("no such calendar date"), "got: {err}");
        assert!(parse_date("2014-13-01").is_err());
        assert!(parse_date("2014-00-10").is_err());
    }

    #[test]
    fn test_format_date_pads() {
        assert_eq!(format_date(date(2014, 3, 7)), "2014-03-07");
        assert_eq!(format_date(date(33, 1, 1)), "0033-01-01");
    }

    #[test]
    fn test_check_canonical_bounds() {
        assert!(check_canonical(date(0, 1, 1)).is_ok());
        assert!(check_canonical(date(9999, 12, 31)).is_ok());
        let err = check_canonical(date(10000, 1, 1)).unwrap_err();
        assert!(matches!(err, PeriodError::OutOfRange(_)));
        assert!(check_canonical(date(-1, 12, 31)).is_err());
    }

    #[test]
    fn test_rolled_date_spills_into_next_month() {
        // Feb 31 2024 rolls two days past the leap-day end of February
        assert_eq!(rolled_date(2024, 1, 31).unwrap(), date(2024, 3, 2));
        assert_eq!(rolled_date(2023, 1, 29).unwrap(), date(2023, 3, 1));
        assert_eq!(rolled_date(2023, 11, 31).unwrap(), date(2023, 12, 31));
    }

    #[test]
    fn test_optional_date_serde() {
        #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
        struct Holder {
            #[serde(default, with = "optional_date")]
            at: Option<NaiveDate>,
        }

        let held: Holder = serde_json::from_str(r#"{"at": "2014-06-09"}"#).unwrap();
        assert_eq!(held.at, Some(date(2014, 6, 9)));
        assert_eq!(serde_json::to_string(&held).unwrap(), r#"{"at":"2014-06-09"}"#);

        let empty: Holder = serde_json::from_str(r#"{"at": ""}"#).unwrap();
        assert_eq!(empty.at, None);
        let missing: Holder = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.at, None);

        let err = serde_json::from_str::<Holder>(r#"{"at": "2014-6-9"}"#).unwrap_err();
        assert!(err.to_string().contains("expected YYYY-MM-DD"), "got: {err}");
    }

    #[test]
    fn test_at_noon() {
        let noon = at_noon(date(2014, 6, 1)).unwrap();
        assert_eq!(noon.to_string(), "2014-06-01 12:00:00");
    }
}
