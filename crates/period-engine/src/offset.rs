//! Applying a rule to a date.
//!
//! Month and year offsets renormalize the month index by hand and then roll
//! the day-of-month forward from the 1st, so `2024-01-31 +1m` lands on
//! `2024-03-02` regardless of how any calendar library would clamp it.
//! Fractional offsets interpolate between the whole-unit result and one more
//! unit along.

use chrono::{Datelike, Days, Duration, NaiveDate};

use crate::calendar::{at_noon, out_of_range, rolled_date};
use crate::error::Result;
use crate::rule::{Fraction, Rule, Sign};

/// Fractional month results on or before this day snap to the 1st.
const SNAP_TO_FIRST_MAX_DAY: u32 = 2;

/// Apply `rule` to `date`.
///
/// The custom-range sentinel is the identity.
///
/// # Errors
///
/// Returns [`crate::PeriodError::OutOfRange`] if the result falls outside the
/// representable calendar.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use period_engine::offset::apply;
/// use period_engine::rule::parse;
///
/// let start = NaiveDate::from_ymd_opt(2014, 6, 1).unwrap();
/// let next = apply(start, &parse("+1m").unwrap()).unwrap();
/// assert_eq!(next, NaiveDate::from_ymd_opt(2014, 7, 1).unwrap());
/// ```
pub fn apply(date: NaiveDate, rule: &Rule) -> Result<NaiveDate> {
    match *rule {
        Rule::Custom => Ok(date),
        Rule::Days { sign, count } => shift_days(date, sign, count.value()),
        Rule::Months {
            sign,
            count,
            fraction,
        } => {
            let whole = shift_months(date, sign, count.value())?;
            match nonzero(fraction) {
                None => Ok(whole),
                Some(fraction) => {
                    let next = shift_months(whole, sign, 1)?;
                    let blended = interpolate(whole, next, fraction)?;
                    Ok(snap_to_first(blended))
                }
            }
        }
        Rule::Years {
            sign,
            count,
            fraction,
        } => {
            let whole = shift_years(date, sign, count.value())?;
            match nonzero(fraction) {
                None => Ok(whole),
                Some(fraction) => {
                    let next = shift_years(whole, sign, 1)?;
                    interpolate(whole, next, fraction)
                }
            }
        }
    }
}

fn nonzero(fraction: Option<Fraction>) -> Option<Fraction> {
    fraction.filter(|f| !f.is_zero())
}

fn shift_days(date: NaiveDate, sign: Sign, days: u32) -> Result<NaiveDate> {
    let delta = Days::new(u64::from(days));
    match sign {
        Sign::Forward => date.checked_add_days(delta),
        Sign::Backward => date.checked_sub_days(delta),
    }
    .ok_or_else(|| out_of_range(format!("{date} {sign}{days} days")))
}

/// Move by `months` using carry/borrow renormalization of the month index.
fn shift_months(date: NaiveDate, sign: Sign, months: u32) -> Result<NaiveDate> {
    let whole_years = (months / 12) as i32;
    let rem_months = (months % 12) as i32;

    let mut year = date.year();
    let mut month0 = date.month0() as i32 + sign.factor() * rem_months;
    if month0 > 11 {
        month0 -= 12;
        year += 1;
    } else if month0 < 0 {
        month0 += 12;
        year -= 1;
    }

    let year = whole_years
        .checked_mul(sign.factor())
        .and_then(|delta| year.checked_add(delta))
        .ok_or_else(|| out_of_range(format!("{date} {sign}{months} months")))?;

    rolled_date(year, month0 as u32, date.day())
}

fn shift_years(date: NaiveDate, sign: Sign, years: u32) -> Result<NaiveDate> {
    let year = i32::try_from(years)
        .ok()
        .and_then(|years| years.checked_mul(sign.factor()))
        .and_then(|delta| date.year().checked_add(delta))
        .ok_or_else(|| out_of_range(format!("{date} {sign}{years} years")))?;

    rolled_date(year, date.month0(), date.day())
}

/// Linear blend of two noon-anchored timestamps, truncated to whole
/// milliseconds.
fn interpolate(from: NaiveDate, to: NaiveDate, fraction: Fraction) -> Result<NaiveDate> {
    let start = at_noon(from)?;
    let end = at_noon(to)?;
    let span_ms = (end - start).num_milliseconds() as f64;
    let offset = Duration::milliseconds((span_ms * fraction.value()).trunc() as i64);

    start
        .checked_add_signed(offset)
        .map(|dt| dt.date())
        .ok_or_else(|| out_of_range(format!("{from} + {fraction} of the way to {to}")))
}

fn snap_to_first(date: NaiveDate) -> NaiveDate {
    if date.day() <= SNAP_TO_FIRST_MAX_DAY {
        date.with_day(1).unwrap_or(date)
    } else {
        date
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
