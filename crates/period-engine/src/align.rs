//! Period alignment: the start of the period containing a reference date.
//!
//! Periods tile continuously from January 1 of the reference year (the first
//! Sunday of that year for 7- and 14-day rules). Alignment walks forward one
//! period at a time while the candidate is still on or before the reference.
//! The last boundary visited is the answer. When the epoch itself is already
//! past the reference (early January under week rules), the answer is one
//! inverse step back from the epoch.

use chrono::{Datelike, Days, NaiveDate};
use tracing::trace;

use crate::calendar::out_of_range;
use crate::error::{PeriodError, Result};
use crate::offset::apply;
use crate::rule::{parse, Rule};

/// Compute the latest period boundary on or before `reference`.
///
/// A negative rule aligns like its forward counterpart. A reference that sits
/// exactly on a boundary yields that boundary.
///
/// # Errors
///
/// Returns [`PeriodError::UnalignableRule`] for the custom-range sentinel, for
/// zero-length rules, and for rules whose step fails to move the date.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use period_engine::align::start_of_range;
/// use period_engine::rule::parse;
///
/// let reference = NaiveDate::from_ymd_opt(2014, 6, 15).unwrap();
/// let start = start_of_range(reference, &parse("+1m").unwrap()).unwrap();
/// assert_eq!(start, NaiveDate::from_ymd_opt(2014, 6, 1).unwrap());
/// ```
pub fn start_of_range(reference: NaiveDate, rule: &Rule) -> Result<NaiveDate> {
    if rule.is_custom() {
        return Err(PeriodError::UnalignableRule(
            "the custom range has no periods to align to".to_string(),
        ));
    }
    if rule.is_zero_length() {
        return Err(PeriodError::UnalignableRule(format!(
            "'{rule}' has zero length"
        )));
    }

    let step = rule.forward();
    let back = step.invert();

    let mut candidate = epoch(reference.year(), &step)?;
    let mut boundary = None;
    let mut steps: u64 = 0;
    while candidate <= reference {
        let next = apply(candidate, &step)?;
        if next <= candidate {
            return Err(PeriodError::UnalignableRule(format!(
                "'{rule}' does not advance from {candidate}"
            )));
        }
        boundary = Some(candidate);
        candidate = next;
        steps += 1;
    }

    // Stepping back from `candidate` would give the same date for whole-unit
    // rules, but fractional months can land off the forward tiling.
    let start = match boundary {
        Some(boundary) => boundary,
        None => apply(candidate, &back)?,
    };
    trace!(rule = %rule, reference = %reference, steps, start = %start, "aligned range start");
    Ok(start)
}

/// [`start_of_range`] for a raw rule token.
///
/// # Errors
///
/// Returns [`PeriodError::InvalidRuleToken`] if the token does not parse, or
/// any error [`start_of_range`] returns.
pub fn start_of_range_token(reference: NaiveDate, token: &str) -> Result<NaiveDate> {
    start_of_range(reference, &parse(token)?)
}

/// The last day of the period starting at `start`: one period forward, minus
/// one day.
///
/// # Errors
///
/// Returns [`PeriodError::UnalignableRule`] for the custom-range sentinel,
/// whose end date is never derived.
pub fn end_of_range(start: NaiveDate, rule: &Rule) -> Result<NaiveDate> {
    if rule.is_custom() {
        return Err(PeriodError::UnalignableRule(
            "the custom range has no derived end date".to_string(),
        ));
    }
    let next = apply(start, &rule.forward())?;
    next.pred_opt()
        .ok_or_else(|| out_of_range(format!("day before {next}")))
}

/// First candidate boundary for `year`: January 1, moved forward to a Sunday
/// for week-based rules.
fn epoch(year: i32, step: &Rule) -> Result<NaiveDate> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| out_of_range(format!("January 1 of {year}")))?;
    if !step.is_week_based() {
        return Ok(jan1);
    }
    let to_sunday = (7 - jan1.weekday().num_days_from_sunday()) % 7;
    jan1.checked_add_days(Days::new(u64::from(to_sunday)))
        .ok_or_else(|| out_of_range(format!("first Sunday of {year}")))
}

// ── Tests ───────────────────────────────────────────────────────────────────
