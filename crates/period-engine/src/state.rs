//! The logical state of one range picker: a rule plus the range it selects.
//!
//! Under a period rule, `to` always follows from `from`. Under the custom
//! rule both ends are edited by hand. In every case a state with both ends set
//! keeps `from <= to`; each operation below re-checks it before returning.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::align::{end_of_range, start_of_range};
use crate::calendar::{check_canonical, optional_date};
use crate::error::{PeriodError, Result};
use crate::offset::apply;
use crate::rule::Rule;

/// Dates serialize as canonical `YYYY-MM-DD`. Deserializing goes through the
/// same strict parser and then [`RangeState::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RangeFields")]
pub struct RangeState {
    pub rule: Rule,
    #[serde(with = "optional_date")]
    pub from: Option<NaiveDate>,
    #[serde(with = "optional_date")]
    pub to: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct RangeFields {
    rule: Rule,
    #[serde(default, with = "optional_date")]
    from: Option<NaiveDate>,
    #[serde(default, with = "optional_date")]
    to: Option<NaiveDate>,
}

impl TryFrom<RangeFields> for RangeState {
    type Error = PeriodError;

    fn try_from(fields: RangeFields) -> Result<Self> {
        Self::new(fields.rule, fields.from, fields.to)
    }
}

impl Default for RangeState {
    fn default() -> Self {
        Self {
            rule: Rule::Custom,
            from: None,
            to: None,
        }
    }
}

impl RangeState {
    /// A state with explicit fields.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::InvalidRange`] if `from > to`.
    pub fn new(rule: Rule, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self> {
        let state = Self { rule, from, to };
        state.validate()?;
        Ok(state)
    }

    /// The range a rule selects around `reference`.
    ///
    /// Period rules align to the start of the containing period and derive the
    /// end. The custom rule starts as the single day `reference`.
    ///
    /// # Errors
    ///
    /// Returns any alignment error for rules that cannot tile.
    pub fn aligned(reference: NaiveDate, rule: Rule) -> Result<Self> {
        if rule.is_custom() {
            return Self::new(rule, Some(reference), Some(reference));
        }
        let from = start_of_range(reference, &rule)?;
        let to = end_of_range(from, &rule)?;
        Self::new(rule, Some(from), Some(to))
    }

    /// Check the `from <= to` invariant, and that both ends have a canonical
    /// `YYYY-MM-DD` form.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::InvalidRange`] when both ends are set and out of
    /// order, or [`PeriodError::OutOfRange`] for an end past year 9999.
    pub fn validate(&self) -> Result<()> {
        for end in [self.from, self.to].into_iter().flatten() {
            check_canonical(end)?;
        }
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err(PeriodError::InvalidRange(format!(
                "start {from} is after end {to}"
            ))),
            _ => Ok(()),
        }
    }

    /// Advance one period. A no-op under the custom rule.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::InvalidRange`] if there is no start date to move.
    pub fn next(&self) -> Result<Self> {
        self.step(self.rule)
    }

    /// Go back one period, using the inverted rule. A no-op under the custom
    /// rule.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::InvalidRange`] if there is no start date to move.
    pub fn previous(&self) -> Result<Self> {
        self.step(self.rule.invert())
    }

    fn step(&self, by: Rule) -> Result<Self> {
        if self.rule.is_custom() {
            return Ok(*self);
        }
        let from = self
            .from
            .ok_or_else(|| PeriodError::InvalidRange("range has no start date".to_string()))?;
        self.with_from(apply(from, &by)?)
    }

    /// Switch rules. Period rules realign at `reference`; switching to the
    /// custom rule keeps the current dates for hand editing.
    ///
    /// # Errors
    ///
    /// Returns any alignment error for rules that cannot tile.
    pub fn select_rule(&self, rule: Rule, reference: NaiveDate) -> Result<Self> {
        if rule.is_custom() {
            return Self::new(rule, self.from, self.to);
        }
        Self::aligned(reference, rule)
    }

    /// Move the start. Under a period rule the end follows.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::InvalidRange`] if a custom range would end up out
    /// of order.
    pub fn with_from(&self, from: NaiveDate) -> Result<Self> {
        if self.rule.is_custom() {
            return Self::new(self.rule, Some(from), self.to);
        }
        let to = end_of_range(from, &self.rule)?;
        Self::new(self.rule, Some(from), Some(to))
    }

    /// Move the end of a custom range.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::DerivedEndDate`] under a period rule, or
    /// [`PeriodError::InvalidRange`] if the range would end up out of order.
    pub fn with_to(&self, to: NaiveDate) -> Result<Self> {
        if !self.rule.is_custom() {
            return Err(PeriodError::DerivedEndDate(format!(
                "rule '{}' sets the end date",
                self.rule
            )));
        }
        Self::new(self.rule, self.from, Some(to))
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
