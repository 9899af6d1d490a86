//! Rendering dates from a small format-spec language.
//!
//! A format spec is an ordered list of tokens. Each token is one of:
//!
//! - a localized field, written with the `@` marker (`@month`), looked up in
//!   the locale table;
//! - a plain date field (`day`, `dd`, `month`, `mm`, `year`, `weekday`);
//! - anything else, emitted verbatim.

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::error::Result;
use crate::locale::{LocaleRegistry, LocaleTable};
use crate::rule::Rule;

/// Prefix that marks a localized field.
pub const LOCALIZED_MARKER: char = '@';

/// Calendar components rendered as numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    /// Day of month, unpadded.
    Day,
    /// Day of month, two digits.
    DayPadded,
    /// One-based month, unpadded.
    Month,
    /// One-based month, two digits.
    MonthPadded,
    Year,
    /// Days since Sunday (Sunday = 0).
    Weekday,
}

const DATE_FIELDS: &[(&str, DateField)] = &[
    ("day", DateField::Day),
    ("dd", DateField::DayPadded),
    ("month", DateField::Month),
    ("mm", DateField::MonthPadded),
    ("year", DateField::Year),
    ("weekday", DateField::Weekday),
];

impl DateField {
    pub fn from_name(name: &str) -> Option<Self> {
        DATE_FIELDS
            .iter()
            .find(|(field_name, _)| *field_name == name)
            .map(|(_, field)| *field)
    }

    pub fn render(self, date: NaiveDate) -> String {
        match self {
            DateField::Day => date.day().to_string(),
            DateField::DayPadded => format!("{:02}", date.day()),
            DateField::Month => date.month().to_string(),
            DateField::MonthPadded => format!("{:02}", date.month()),
            DateField::Year => date.year().to_string(),
            DateField::Weekday => date.weekday().num_days_from_sunday().to_string(),
        }
    }
}

/// Calendar components rendered through a locale table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalizedField {
    Month,
}

const LOCALIZED_FIELDS: &[(&str, LocalizedField)] = &[("month", LocalizedField::Month)];

impl LocalizedField {
    pub fn from_name(name: &str) -> Option<Self> {
        LOCALIZED_FIELDS
            .iter()
            .find(|(field_name, _)| *field_name == name)
            .map(|(_, field)| *field)
    }

    fn lookup(self, date: NaiveDate, locale: &LocaleTable) -> Result<&str> {
        match self {
            LocalizedField::Month => locale.month_label(date.month0()),
        }
    }
}

/// One resolved element of a format spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatToken {
    Localized(LocalizedField),
    Field(DateField),
    Literal(String),
}

impl FormatToken {
    /// Classify a raw token: localized field first, then plain field, then
    /// literal. An unknown `@name` is a literal.
    pub fn resolve(raw: &str) -> Self {
        if let Some(field) = raw
            .strip_prefix(LOCALIZED_MARKER)
            .and_then(LocalizedField::from_name)
        {
            return FormatToken::Localized(field);
        }
        if let Some(field) = DateField::from_name(raw) {
            return FormatToken::Field(field);
        }
        FormatToken::Literal(raw.to_string())
    }
}

/// Render `date` by concatenating each token of `spec` in order.
///
/// A localized field with no entry in `locale` contributes nothing.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use period_engine::format::{format, FormatToken};
/// use period_engine::locale::LocaleTable;
///
/// let spec: Vec<FormatToken> = ["dd", ".", "mm", ".", "year"]
///     .iter()
///     .map(|raw| FormatToken::resolve(raw))
///     .collect();
/// let date = NaiveDate::from_ymd_opt(2014, 6, 1).unwrap();
/// assert_eq!(format(&spec, date, &LocaleTable::default()), "01.06.2014");
/// ```
pub fn format(spec: &[FormatToken], date: NaiveDate, locale: &LocaleTable) -> String {
    let mut out = String::new();
    for token in spec {
        match token {
            FormatToken::Localized(field) => match field.lookup(date, locale) {
                Ok(label) => out.push_str(label),
                Err(err) => debug!(error = %err, "skipping unresolved locale field"),
            },
            FormatToken::Field(field) => out.push_str(&field.render(date)),
            FormatToken::Literal(text) => out.push_str(text),
        }
    }
    out
}

/// A formatter bound to an explicit set of locale tables.
#[derive(Debug, Clone, Default)]
pub struct DateFormatter {
    locales: LocaleRegistry,
}

impl DateFormatter {
    pub fn new(locales: LocaleRegistry) -> Self {
        Self { locales }
    }

    pub fn locales(&self) -> &LocaleRegistry {
        &self.locales
    }

    pub fn locales_mut(&mut self) -> &mut LocaleRegistry {
        &mut self.locales
    }

    /// Render `date` with the locale's own format spec.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PeriodError::UnresolvedLocaleField`] if the locale is
    /// not registered.
    pub fn render(&self, locale: &str, date: NaiveDate) -> Result<String> {
        let table = self.locales.get(locale)?;
        Ok(format(&table.format_spec(), date, table))
    }

    /// # Errors
    ///
    /// Returns [`crate::PeriodError::UnresolvedLocaleField`] if the locale or
    /// the label is missing.
    pub fn rule_label(&self, locale: &str, rule: &Rule) -> Result<&str> {
        self.locales.get(locale)?.rule_label(rule)
    }

    /// # Errors
    ///
    /// Returns [`crate::PeriodError::UnresolvedLocaleField`] if the locale or
    /// the label is missing.
    pub fn month_label(&self, locale: &str, month0: u32) -> Result<&str> {
        self.locales.get(locale)?.month_label(month0)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
