//! Locale tables and the registry that holds them.
//!
//! The engine ships no label content. Hosts register tables, usually from a
//! JSON document keyed by locale id:
//!
//! ```json
//! {
//!   "en": {
//!     "rules": { "+1m": "Month", "+7d": "Week", "+0": "Custom" },
//!     "months": ["January", "February", "March", "April", "May", "June",
//!                "July", "August", "September", "October", "November", "December"],
//!     "format": ["@month", " ", "day", ", ", "year"],
//!     "from_label": "From",
//!     "to_label": "To"
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PeriodError, Result};
use crate::format::FormatToken;
use crate::rule::Rule;

/// A full month table has one label per month.
pub const MONTHS_PER_YEAR: usize = 12;

/// Labels and the display format for one locale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleTable {
    /// Rule token → label, e.g. `"+1m"` → `"Month"`.
    #[serde(default)]
    pub rules: BTreeMap<String, String>,
    /// Month labels indexed by zero-based month.
    #[serde(default)]
    pub months: Vec<String>,
    /// Ordered format tokens, resolved by [`FormatToken::resolve`].
    #[serde(default)]
    pub format: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_label: Option<String>,
}

impl LocaleTable {
    /// Label for a rule, looked up by its canonical token.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::UnresolvedLocaleField`] if the table has no entry.
    pub fn rule_label(&self, rule: &Rule) -> Result<&str> {
        let token = rule.to_string();
        self.rules
            .get(&token)
            .map(String::as_str)
            .ok_or_else(|| PeriodError::UnresolvedLocaleField(format!("rule label for '{token}'")))
    }

    /// Label for a zero-based month index.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::UnresolvedLocaleField`] if the table has no entry.
    pub fn month_label(&self, month0: u32) -> Result<&str> {
        self.months
            .get(month0 as usize)
            .map(String::as_str)
            .ok_or_else(|| PeriodError::UnresolvedLocaleField(format!("month label {month0}")))
    }

    /// The table's format string list, resolved into tokens.
    pub fn format_spec(&self) -> Vec<FormatToken> {
        self.format.iter().map(|raw| FormatToken::resolve(raw)).collect()
    }

    fn validate(&self, id: &str) -> Result<()> {
        if !self.months.is_empty() && self.months.len() != MONTHS_PER_YEAR {
            return Err(PeriodError::InvalidConfig(format!(
                "locale '{id}' has {} month labels, expected {MONTHS_PER_YEAR}",
                self.months.len()
            )));
        }
        Ok(())
    }
}

/// Locale tables by id, handed to formatters at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocaleRegistry {
    tables: BTreeMap<String, LocaleTable>,
}

impl LocaleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of locale id → table.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::InvalidConfig`] for malformed JSON or a month
    /// table that is neither empty nor twelve entries long.
    pub fn from_json(json: &str) -> Result<Self> {
        let registry: LocaleRegistry = serde_json::from_str(json)
            .map_err(|e| PeriodError::InvalidConfig(format!("locale tables: {e}")))?;
        for (id, table) in &registry.tables {
            table.validate(id)?;
        }
        Ok(registry)
    }

    /// Add or replace a locale, returning the table it replaced.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::InvalidConfig`] if the table fails validation.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        table: LocaleTable,
    ) -> Result<Option<LocaleTable>> {
        let id = id.into();
        table.validate(&id)?;
        debug!(locale = %id, "registered locale table");
        Ok(self.tables.insert(id, table))
    }

    /// Look up a locale, falling back from a region tag to its language
    /// (`en-GB` → `en`).
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::UnresolvedLocaleField`] if neither is registered.
    pub fn get(&self, id: &str) -> Result<&LocaleTable> {
        if let Some(table) = self.tables.get(id) {
            return Ok(table);
        }
        let language = id.split(['-', '_']).next().unwrap_or(id);
        self.tables
            .get(language)
            .ok_or_else(|| PeriodError::UnresolvedLocaleField(format!("locale '{id}'")))
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}
