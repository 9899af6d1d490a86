//! # period-engine
//!
//! Calendar-rule arithmetic for date range pickers.
//!
//! A rule token such as `+1m`, `+7d` or `+0.5y` names a recurring period. The
//! engine applies rules to dates with explicit month/year overflow handling,
//! aligns a date to the start of the period containing it, and bridges a
//! picker's state to a flat key/value blob shared with a host form.
//!
//! ## Modules
//!
//! - [`rule`] — Rule token grammar, serialization and inversion
//! - [`offset`] — Apply a rule to a date
//! - [`align`] — Start and end of the period containing a date
//! - [`calendar`] — Canonical `YYYY-MM-DD` parsing and the noon anchor
//! - [`format`] — Format-spec rendering with literal, numeric and localized fields
//! - [`locale`] — Locale tables and registry
//! - [`state`] — Range state with navigation and the `from <= to` invariant
//! - [`codec`] — Flat blob encoding and destructive merge
//! - [`error`] — Error types

pub mod align;
pub mod calendar;
pub mod codec;
pub mod error;
pub mod format;
pub mod locale;
pub mod offset;
pub mod rule;
pub mod state;

pub use align::{end_of_range, start_of_range, start_of_range_token};
pub use calendar::{format_date, parse_date};
pub use codec::{FieldNames, Merged, StateBlob, StateCodec};
pub use error::PeriodError;
pub use format::{format, DateField, DateFormatter, FormatToken, LocalizedField};
pub use locale::{LocaleRegistry, LocaleTable};
pub use offset::apply;
pub use rule::{invert, parse, serialize, Rule, Sign};
pub use state::RangeState;
