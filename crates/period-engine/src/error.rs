//! Error types for period-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeriodError {
    #[error("Invalid rule token: {0}")]
    InvalidRuleToken(String),

    #[error("Invalid date string: {0}")]
    InvalidDateString(String),

    #[error("Unresolved locale field: {0}")]
    UnresolvedLocaleField(String),

    #[error("Unalignable rule: {0}")]
    UnalignableRule(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("End date is derived from the rule: {0}")]
    DerivedEndDate(String),

    #[error("Date out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PeriodError>;
