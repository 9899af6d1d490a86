//! Rule tokens: the small offset language behind every period.
//!
//! A token is a sign, a whole count, an optional decimal fraction and a unit:
//! `+1d`, `+14d`, `-0.5m`, `+2.25y`. The bare token `+0` is the custom-range
//! sentinel, meaning "no alignment, no derived end date".
//!
//! Fractional days have no meaning in this system, so [`Rule`] has no way to
//! carry one and [`parse`] rejects them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PeriodError, Result};

/// The custom-range sentinel as written on the wire.
pub const CUSTOM_TOKEN: &str = "+0";

/// Legacy spelling of the sentinel, produced by older sign-flipping code.
const LEGACY_CUSTOM_TOKEN: &str = "-0";

const MAX_FRACTION_DIGITS: usize = 18;

// ── Components ──────────────────────────────────────────────────────────────

/// Direction of an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Forward,
    Backward,
}

impl Sign {
    /// `+1` or `-1`.
    pub fn factor(self) -> i32 {
        match self {
            Sign::Forward => 1,
            Sign::Backward => -1,
        }
    }

    pub fn flip(self) -> Self {
        match self {
            Sign::Forward => Sign::Backward,
            Sign::Backward => Sign::Forward,
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sign::Forward => "+",
            Sign::Backward => "-",
        })
    }
}

/// A whole-unit count as it was written.
///
/// `width` remembers leading zeros so `+01d` serializes back to `+01d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Count {
    value: u32,
    width: usize,
}

impl Count {
    pub fn new(value: u32) -> Self {
        Self { value, width: 1 }
    }

    pub fn value(self) -> u32 {
        self.value
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.value, width = self.width)
    }
}

/// The decimal part of a month or year count, kept as `digits / 10^scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fraction {
    digits: u64,
    scale: u32,
}

impl Fraction {
    /// The fraction as a value in `[0, 1)`.
    pub fn value(self) -> f64 {
        self.digits as f64 / 10f64.powi(self.scale as i32)
    }

    /// True for spellings like `.0` or `.000`, which carry no offset.
    pub fn is_zero(self) -> bool {
        self.digits == 0
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.digits, width = self.scale as usize)
    }
}

// ── Rule ────────────────────────────────────────────────────────────────────

/// A parsed rule token.
///
/// `Days` has no fraction slot: `+1.5d` is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// The `+0` sentinel: manual from/to editing, no alignment.
    Custom,
    Days {
        sign: Sign,
        count: Count,
    },
    Months {
        sign: Sign,
        count: Count,
        fraction: Option<Fraction>,
    },
    Years {
        sign: Sign,
        count: Count,
        fraction: Option<Fraction>,
    },
}

impl Rule {
    pub fn days(sign: Sign, count: u32) -> Self {
        Rule::Days {
            sign,
            count: Count::new(count),
        }
    }

    pub fn months(sign: Sign, count: u32) -> Self {
        Rule::Months {
            sign,
            count: Count::new(count),
            fraction: None,
        }
    }

    pub fn years(sign: Sign, count: u32) -> Self {
        Rule::Years {
            sign,
            count: Count::new(count),
            fraction: None,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Rule::Custom)
    }

    /// 7-day and 14-day rules tile from a Sunday instead of January 1.
    pub fn is_week_based(&self) -> bool {
        matches!(self, Rule::Days { count, .. } if matches!(count.value(), 7 | 14))
    }

    /// `None` for the sentinel.
    pub fn sign(&self) -> Option<Sign> {
        match *self {
            Rule::Custom => None,
            Rule::Days { sign, .. } | Rule::Months { sign, .. } | Rule::Years { sign, .. } => {
                Some(sign)
            }
        }
    }

    /// True when applying the rule can never move a date: the sentinel, or a
    /// zero count with no (or an all-zero) fraction.
    pub fn is_zero_length(&self) -> bool {
        match *self {
            Rule::Custom => true,
            Rule::Days { count, .. } => count.value() == 0,
            Rule::Months {
                count, fraction, ..
            }
            | Rule::Years {
                count, fraction, ..
            } => count.value() == 0 && fraction.is_none_or(Fraction::is_zero),
        }
    }

    /// The counterpart that navigates the other way. The sentinel inverts to
    /// itself.
    pub fn invert(&self) -> Rule {
        match self.sign() {
            Some(sign) => self.with_sign(sign.flip()),
            None => Rule::Custom,
        }
    }

    /// The same magnitude and unit, pointing forward in time.
    pub fn forward(&self) -> Rule {
        self.with_sign(Sign::Forward)
    }

    fn with_sign(&self, new_sign: Sign) -> Rule {
        match *self {
            Rule::Custom => Rule::Custom,
            Rule::Days { count, .. } => Rule::Days {
                sign: new_sign,
                count,
            },
            Rule::Months {
                count, fraction, ..
            } => Rule::Months {
                sign: new_sign,
                count,
                fraction,
            },
            Rule::Years {
                count, fraction, ..
            } => Rule::Years {
                sign: new_sign,
                count,
                fraction,
            },
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sign, count, fraction, unit) = match *self {
            Rule::Custom => return f.write_str(CUSTOM_TOKEN),
            Rule::Days { sign, count } => (sign, count, None, 'd'),
            Rule::Months {
                sign,
                count,
                fraction,
            } => (sign, count, fraction, 'm'),
            Rule::Years {
                sign,
                count,
                fraction,
            } => (sign, count, fraction, 'y'),
        };
        write!(f, "{sign}{count}")?;
        if let Some(fraction) = fraction {
            write!(f, ".{fraction}")?;
        }
        write!(f, "{unit}")
    }
}

impl FromStr for Rule {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self> {
        parse(s)
    }
}

impl Serialize for Rule {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        parse(&token).map_err(serde::de::Error::custom)
    }
}

// ── Grammar ─────────────────────────────────────────────────────────────────

/// Parse a rule token of the form `^([+-])(\d+)(\.\d+)?([dmy])$`, or the
/// sentinel `+0`.
///
/// # Errors
///
/// Returns [`PeriodError::InvalidRuleToken`] for anything outside the grammar,
/// for fractional days, and for counts too large to represent.
///
/// # Examples
///
/// ```
/// use period_engine::rule::{parse, Rule};
///
/// assert_eq!(parse("+0").unwrap(), Rule::Custom);
/// assert_eq!(parse("-0.5m").unwrap().to_string(), "-0.5m");
/// assert!(parse("+1.5d").is_err());
/// ```
pub fn parse(token: &str) -> Result<Rule> {
    if token == CUSTOM_TOKEN || token == LEGACY_CUSTOM_TOKEN {
        return Ok(Rule::Custom);
    }

    let (sign, rest) = match token.as_bytes().first() {
        Some(b'+') => (Sign::Forward, &token[1..]),
        Some(b'-') => (Sign::Backward, &token[1..]),
        _ => return Err(invalid(token, "must start with '+' or '-'")),
    };

    let Some(unit) = rest.chars().last() else {
        return Err(invalid(token, "missing count and unit"));
    };
    let body = &rest[..rest.len() - unit.len_utf8()];

    let (whole, fraction) = match body.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (body, None),
    };

    if !is_digit_run(whole) {
        return Err(invalid(token, "expected digits before the unit"));
    }
    let value: u32 = whole
        .parse()
        .map_err(|_| invalid(token, "count is too large"))?;
    let count = Count {
        value,
        width: whole.len(),
    };

    let fraction = fraction
        .map(|digits| parse_fraction(token, digits))
        .transpose()?;

    match unit {
        'd' if fraction.is_some() => Err(invalid(token, "fractional days are not supported")),
        'd' => Ok(Rule::Days { sign, count }),
        'm' => Ok(Rule::Months {
            sign,
            count,
            fraction,
        }),
        'y' => Ok(Rule::Years {
            sign,
            count,
            fraction,
        }),
        other => Err(invalid(token, &format!("unknown unit '{other}'"))),
    }
}

/// Render a rule back to its token. Inverse of [`parse`].
pub fn serialize(rule: &Rule) -> String {
    rule.to_string()
}

/// Flip the sign of a rule token, leaving magnitude and unit alone.
///
/// # Errors
///
/// Returns [`PeriodError::InvalidRuleToken`] if `token` does not parse.
///
/// # Examples
///
/// ```
/// use period_engine::rule::invert;
///
/// assert_eq!(invert("+1m").unwrap(), "-1m");
/// assert_eq!(invert("-2.25y").unwrap(), "+2.25y");
/// assert_eq!(invert("+0").unwrap(), "+0");
/// ```
pub fn invert(token: &str) -> Result<String> {
    Ok(parse(token)?.invert().to_string())
}

fn parse_fraction(token: &str, digits: &str) -> Result<Fraction> {
    if !is_digit_run(digits) {
        return Err(invalid(token, "expected digits after '.'"));
    }
    if digits.len() > MAX_FRACTION_DIGITS {
        return Err(invalid(
            token,
            &format!("fraction has more than {MAX_FRACTION_DIGITS} digits"),
        ));
    }
    let value: u64 = digits
        .parse()
        .map_err(|_| invalid(token, "invalid fraction"))?;
    Ok(Fraction {
        digits: value,
        scale: digits.len() as u32,
    })
}

fn is_digit_run(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn invalid(token: &str, reason: &str) -> PeriodError {
    PeriodError::InvalidRuleToken(format!("'{token}': {reason}"))
}

// ── Tests ───────────────────────────────────────────────────────────────────
