//! Flat key/value interchange for [`RangeState`].
//!
//! Several pickers can share one blob. Each merge consumes only the three keys
//! its codec is configured for and leaves every other key in place for the
//! next consumer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::align::end_of_range;
use crate::calendar::{format_date, parse_date};
use crate::error::{PeriodError, Result};
use crate::rule::parse;
use crate::state::RangeState;

/// The external representation: string keys, insertion-ordered. Keys owned by
/// other components may hold any JSON value.
pub type StateBlob = serde_json::Map<String, Value>;

/// Blob keys for the three logical fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub rule: String,
    pub from: String,
    pub to: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            rule: "range".to_string(),
            from: "from".to_string(),
            to: "to".to_string(),
        }
    }
}

impl FieldNames {
    /// Parse field names from JSON; missing names keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::InvalidConfig`] for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PeriodError::InvalidConfig(format!("field names: {e}")))
    }

    fn validate(&self) -> Result<()> {
        let names = [&self.rule, &self.from, &self.to];
        if names.iter().any(|name| name.is_empty()) {
            return Err(PeriodError::InvalidConfig(
                "field names must not be empty".to_string(),
            ));
        }
        if self.rule == self.from || self.rule == self.to || self.from == self.to {
            return Err(PeriodError::InvalidConfig(format!(
                "field names must be distinct: {names:?}"
            )));
        }
        Ok(())
    }
}

/// The outcome of [`StateCodec::merge`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Merged {
    pub state: RangeState,
    /// True only if some field took a different value.
    pub changed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StateCodec {
    fields: FieldNames,
}

impl StateCodec {
    /// # Errors
    ///
    /// Returns [`PeriodError::InvalidConfig`] for empty or duplicate names.
    pub fn new(fields: FieldNames) -> Result<Self> {
        fields.validate()?;
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &FieldNames {
        &self.fields
    }

    /// Write the state's fields as strings. Unset dates are left out.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use period_engine::codec::StateCodec;
    /// use period_engine::rule::parse;
    /// use period_engine::state::RangeState;
    ///
    /// let reference = NaiveDate::from_ymd_opt(2014, 6, 15).unwrap();
    /// let state = RangeState::aligned(reference, parse("+1m").unwrap()).unwrap();
    /// let blob = StateCodec::default().encode(&state);
    /// assert_eq!(blob["range"], "+1m");
    /// assert_eq!(blob["from"], "2014-06-01");
    /// assert_eq!(blob["to"], "2014-06-30");
    /// ```
    pub fn encode(&self, state: &RangeState) -> StateBlob {
        let mut blob = StateBlob::new();
        blob.insert(self.fields.rule.clone(), Value::String(state.rule.to_string()));
        if let Some(from) = state.from {
            blob.insert(self.fields.from.clone(), Value::String(format_date(from)));
        }
        if let Some(to) = state.to {
            blob.insert(self.fields.to.clone(), Value::String(format_date(to)));
        }
        blob
    }

    /// Fold the recognized keys of `blob` into `current`, removing them from
    /// `blob`.
    ///
    /// A recognized key is consumed whether or not its value differs. An empty
    /// string or `null` for a date key clears that end. Under a period rule
    /// with a start date, `to` is re-derived from `from` and the rule. The
    /// merge is all-or-nothing: on error, `blob` is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::InvalidRuleToken`] or
    /// [`PeriodError::InvalidDateString`] for unparseable values,
    /// [`PeriodError::DerivedEndDate`] if the blob's end disagrees with the
    /// derived one, and [`PeriodError::InvalidRange`] if the merged range is
    /// out of order.
    pub fn merge(&self, blob: &mut StateBlob, current: &RangeState) -> Result<Merged> {
        let mut next = *current;

        if let Some(value) = blob.get(&self.fields.rule) {
            let token = text(&self.fields.rule, value, PeriodError::InvalidRuleToken)?
                .ok_or_else(|| {
                    PeriodError::InvalidRuleToken(format!("'{}' is null", self.fields.rule))
                })?;
            next.rule = parse(token)?;
        }
        if let Some(value) = blob.get(&self.fields.from) {
            next.from = date_value(&self.fields.from, value)?;
        }
        let given_to = match blob.get(&self.fields.to) {
            Some(value) => Some(date_value(&self.fields.to, value)?),
            None => None,
        };
        match (next.rule.is_custom(), next.from) {
            (false, Some(from)) => {
                let derived = end_of_range(from, &next.rule)?;
                if let Some(Some(to)) = given_to.filter(|to| *to != Some(derived)) {
                    return Err(PeriodError::DerivedEndDate(format!(
                        "'{}' is {to}, but rule '{}' from {from} ends on {derived}",
                        self.fields.to, next.rule
                    )));
                }
                next.to = Some(derived);
            }
            _ => {
                if let Some(to) = given_to {
                    next.to = to;
                }
            }
        }
        next.validate()?;

        let consumed: Vec<&str> = [&self.fields.rule, &self.fields.from, &self.fields.to]
            .into_iter()
            .filter(|key| blob.shift_remove(key.as_str()).is_some())
            .map(String::as_str)
            .collect();

        let changed = next != *current;
        debug!(consumed = ?consumed, changed, remaining = blob.len(), "merged range state");
        Ok(Merged {
            state: next,
            changed,
        })
    }
}

fn text<'a>(
    key: &str,
    value: &'a Value,
    error: fn(String) -> PeriodError,
) -> Result<Option<&'a str>> {
    match value {
        Value::String(s) => Ok(Some(s.as_str())),
        Value::Null => Ok(None),
        other => Err(error(format!("'{key}' must be a string, got {other}"))),
    }
}

fn date_value(key: &str, value: &Value) -> Result<Option<chrono::NaiveDate>> {
    match text(key, value, PeriodError::InvalidDateString)? {
        None | Some("") => Ok(None),
        Some(s) => parse_date(s).map(Some),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Rule;
    use chrono::NaiveDate;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn blob(value: Value) -> StateBlob {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn custom_june() -> RangeState {
        RangeState::new(Rule::Custom, Some(date(2014, 6, 1)), Some(date(2014, 6, 30))).unwrap()
    }

    // ── encode tests ────────────────────────────────────────────────────

    #[test]
    fn test_encode_all_fields() {
        let encoded = StateCodec::default().encode(&custom_june());
        assert_eq!(
            Value::Object(encoded),
            json!({"range": "+0", "from": "2014-06-01", "to": "2014-06-30"})
        );
    }

    #[test]
    fn test_encode_omits_unset_dates() {
        let state = RangeState::new(Rule::Custom, None, Some(date(2014, 6, 30))).unwrap();
        let encoded = StateCodec::default().encode(&state);
        assert!(!encoded.contains_key("from"));
        assert_eq!(encoded["to"], "2014-06-30");
    }

    #[test]
    fn test_encode_uses_configured_names() {
        let codec = StateCodec::new(FieldNames {
            rule: "period".into(),
            from: "start".into(),
            to: "end".into(),
        })
        .unwrap();
        let encoded = codec.encode(&custom_june());
        assert_eq!(
            encoded.keys().collect::<Vec<_>>(),
            vec!["period", "start", "end"]
        );
    }

    // ── merge tests ─────────────────────────────────────────────────────

    #[test]
    fn test_merge_consumes_only_recognized_keys() {
        let mut shared = blob(json!({"range": "+1m", "foo": 1, "from": "2014-01-01"}));
        let merged = StateCodec::default()
            .merge(&mut shared, &custom_june())
            .unwrap();

        assert_eq!(Value::Object(shared), json!({"foo": 1}));
        assert!(merged.changed);
        assert_eq!(merged.state.rule.to_string(), "+1m");
        assert_eq!(merged.state.from, Some(date(2014, 1, 1)));
        assert_eq!(merged.state.to, Some(date(2014, 1, 31)));
    }

    #[test]
    fn test_merge_rule_alone_rederives_end() {
        let current =
            RangeState::new(Rule::Custom, Some(date(2014, 6, 3)), Some(date(2014, 6, 9))).unwrap();
        let mut shared = blob(json!({"range": "+1m"}));
        let merged = StateCodec::default().merge(&mut shared, &current).unwrap();
        assert!(merged.changed);
        assert_eq!(merged.state.from, Some(date(2014, 6, 3)));
        assert_eq!(merged.state.to, Some(date(2014, 7, 2)));
        assert!(shared.is_empty());
    }

    #[test]
    fn test_merge_derived_end_wins_over_cleared_end() {
        let current = RangeState::aligned(date(2014, 6, 15), "+1m".parse().unwrap()).unwrap();
        let mut shared = blob(json!({"to": ""}));
        let merged = StateCodec::default().merge(&mut shared, &current).unwrap();
        assert!(!merged.changed);
        assert_eq!(merged.state.to, Some(date(2014, 6, 30)));
    }

    #[test]
    fn test_merge_conflicting_end_under_period_rule_is_error() {
        let mut shared = blob(json!({"range": "+1m", "from": "2014-06-01", "to": "2014-06-20"}));
        let before = shared.clone();
        let err = StateCodec::default()
            .merge(&mut shared, &custom_june())
            .unwrap_err();
        assert!(matches!(err, PeriodError::DerivedEndDate(_)));
        assert_eq!(shared, before);
    }

    #[test]
    fn test_merge_same_values_consumes_without_change() {
        let mut shared = blob(json!({"range": "+0", "from": "2014-06-01", "other": "x"}));
        let merged = StateCodec::default()
            .merge(&mut shared, &custom_june())
            .unwrap();
        assert!(!merged.changed);
        assert_eq!(merged.state, custom_june());
        assert_eq!(Value::Object(shared), json!({"other": "x"}));
    }

    #[test]
    fn test_merge_empty_blob_is_noop() {
        let mut shared = StateBlob::new();
        let merged = StateCodec::default()
            .merge(&mut shared, &custom_june())
            .unwrap();
        assert!(!merged.changed);
        assert!(shared.is_empty());
    }

    #[test]
    fn test_merge_two_codecs_share_a_blob() {
        let first = StateCodec::default();
        let second = StateCodec::new(FieldNames {
            rule: "b_range".into(),
            from: "b_from".into(),
            to: "b_to".into(),
        })
        .unwrap();
        let mut shared = blob(json!({
            "range": "+7d", "b_range": "+1y", "b_from": "2014-01-01", "b_to": "2014-12-31"
        }));

        let a = first.merge(&mut shared, &RangeState::default()).unwrap();
        assert_eq!(a.state.rule.to_string(), "+7d");
        assert_eq!(shared.len(), 3);

        let b = second.merge(&mut shared, &RangeState::default()).unwrap();
        assert_eq!(b.state.to, Some(date(2014, 12, 31)));
        assert!(shared.is_empty());
    }

    #[test]
    fn test_merge_keeps_order_of_remaining_keys() {
        let mut shared = blob(json!({"a": 1, "range": "+1m", "b": 2, "c": 3}));
        StateCodec::default()
            .merge(&mut shared, &RangeState::default())
            .unwrap();
        assert_eq!(shared.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_merge_empty_date_clears_end() {
        let mut shared = blob(json!({"to": ""}));
        let merged = StateCodec::default()
            .merge(&mut shared, &custom_june())
            .unwrap();
        assert!(merged.changed);
        assert_eq!(merged.state.to, None);
        assert!(shared.is_empty());
    }

    #[test]
    fn test_merge_bad_rule_leaves_blob_untouched() {
        let mut shared = blob(json!({"range": "+1w", "from": "2014-01-01"}));
        let before = shared.clone();
        let err = StateCodec::default()
            .merge(&mut shared, &custom_june())
            .unwrap_err();
        assert!(matches!(err, PeriodError::InvalidRuleToken(_)));
        assert_eq!(shared, before);
    }

    #[test]
    fn test_merge_bad_date_is_error() {
        let mut shared = blob(json!({"from": "2014-02-31"}));
        assert!(matches!(
            StateCodec::default().merge(&mut shared, &custom_june()),
            Err(PeriodError::InvalidDateString(_))
        ));
        let mut shared = blob(json!({"from": 20140101}));
        assert!(matches!(
            StateCodec::default().merge(&mut shared, &custom_june()),
            Err(PeriodError::InvalidDateString(_))
        ));
    }

    #[test]
    fn test_merge_inverted_range_is_error() {
        let mut shared = blob(json!({"from": "2014-07-01"}));
        let err = StateCodec::default()
            .merge(&mut shared, &custom_june())
            .unwrap_err();
        assert!(matches!(err, PeriodError::InvalidRange(_)));
        assert!(shared.contains_key("from"));
    }

    #[test]
    fn test_encode_then_merge_reports_no_change() {
        let codec = StateCodec::default();
        let mut shared = codec.encode(&custom_june());
        let merged = codec.merge(&mut shared, &custom_june()).unwrap();
        assert!(!merged.changed);
        assert!(shared.is_empty());
    }

    // ── config tests ────────────────────────────────────────────────────

    #[test]
    fn test_field_names_from_json_partial() {
        let fields = FieldNames::from_json(r#"{"rule": "period"}"#).unwrap();
        assert_eq!(fields.rule, "period");
        assert_eq!(fields.from, "from");
    }

    #[test]
    fn test_duplicate_field_names_rejected() {
        let fields = FieldNames {
            rule: "x".into(),
            from: "x".into(),
            to: "to".into(),
        };
        assert!(matches!(
            StateCodec::new(fields),
            Err(PeriodError::InvalidConfig(_))
        ));
    }
}
