//! Status conditions.
//!
//! A condition list holds at most one condition per type. Setting a condition
//! overwrites the slot for its type; when nothing but the timestamp changed,
//! the previous transition time is kept so that re-deriving an unchanged
//! status yields a structurally equal value.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Condition type reflecting whether every referenced export resolved.
pub const API_EXPORT_VALID: &str = "APIExportValid";

/// Reason used when one or more referenced exports could not be resolved,
/// whether missing or unreachable.
pub const INVALID_EXPORTS_REASON: &str = "InvalidExports";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionSeverity {
    #[default]
    #[serde(rename = "")]
    None,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    #[serde(default)]
    pub severity: ConditionSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// A `True` condition with no severity.
    pub fn true_condition(type_: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            type_: type_.into(),
            status: ConditionStatus::True,
            severity: ConditionSeverity::None,
            reason: None,
            message: None,
            last_transition_time: now,
        }
    }

    /// A `False` condition with the given severity, reason and message.
    pub fn false_condition(
        type_: impl Into<String>,
        severity: ConditionSeverity,
        reason: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status: ConditionStatus::False,
            severity,
            reason: Some(reason.into()),
            message: Some(message.into()),
            last_transition_time: now,
        }
    }

    /// Equal in everything but the transition time.
    pub fn has_same_state(&self, other: &Self) -> bool {
        self.type_ == other.type_
            && self.status == other.status
            && self.severity == other.severity
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// Condition list keyed by type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conditions(Vec<Condition>);

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The condition of the given type, if present.
    pub fn get(&self, type_: &str) -> Option<&Condition> {
        self.0.iter().find(|c| c.type_ == type_)
    }

    pub fn is_true(&self, type_: &str) -> bool {
        self.get(type_)
            .is_some_and(|c| c.status == ConditionStatus::True)
    }

    /// Overwrite the slot for the condition's type, or insert it if absent.
    pub fn set(&mut self, mut condition: Condition) {
        match self.0.iter_mut().find(|c| c.type_ == condition.type_) {
            Some(existing) => {
                if existing.has_same_state(&condition) {
                    condition.last_transition_time = existing.last_transition_time;
                }
                *existing = condition;
            }
            None => self.0.push(condition),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Condition>> for Conditions {
    fn from(conditions: Vec<Condition>) -> Self {
        let mut set = Self::new();
        conditions.into_iter().for_each(|c| set.set(c));
        set
    }
}

impl<'a> IntoIterator for &'a Conditions {
    type Item = &'a Condition;
    type IntoIter = std::slice::Iter<'a, Condition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn test_set_inserts_when_absent() {
        let mut conditions = Conditions::new();
        conditions.set(Condition::true_condition(API_EXPORT_VALID, at(1)));
        assert_eq!(conditions.len(), 1);
        assert!(conditions.is_true(API_EXPORT_VALID));
    }

    #[test]
    fn test_set_overwrites_slot_without_duplicating() {
        let mut conditions = Conditions::new();
        conditions.set(Condition::true_condition(API_EXPORT_VALID, at(1)));
        conditions.set(Condition::false_condition(
            API_EXPORT_VALID,
            ConditionSeverity::Error,
            INVALID_EXPORTS_REASON,
            "invalid export(s): root/b",
            at(2),
        ));

        assert_eq!(conditions.len(), 1);
        let cond = conditions.get(API_EXPORT_VALID).unwrap();
        assert_eq!(cond.status, ConditionStatus::False);
        assert_eq!(cond.last_transition_time, at(2));
    }

    #[test]
    fn test_set_keeps_transition_time_when_state_unchanged() {
        let mut conditions = Conditions::new();
        conditions.set(Condition::true_condition(API_EXPORT_VALID, at(1)));
        conditions.set(Condition::true_condition(API_EXPORT_VALID, at(5)));

        let cond = conditions.get(API_EXPORT_VALID).unwrap();
        assert_eq!(cond.last_transition_time, at(1));
    }

    #[test]
    fn test_other_types_are_untouched() {
        let mut conditions = Conditions::new();
        conditions.set(Condition::true_condition("Ready", at(1)));
        conditions.set(Condition::true_condition(API_EXPORT_VALID, at(2)));
        assert_eq!(conditions.len(), 2);
        assert!(conditions.is_true("Ready"));
    }

    #[test]
    fn test_wire_shape() {
        let cond = Condition::true_condition(API_EXPORT_VALID, at(0));
        let json = serde_json::to_value(&cond).unwrap();
        assert_eq!(json["type"], API_EXPORT_VALID);
        assert_eq!(json["status"], "True");
        assert_eq!(json["severity"], "");
        assert!(json.get("message").is_none());
    }
}
