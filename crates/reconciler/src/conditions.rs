//! Condition Aggregator: folds invalid references into `APIExportValid`.

use catalog_core::{API_EXPORT_VALID, Condition, ConditionSeverity, INVALID_EXPORTS_REASON};
use chrono::{DateTime, Utc};

/// Prefix of the `APIExportValid` message when references failed.
pub const INVALID_EXPORTS_PREFIX: &str = "invalid export(s): ";

/// `"invalid export(s): a, b"` for the given references, in order.
pub fn invalid_exports_message(invalid: &[String]) -> String {
    format!("{INVALID_EXPORTS_PREFIX}{}", invalid.join(", "))
}

/// The `APIExportValid` condition for a pass with the given failures.
pub fn api_export_valid(invalid: &[String], now: DateTime<Utc>) -> Condition {
    if invalid.is_empty() {
        Condition::true_condition(API_EXPORT_VALID, now)
    } else {
        Condition::false_condition(
            API_EXPORT_VALID,
            ConditionSeverity::Error,
            INVALID_EXPORTS_REASON,
            invalid_exports_message(invalid),
            now,
        )
    }
}
