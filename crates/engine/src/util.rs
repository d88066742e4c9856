//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Calendar-date key used for daily summary rows (`YYYY-MM-DD`, UTC).
///
/// Summaries are keyed by the posting date, not the business date of the
/// underlying document.
pub(crate) fn day_key(at: DateTime<Utc>) -> String {
    at.date_naive().to_string()
}
