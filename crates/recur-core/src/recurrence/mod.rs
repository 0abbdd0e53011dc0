//! Recurrence: pure functions over a `RecurrenceRule`.
//!
//! - calculator: next / first occurrence
//! - validator: shape checks before a cursor is computed
//! - preview: bounded lazy list of upcoming dates
//! - summary: human-readable description

mod calculator;
mod preview;
mod summary;
mod validator;

pub use calculator::{first_occurrence, next_occurrence};
pub use preview::{DEFAULT_PREVIEW_LIMIT, Preview, preview, preview_limit};
pub use summary::describe;
pub use validator::{is_valid, validate, validate_enabled};

use chrono::NaiveDate;

use crate::domain::{InvalidRule, RecurrenceRule};

/// First occurrence of a rule, validated. Editing surfaces call this to show a
/// cursor; an `Err` means "no cursor yet".
pub fn compute_first_occurrence(rule: &RecurrenceRule) -> Result<Option<NaiveDate>, InvalidRule> {
    validate(rule)?;
    Ok(first_occurrence(rule))
}

/// Upcoming dates from `cursor` for display. Invalid rules preview nothing.
pub fn preview_upcoming(
    rule: &RecurrenceRule,
    cursor: Option<NaiveDate>,
    limit: usize,
) -> Vec<NaiveDate> {
    if !is_valid(rule) {
        return Vec::new();
    }
    preview(rule, cursor, limit).collect()
}
