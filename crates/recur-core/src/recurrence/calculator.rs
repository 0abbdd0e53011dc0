//! Occurrence calculator: pure date arithmetic over a `RecurrenceRule`.
//!
//! Month and year steps are applied to the previous occurrence and clamp the
//! day-of-month to the target month's length (`2024-01-31 + 1 month =
//! 2024-02-29`, then `2024-03-29`). The series does not snap back to the start
//! day once clamped.

use chrono::{Datelike, Days, Months, NaiveDate};

use crate::domain::{RecurrenceRule, Unit, WeekdayMask};

/// Next date strictly after `last`, or `None` when no date exists (weekly rule
/// without weekdays, or the calendar's upper bound).
pub fn next_occurrence(rule: &RecurrenceRule, last: NaiveDate) -> Option<NaiveDate> {
    let interval = rule.interval.max(1);
    match rule.unit {
        Unit::Day => last.checked_add_days(Days::new(u64::from(interval))),
        Unit::Month => last.checked_add_months(Months::new(interval)),
        Unit::Year => interval
            .checked_mul(12)
            .and_then(|months| last.checked_add_months(Months::new(months))),
        Unit::Week => next_weekly(rule.weekdays, interval, last),
    }
}

/// First date of the series: `start_date` itself, or for weekly rules the first
/// selected weekday on or after it.
pub fn first_occurrence(rule: &RecurrenceRule) -> Option<NaiveDate> {
    match rule.unit {
        Unit::Week => first_masked_from(rule.weekdays, rule.start_date),
        _ => Some(rule.start_date),
    }
}

/// Weekly cadence.
///
/// Interval 1 scans forward from the day after `last`. Larger intervals jump
/// whole Monday-based week blocks: `last`'s Monday plus `interval` weeks, then
/// the first selected day in that block.
fn next_weekly(mask: WeekdayMask, interval: u32, last: NaiveDate) -> Option<NaiveDate> {
    if mask.is_empty() {
        return None;
    }

    if interval == 1 {
        return last
            .iter_days()
            .skip(1)
            .take(7)
            .find(|day| mask.contains(day.weekday()));
    }

    let step = Days::new(7 * u64::from(interval));
    let offset = last.weekday().num_days_from_monday();
    let monday = last.checked_sub_days(Days::new(u64::from(offset)))?;
    let mut block = monday.checked_add_days(step)?;
    loop {
        let candidate = first_masked_from(mask, block)?;
        if candidate > last {
            return Some(candidate);
        }
        block = block.checked_add_days(step)?;
    }
}

/// First day on or after `from` whose weekday is in `mask`.
fn first_masked_from(mask: WeekdayMask, from: NaiveDate) -> Option<NaiveDate> {
    if mask.is_empty() {
        return None;
    }
    from.iter_days()
        .take(7)
        .find(|day| mask.contains(day.weekday()))
}
