//! Preview generator: a bounded, lazy list of upcoming dates for editing
//! surfaces. Never touches a template's cursor.

use std::iter::FusedIterator;

use chrono::NaiveDate;

use super::calculator::next_occurrence;
use crate::domain::{RecurrenceRule, StopPolicy};

/// Cap used when the rule does not stop after a fixed number of repetitions.
pub const DEFAULT_PREVIEW_LIMIT: usize = 100;

/// How many dates a preview shows: the remaining repetitions under `After`
/// (falling back to the configured count), `fallback` otherwise.
pub fn preview_limit(rule: &RecurrenceRule, remaining: Option<u32>, fallback: usize) -> usize {
    match rule.stop {
        StopPolicy::After(count) => remaining.unwrap_or(count) as usize,
        _ => fallback,
    }
}

/// Upcoming dates starting at `start` (inclusive).
///
/// The iterator ends at the first of: `max_count` dates yielded, no next date,
/// or a date past the `Until` bound (that date is not yielded). Clone it to
/// restart from the same point.
pub fn preview(rule: &RecurrenceRule, start: Option<NaiveDate>, max_count: usize) -> Preview {
    Preview {
        rule: rule.clone(),
        next: start,
        left: max_count,
    }
}

#[derive(Debug, Clone)]
pub struct Preview {
    rule: RecurrenceRule,
    next: Option<NaiveDate>,
    left: usize,
}

impl Iterator for Preview {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.left == 0 {
            return None;
        }
        let current = self.next.take()?;
        if self.rule.until_date().is_some_and(|until| current > until) {
            return None;
        }

        self.left -= 1;
        if self.left > 0 {
            self.next = next_occurrence(&self.rule, current);
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            Some(_) => (0, Some(self.left)),
            None => (0, Some(0)),
        }
    }
}

impl FusedIterator for Preview {}
