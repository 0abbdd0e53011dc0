//! Template task: the owner of a recurrence rule and its series cursor.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ids::TemplateId;
use super::rule::RecurrenceRule;

/// Attributes shared with every generated occurrence, copied verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskAttributes {
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: Option<String>,
    /// Anything else the host record carries.
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Why a series stopped producing occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// The next date would fall after the `Until` date.
    UntilPassed,
    /// `After` repetitions consumed.
    RepetitionsExhausted,
    /// No next date could be computed (e.g. weekly rule with no weekdays).
    NoNextDate,
}

/// Mutable per-template scheduling state.
///
/// Fields are private; the store moves a series through its states only via
/// the transition methods below (schedule → claim → consume → end).
///
/// State transitions:
/// - inactive -> active(cursor)            `schedule`
/// - active(c) -> active(next)             `claim` when the stored cursor is still `c`
/// - active(c) -> inactive(no cursor)      `end` / `pause`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesState {
    active: bool,
    cursor: Option<NaiveDate>,
    remaining: Option<u32>,
}

impl SeriesState {
    /// Recurrence switched off, nothing scheduled.
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Rebuild a state read back from a backing store.
    pub fn from_parts(active: bool, cursor: Option<NaiveDate>, remaining: Option<u32>) -> Self {
        Self {
            active,
            cursor,
            remaining,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn cursor(&self) -> Option<NaiveDate> {
        self.cursor
    }

    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    /// Selected by a pass dated `today`.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.active && self.cursor.is_some_and(|cursor| cursor <= today)
    }

    /// Recurrence enabled with `cursor` as the first pending date.
    /// `None` keeps the series enabled but unscheduled (incomplete rule).
    pub fn schedule(&mut self, cursor: Option<NaiveDate>) {
        self.active = true;
        self.cursor = cursor;
    }

    /// Recurrence switched off by the user. Remaining repetitions are kept so a
    /// resumed series continues its count.
    pub fn pause(&mut self) {
        self.active = false;
        self.cursor = None;
    }

    /// Set the repetition budget if it has not been set yet.
    pub fn init_remaining(&mut self, count: u32) -> bool {
        if self.remaining.is_some() {
            return false;
        }
        self.remaining = Some(count);
        true
    }

    /// Overwrite the repetition budget (rule edited).
    pub fn reset_remaining(&mut self, count: Option<u32>) {
        self.remaining = count;
    }

    /// Compare-and-set on the cursor. Returns `true` when this caller won.
    pub fn claim(&mut self, expected: NaiveDate, next: NaiveDate) -> bool {
        if !self.active || self.cursor != Some(expected) {
            return false;
        }
        self.cursor = Some(next);
        true
    }

    /// Consume one repetition and return what is left.
    pub fn consume_repetition(&mut self) -> u32 {
        let left = self.remaining.unwrap_or(0).saturating_sub(1);
        self.remaining = Some(left);
        left
    }

    /// Series finished: stop selecting it.
    pub fn end(&mut self) {
        self.active = false;
        self.cursor = None;
    }
}

/// A task marked as recurring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateTask {
    pub id: TemplateId,
    pub name: String,
    pub attributes: TaskAttributes,
    /// Sub-items owned by the template itself; never copied to occurrences.
    #[serde(default)]
    pub subtasks: Vec<String>,
    pub rule: RecurrenceRule,
    pub series: SeriesState,
}

/// Input for creating a template through the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDraft {
    pub name: String,
    #[serde(default)]
    pub attributes: TaskAttributes,
    #[serde(default)]
    pub subtasks: Vec<String>,
    #[serde(default = "default_recurring")]
    pub recurring: bool,
    pub rule: RecurrenceRule,
}

fn default_recurring() -> bool {
    true
}
