//! Pass results and series status views.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{EndReason, OccurrenceId, TemplateTask};

/// What happened to one template during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOutcome {
    /// Snapshot no longer due (inactive or cursor in the future).
    NotDue,
    /// Another worker advanced the cursor first.
    ClaimConflict,
    /// Claimed and created a new occurrence.
    Materialized {
        occurrence_id: OccurrenceId,
        date: NaiveDate,
        ended: Option<EndReason>,
    },
    /// Claimed, but the occurrence already existed (retry after a crash).
    AlreadyMaterialized {
        date: NaiveDate,
        ended: Option<EndReason>,
    },
    /// Series stopped without creating anything.
    Ended(EndReason),
}

impl TemplateOutcome {
    pub fn ended(&self) -> Option<EndReason> {
        match self {
            TemplateOutcome::Materialized { ended, .. }
            | TemplateOutcome::AlreadyMaterialized { ended, .. } => *ended,
            TemplateOutcome::Ended(reason) => Some(*reason),
            TemplateOutcome::NotDue | TemplateOutcome::ClaimConflict => None,
        }
    }
}

/// Counters for one `run_recurrence_pass`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    pub selected: usize,
    pub materialized: usize,
    pub duplicates: usize,
    pub conflicts: usize,
    pub terminated: usize,
    pub failed: usize,
    /// The due-template query itself failed; nothing was processed.
    pub select_failed: bool,
}

impl PassReport {
    pub fn record(&mut self, outcome: &TemplateOutcome) {
        match outcome {
            TemplateOutcome::Materialized { .. } => self.materialized += 1,
            TemplateOutcome::AlreadyMaterialized { .. } => self.duplicates += 1,
            TemplateOutcome::ClaimConflict => self.conflicts += 1,
            TemplateOutcome::Ended(_) | TemplateOutcome::NotDue => {}
        }
        if outcome.ended().is_some() {
            self.terminated += 1;
        }
    }

    /// Fold another worker's report into this one.
    pub fn merge(&mut self, other: &PassReport) {
        self.selected += other.selected;
        self.materialized += other.materialized;
        self.duplicates += other.duplicates;
        self.conflicts += other.conflicts;
        self.terminated += other.terminated;
        self.failed += other.failed;
        self.select_failed |= other.select_failed;
    }
}

/// Whether a template's series is still producing occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesStatus {
    Running,
    Stopped,
}

/// Running iff active, scheduled, and the cursor is today or later.
pub fn series_status(template: &TemplateTask, today: NaiveDate) -> SeriesStatus {
    match template.series.cursor() {
        Some(cursor) if template.series.is_active() && cursor >= today => SeriesStatus::Running,
        _ => SeriesStatus::Stopped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RecurrenceRule, SeriesState, TaskAttributes, TemplateId};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn record_counts_terminations_alongside_creation() {
        let mut report = PassReport::default();
        report.record(&TemplateOutcome::Materialized {
            occurrence_id: OccurrenceId::generate(),
            date: date(2024, 1, 1),
            ended: Some(EndReason::RepetitionsExhausted),
        });
        report.record(&TemplateOutcome::ClaimConflict);
        report.record(&TemplateOutcome::Ended(EndReason::NoNextDate));

        assert_eq!(report.materialized, 1);
        assert_eq!(report.conflicts, 1);
        assert_eq!(report.terminated, 2);
    }

    #[test]
    fn status_follows_cursor() {
        let mut template = TemplateTask {
            id: TemplateId::generate(),
            name: "t".to_string(),
            attributes: TaskAttributes::default(),
            subtasks: vec![],
            rule: RecurrenceRule::daily(1, date(2024, 1, 1)),
            series: SeriesState::inactive(),
        };
        assert_eq!(series_status(&template, date(2024, 1, 1)), SeriesStatus::Stopped);

        template.series.schedule(Some(date(2024, 1, 5)));
        assert_eq!(series_status(&template, date(2024, 1, 5)), SeriesStatus::Running);
        assert_eq!(series_status(&template, date(2024, 1, 6)), SeriesStatus::Stopped);
    }
}
