//! Events - 記録用のドメインイベント
//!
//! Engine が NoteSink に渡すメッセージの元になります。

use std::fmt;

use chrono::NaiveDate;

use super::ids::OccurrenceId;
use super::template::EndReason;

/// Something worth telling the template's followers about.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// Recurrence switched on; carries the human-readable summary.
    ScheduleStarted { summary: String },
    OccurrenceCreated {
        occurrence_id: OccurrenceId,
        name: String,
        date: NaiveDate,
    },
    SeriesEnded { reason: EndReason },
}

impl fmt::Display for DomainEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainEvent::ScheduleStarted { summary } => f.write_str(summary),
            DomainEvent::OccurrenceCreated { name, .. } => {
                write!(f, "Recurrent task generated: {name}")
            }
            DomainEvent::SeriesEnded { reason } => {
                let why = match reason {
                    EndReason::UntilPassed => "end date reached",
                    EndReason::RepetitionsExhausted => "all repetitions created",
                    EndReason::NoNextDate => "no further date could be computed",
                };
                write!(f, "Recurrence stopped: {why}")
            }
        }
    }
}
