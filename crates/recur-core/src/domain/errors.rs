//! Errors - エラー型と分類
//!
//! - InvalidRule: 編集画面に返す（Engine からは返さない）
//! - StoreError: ストレージ障害・一意制約違反
//! - NoteError: 通知は best-effort（ログのみ）
//! - PassError: テンプレート単位の失敗（到達した段階つき）

use chrono::NaiveDate;
use thiserror::Error;

use super::ids::TemplateId;

/// Malformed recurrence configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRule {
    #[error("recurrence is disabled")]
    RecurrenceDisabled,

    #[error("interval must be at least 1")]
    NonPositiveInterval,

    #[error("weekly recurrence needs at least one weekday")]
    EmptyWeekdayMask,

    #[error("end date {until} is before start date {start}")]
    UntilBeforeStart { start: NaiveDate, until: NaiveDate },
}

/// Failure reported by a `TemplateStore`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("template not found: {0}")]
    TemplateNotFound(TemplateId),

    /// Unique `(template, occurrence_date)` violated.
    #[error("occurrence for {template_id} on {date} already exists")]
    DuplicateOccurrence {
        template_id: TemplateId,
        date: NaiveDate,
    },

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Failure reported by a `NoteSink`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteError {
    #[error("note sink unavailable: {0}")]
    Unavailable(String),
}

/// Step of the claim-and-generate protocol a template reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassStage {
    InitRemaining,
    Terminate,
    Claim,
    Materialize,
    StopEvaluation,
}

/// A single template failed during a pass; the batch carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("template {template_id} failed at {stage:?}: {source}")]
pub struct PassError {
    pub template_id: TemplateId,
    pub stage: PassStage,
    #[source]
    pub source: StoreError,
}

impl PassError {
    pub fn new(template_id: TemplateId, stage: PassStage, source: StoreError) -> Self {
        Self {
            template_id,
            stage,
            source,
        }
    }
}
