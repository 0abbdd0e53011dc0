//! TemplateStore port - テンプレートと生成済みタスクの正本（source of truth）
//!
//! # 設計原則
//! - cursor の前進は compare-and-set（`claim_cursor`）でのみ行う
//! - `(template, occurrence_date)` の一意性はストレージ側で保証する
//! - プロセスをまたぐワーカーがあるので、プロセス内ロックに頼らない

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{
    NewOccurrence, Occurrence, RecurrenceRule, SeriesState, StoreError, TemplateId, TemplateTask,
};

#[async_trait]
pub trait TemplateStore: Send + Sync {
    // ---- engine ----

    /// Active templates whose cursor is on or before `today`.
    async fn due_templates(&self, today: NaiveDate) -> Result<Vec<TemplateTask>, StoreError>;

    /// Set `remaining` to `count` unless it is already set. Returns the value
    /// now stored.
    async fn init_remaining(&self, id: TemplateId, count: u32) -> Result<u32, StoreError>;

    /// Atomically move the cursor from `expected` to `next`.
    ///
    /// `Ok(false)` means another worker moved it first (or the series ended);
    /// that is a normal outcome, not an error.
    async fn claim_cursor(
        &self,
        id: TemplateId,
        expected: NaiveDate,
        next: NaiveDate,
    ) -> Result<bool, StoreError>;

    /// Insert an occurrence. Fails with `StoreError::DuplicateOccurrence` when
    /// one already exists for the same template and date.
    async fn create_occurrence(&self, occurrence: NewOccurrence)
    -> Result<Occurrence, StoreError>;

    /// Decrement `remaining` and return the new value.
    async fn consume_repetition(&self, id: TemplateId) -> Result<u32, StoreError>;

    /// Mark the series finished: inactive with no cursor.
    async fn end_series(&self, id: TemplateId) -> Result<(), StoreError>;

    // ---- editing ----

    async fn insert_template(&self, template: TemplateTask) -> Result<(), StoreError>;

    async fn get_template(&self, id: TemplateId) -> Result<TemplateTask, StoreError>;

    /// Replace the rule and series state of a template together.
    async fn update_schedule(
        &self,
        id: TemplateId,
        rule: RecurrenceRule,
        series: SeriesState,
    ) -> Result<(), StoreError>;

    /// Remove the template. Its occurrences stay, with `template_ref` cleared.
    async fn delete_template(&self, id: TemplateId) -> Result<(), StoreError>;

    /// Occurrences generated from `id`, oldest date first.
    async fn occurrences_of(&self, id: TemplateId) -> Result<Vec<Occurrence>, StoreError>;
}
