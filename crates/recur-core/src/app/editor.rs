//! RecurrenceEditor - テンプレートの作成・ルール変更
//!
//! ルールを変更するたびに cursor を最初の発生日に再計算します。
//! 不正なルールはエラーにせず「cursor なし」で保存します。

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

use crate::app::report::{SeriesStatus, series_status};
use crate::domain::{
    DomainEvent, Occurrence, RecurrenceRule, SeriesState, StoreError, TemplateDraft, TemplateId,
    TemplateTask,
};
use crate::ports::{IdGenerator, NoteSink, TemplateStore};
use crate::recurrence::{compute_first_occurrence, describe, preview_limit, preview_upcoming};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct RecurrenceEditor {
    store: Arc<dyn TemplateStore>,
    notes: Arc<dyn NoteSink>,
    ids: Arc<dyn IdGenerator>,
    preview_limit: usize,
}

impl RecurrenceEditor {
    pub fn new(
        store: Arc<dyn TemplateStore>,
        notes: Arc<dyn NoteSink>,
        ids: Arc<dyn IdGenerator>,
        preview_limit: usize,
    ) -> Self {
        Self {
            store,
            notes,
            ids,
            preview_limit,
        }
    }

    /// Persist a new template. A recurring draft is scheduled at its first
    /// occurrence and announces its summary.
    pub async fn create_template(&self, draft: TemplateDraft) -> Result<TemplateTask, EditorError> {
        let mut series = SeriesState::inactive();
        if draft.recurring {
            enable(&mut series, &draft.rule);
        }

        let template = TemplateTask {
            id: self.ids.template_id(),
            name: draft.name,
            attributes: draft.attributes,
            subtasks: draft.subtasks,
            rule: draft.rule,
            series,
        };
        self.store.insert_template(template.clone()).await?;
        info!(
            template_id = %template.id,
            cursor = ?template.series.cursor(),
            "template created"
        );

        if template.series.is_active() {
            self.announce(&template).await;
        }
        Ok(template)
    }

    /// Replace the rule. An enabled series is rescheduled from the new rule's
    /// first occurrence; a changed repetition count resets the budget.
    pub async fn update_rule(
        &self,
        id: TemplateId,
        rule: RecurrenceRule,
    ) -> Result<TemplateTask, EditorError> {
        let mut template = self.store.get_template(id).await?;
        let mut series = template.series.clone();
        if rule.repetitions() != template.rule.repetitions() {
            series.reset_remaining(rule.repetitions());
        } else if let Some(count) = rule.repetitions() {
            series.init_remaining(count);
        }
        if series.is_active() {
            series.schedule(first_cursor(&rule));
        }

        self.store
            .update_schedule(id, rule.clone(), series.clone())
            .await?;
        info!(template_id = %id, cursor = ?series.cursor(), "recurrence rule updated");

        template.rule = rule;
        template.series = series;
        Ok(template)
    }

    /// Switch recurrence on or off. Switching on posts the rule summary.
    pub async fn set_recurring(
        &self,
        id: TemplateId,
        enabled: bool,
    ) -> Result<TemplateTask, EditorError> {
        let mut template = self.store.get_template(id).await?;
        let was_active = template.series.is_active();

        if enabled {
            enable(&mut template.series, &template.rule);
        } else {
            template.series.pause();
        }

        self.store
            .update_schedule(id, template.rule.clone(), template.series.clone())
            .await?;
        info!(template_id = %id, enabled, cursor = ?template.series.cursor(), "recurrence toggled");

        if enabled && !was_active {
            self.announce(&template).await;
        }
        Ok(template)
    }

    pub async fn delete_template(&self, id: TemplateId) -> Result<(), EditorError> {
        self.store.delete_template(id).await?;
        info!(template_id = %id, "template deleted");
        Ok(())
    }

    pub async fn get_template(&self, id: TemplateId) -> Result<TemplateTask, EditorError> {
        Ok(self.store.get_template(id).await?)
    }

    pub async fn occurrences(&self, id: TemplateId) -> Result<Vec<Occurrence>, EditorError> {
        Ok(self.store.occurrences_of(id).await?)
    }

    pub async fn generated_count(&self, id: TemplateId) -> Result<usize, EditorError> {
        Ok(self.store.occurrences_of(id).await?.len())
    }

    pub async fn status(&self, id: TemplateId, today: NaiveDate) -> Result<SeriesStatus, EditorError> {
        let template = self.store.get_template(id).await?;
        Ok(series_status(&template, today))
    }

    /// Upcoming dates from the stored cursor. Read-only.
    pub async fn preview(&self, id: TemplateId) -> Result<Vec<NaiveDate>, EditorError> {
        let template = self.store.get_template(id).await?;
        let limit = preview_limit(
            &template.rule,
            template.series.remaining(),
            self.preview_limit,
        );
        Ok(preview_upcoming(
            &template.rule,
            template.series.cursor(),
            limit,
        ))
    }

    async fn announce(&self, template: &TemplateTask) {
        let event = DomainEvent::ScheduleStarted {
            summary: describe(&template.rule),
        };
        if let Err(err) = self.notes.post_note(template.id, &event.to_string()).await {
            warn!(template_id = %template.id, error = %err, "failed to post note");
        }
    }
}

/// Cursor for a freshly (re)scheduled rule; `None` when the rule is invalid.
fn first_cursor(rule: &RecurrenceRule) -> Option<NaiveDate> {
    compute_first_occurrence(rule).ok().flatten()
}

fn enable(series: &mut SeriesState, rule: &RecurrenceRule) {
    if series.remaining() == Some(0) {
        series.reset_remaining(rule.repetitions());
    } else if let Some(count) = rule.repetitions() {
        series.init_remaining(count);
    }
    series.schedule(first_cursor(rule));
}
