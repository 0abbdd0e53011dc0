//! InMemoryTemplateStore - 開発用・テスト用の正本
//!
//! # 学習ポイント
//! - 全操作を 1 つの Mutex の中で完結させることで compare-and-set を原子的にする
//! - 一意インデックス `(template, date)` を HashMap で表現
//! - ロックを跨いで await しない

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::domain::{
    NewOccurrence, Occurrence, OccurrenceId, RecurrenceRule, SeriesState, StoreError, TemplateId,
    TemplateTask,
};
use crate::ports::{IdGenerator, SystemClock, TemplateStore, UlidGenerator};

#[derive(Default)]
struct StoreState {
    templates: HashMap<TemplateId, TemplateTask>,
    occurrences: HashMap<OccurrenceId, Occurrence>,
    /// Unique index over `(template_ref, occurrence_date)`. Rows whose template
    /// was deleted drop out of it, as NULLs do in a SQL unique index.
    by_template_date: HashMap<(TemplateId, NaiveDate), OccurrenceId>,
}

impl StoreState {
    fn template_mut(&mut self, id: TemplateId) -> Result<&mut TemplateTask, StoreError> {
        self.templates
            .get_mut(&id)
            .ok_or(StoreError::TemplateNotFound(id))
    }
}

/// `TemplateStore` kept in process memory.
///
/// Clones share the same state, so several engines (workers) can race on one
/// store in tests and simulations.
#[derive(Clone)]
pub struct InMemoryTemplateStore {
    state: Arc<Mutex<StoreState>>,
    ids: Arc<dyn IdGenerator>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::with_id_generator(Arc::new(UlidGenerator::new(SystemClock)))
    }

    pub fn with_id_generator(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            ids,
        }
    }

    /// Every stored occurrence, including orphans of deleted templates.
    pub async fn all_occurrences(&self) -> Vec<Occurrence> {
        let state = self.state.lock().await;
        let mut all: Vec<_> = state.occurrences.values().cloned().collect();
        all.sort_by_key(|occ| (occ.occurrence_date, occ.id));
        all
    }

    pub async fn template_count(&self) -> usize {
        self.state.lock().await.templates.len()
    }
}

impl Default for InMemoryTemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn due_templates(&self, today: NaiveDate) -> Result<Vec<TemplateTask>, StoreError> {
        let state = self.state.lock().await;
        let mut due: Vec<_> = state
            .templates
            .values()
            .filter(|template| template.series.is_due(today))
            .cloned()
            .collect();
        due.sort_by_key(|template| template.id);
        Ok(due)
    }

    async fn init_remaining(&self, id: TemplateId, count: u32) -> Result<u32, StoreError> {
        let mut state = self.state.lock().await;
        let template = state.template_mut(id)?;
        template.series.init_remaining(count);
        Ok(template.series.remaining().unwrap_or(count))
    }

    async fn claim_cursor(
        &self,
        id: TemplateId,
        expected: NaiveDate,
        next: NaiveDate,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.template_mut(id)?.series.claim(expected, next))
    }

    async fn create_occurrence(
        &self,
        occurrence: NewOccurrence,
    ) -> Result<Occurrence, StoreError> {
        let mut state = self.state.lock().await;
        let key = (occurrence.template_id, occurrence.occurrence_date);
        if state.by_template_date.contains_key(&key) {
            return Err(StoreError::DuplicateOccurrence {
                template_id: key.0,
                date: key.1,
            });
        }

        let created = occurrence.into_occurrence(self.ids.occurrence_id());
        state.by_template_date.insert(key, created.id);
        state.occurrences.insert(created.id, created.clone());
        Ok(created)
    }

    async fn consume_repetition(&self, id: TemplateId) -> Result<u32, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.template_mut(id)?.series.consume_repetition())
    }

    async fn end_series(&self, id: TemplateId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.template_mut(id)?.series.end();
        Ok(())
    }

    async fn insert_template(&self, template: TemplateTask) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.templates.insert(template.id, template);
        Ok(())
    }

    async fn get_template(&self, id: TemplateId) -> Result<TemplateTask, StoreError> {
        let state = self.state.lock().await;
        state
            .templates
            .get(&id)
            .cloned()
            .ok_or(StoreError::TemplateNotFound(id))
    }

    async fn update_schedule(
        &self,
        id: TemplateId,
        rule: RecurrenceRule,
        series: SeriesState,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let template = state.template_mut(id)?;
        template.rule = rule;
        template.series = series;
        Ok(())
    }

    async fn delete_template(&self, id: TemplateId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.templates.remove(&id).is_none() {
            return Err(StoreError::TemplateNotFound(id));
        }
        state.by_template_date.retain(|(template_id, _), _| *template_id != id);
        for occurrence in state.occurrences.values_mut() {
            if occurrence.template_ref == Some(id) {
                occurrence.template_ref = None;
            }
            if occurrence.parent == Some(id) {
                occurrence.parent = None;
            }
        }
        Ok(())
    }

    async fn occurrences_of(&self, id: TemplateId) -> Result<Vec<Occurrence>, StoreError> {
        let state = self.state.lock().await;
        let mut found: Vec<_> = state
            .occurrences
            .values()
            .filter(|occ| occ.template_ref == Some(id))
            .cloned()
            .collect();
        found.sort_by_key(|occ| occ.occurrence_date);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskAttributes;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn template(cursor: NaiveDate) -> TemplateTask {
        let mut series = SeriesState::inactive();
        series.schedule(Some(cursor));
        TemplateTask {
            id: TemplateId::generate(),
            name: "Water plants".to_string(),
            attributes: TaskAttributes::default(),
            subtasks: vec![],
            rule: RecurrenceRule::daily(1, cursor),
            series,
        }
    }

    #[tokio::test]
    async fn duplicate_occurrence_is_rejected() {
        let store = InMemoryTemplateStore::new();
        let tmpl = template(date(2024, 1, 1));
        store.insert_template(tmpl.clone()).await.unwrap();

        let new = NewOccurrence::from_template(&tmpl, date(2024, 1, 1));
        store.create_occurrence(new.clone()).await.unwrap();
        let err = store.create_occurrence(new).await.unwrap_err();

        assert_eq!(
            err,
            StoreError::DuplicateOccurrence {
                template_id: tmpl.id,
                date: date(2024, 1, 1),
            }
        );
        assert_eq!(store.occurrences_of(tmpl.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn claim_is_compare_and_set() {
        let store = InMemoryTemplateStore::new();
        let tmpl = template(date(2024, 1, 1));
        store.insert_template(tmpl.clone()).await.unwrap();

        let first = store
            .claim_cursor(tmpl.id, date(2024, 1, 1), date(2024, 1, 2))
            .await
            .unwrap();
        let second = store
            .claim_cursor(tmpl.id, date(2024, 1, 1), date(2024, 1, 2))
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
    }

    #[tokio::test]
    async fn due_templates_filters_by_cursor() {
        let store = InMemoryTemplateStore::new();
        let early = template(date(2024, 1, 1));
        let late = template(date(2024, 1, 10));
        store.insert_template(early.clone()).await.unwrap();
        store.insert_template(late).await.unwrap();

        let due = store.due_templates(date(2024, 1, 5)).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, early.id);
    }

    #[tokio::test]
    async fn deleting_template_orphans_occurrences() {
        let store = InMemoryTemplateStore::new();
        let tmpl = template(date(2024, 1, 1));
        store.insert_template(tmpl.clone()).await.unwrap();
        store
            .create_occurrence(NewOccurrence::from_template(&tmpl, date(2024, 1, 1)))
            .await
            .unwrap();

        store.delete_template(tmpl.id).await.unwrap();

        let all = store.all_occurrences().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].template_ref, None);
        assert_eq!(all[0].parent, None);
        assert_eq!(store.template_count().await, 0);
        assert_eq!(
            store.get_template(tmpl.id).await.unwrap_err(),
            StoreError::TemplateNotFound(tmpl.id)
        );
    }

    #[tokio::test]
    async fn unknown_template_is_not_found() {
        let store = InMemoryTemplateStore::new();
        let id = TemplateId::generate();
        assert_eq!(
            store.end_series(id).await.unwrap_err(),
            StoreError::TemplateNotFound(id)
        );
    }
}
