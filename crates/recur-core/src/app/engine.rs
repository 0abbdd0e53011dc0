//! RecurrenceEngine - 定期タスク生成パス
//!
//! # フロー（テンプレートごと）
//! 1. `After` で残数が未設定なら初期化
//! 2. 次回日付を計算（無ければ series 終了）
//! 3. `claim_cursor` で cursor を compare-and-set（負けたらスキップ）
//! 4. occurrence を作成（重複は成功扱い）
//! 5. NoteSink にメモ（best-effort）
//! 6. 停止条件を評価（Until 超過 / 残数 0）
//!
//! 1 テンプレートの失敗は `PassError` としてログに残し、バッチは続行します。

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::app::report::{PassReport, TemplateOutcome};
use crate::domain::{
    DomainEvent, EndReason, NewOccurrence, PassError, PassStage, StopPolicy, StoreError,
    TemplateId, TemplateTask,
};
use crate::ports::{NoteSink, TemplateStore};
use crate::recurrence::{is_valid, next_occurrence};

pub struct RecurrenceEngine {
    store: Arc<dyn TemplateStore>,
    notes: Arc<dyn NoteSink>,
    worker: String,
}

impl RecurrenceEngine {
    pub fn new(store: Arc<dyn TemplateStore>, notes: Arc<dyn NoteSink>) -> Self {
        Self {
            store,
            notes,
            worker: "engine".to_string(),
        }
    }

    /// Label used in log lines when several engines share a store.
    pub fn with_worker_name(mut self, worker: impl Into<String>) -> Self {
        self.worker = worker.into();
        self
    }

    /// Materialize at most one occurrence per due template.
    ///
    /// Safe to run concurrently from any number of workers: each template is
    /// claimed with a compare-and-set on its cursor, and the store rejects a
    /// second occurrence for the same date.
    pub async fn run_recurrence_pass(&self, today: NaiveDate) -> PassReport {
        let mut report = PassReport::default();

        let due = match self.store.due_templates(today).await {
            Ok(due) => due,
            Err(err) => {
                error!(worker = %self.worker, %today, error = %err, "failed to select due templates");
                report.select_failed = true;
                return report;
            }
        };
        report.selected = due.len();
        info!(worker = %self.worker, %today, count = due.len(), "recurrence pass started");

        for template in &due {
            debug!(worker = %self.worker, template_id = %template.id, "processing template");
            match self.process_template(template, today).await {
                Ok(outcome) => report.record(&outcome),
                Err(err) => {
                    error!(
                        worker = %self.worker,
                        template_id = %err.template_id,
                        stage = ?err.stage,
                        error = %err.source,
                        "recurrence failed for template"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            worker = %self.worker,
            %today,
            selected = report.selected,
            materialized = report.materialized,
            duplicates = report.duplicates,
            conflicts = report.conflicts,
            terminated = report.terminated,
            failed = report.failed,
            "recurrence pass finished"
        );
        report
    }

    /// Run the claim-and-generate protocol for one template snapshot.
    pub async fn process_template(
        &self,
        template: &TemplateTask,
        today: NaiveDate,
    ) -> Result<TemplateOutcome, PassError> {
        let id = template.id;
        let Some(cursor) = template.series.cursor().filter(|_| template.series.is_due(today))
        else {
            return Ok(TemplateOutcome::NotDue);
        };

        if !is_valid(&template.rule) {
            warn!(template_id = %id, "invalid recurrence rule, ending series");
            return self.terminate(id, EndReason::NoNextDate).await;
        }

        if let Some(count) = template.rule.repetitions()
            && template.series.remaining().is_none()
        {
            let remaining = self
                .store
                .init_remaining(id, count)
                .await
                .map_err(|err| PassError::new(id, PassStage::InitRemaining, err))?;
            if remaining == 0 {
                return self.terminate(id, EndReason::RepetitionsExhausted).await;
            }
        } else if template.series.remaining() == Some(0) {
            return self.terminate(id, EndReason::RepetitionsExhausted).await;
        }

        if let Some(until) = template.rule.until_date()
            && cursor > until
        {
            return self.terminate(id, EndReason::UntilPassed).await;
        }

        let Some(next) = next_occurrence(&template.rule, cursor) else {
            return self.terminate(id, EndReason::NoNextDate).await;
        };

        let claimed = self
            .store
            .claim_cursor(id, cursor, next)
            .await
            .map_err(|err| PassError::new(id, PassStage::Claim, err))?;
        if !claimed {
            info!(worker = %self.worker, template_id = %id, %cursor, "already claimed by another worker");
            return Ok(TemplateOutcome::ClaimConflict);
        }

        let created = match self
            .store
            .create_occurrence(NewOccurrence::from_template(template, cursor))
            .await
        {
            Ok(occurrence) => Some(occurrence),
            Err(StoreError::DuplicateOccurrence { .. }) => {
                info!(template_id = %id, date = %cursor, "occurrence already exists");
                None
            }
            Err(err) => {
                self.release_claim(id, next, cursor).await;
                return Err(PassError::new(id, PassStage::Materialize, err));
            }
        };

        if let Some(occurrence) = &created {
            info!(
                worker = %self.worker,
                template_id = %id,
                occurrence_id = %occurrence.id,
                date = %cursor,
                "occurrence created"
            );
            self.post(
                id,
                DomainEvent::OccurrenceCreated {
                    occurrence_id: occurrence.id,
                    name: occurrence.name.clone(),
                    date: cursor,
                },
            )
            .await;
        }

        let ended = self.evaluate_stop(template, next).await?;
        Ok(match created {
            Some(occurrence) => TemplateOutcome::Materialized {
                occurrence_id: occurrence.id,
                date: cursor,
                ended,
            },
            None => TemplateOutcome::AlreadyMaterialized {
                date: cursor,
                ended,
            },
        })
    }

    async fn evaluate_stop(
        &self,
        template: &TemplateTask,
        next: NaiveDate,
    ) -> Result<Option<EndReason>, PassError> {
        let id = template.id;
        let reason = match template.rule.stop {
            StopPolicy::Until(until) if next > until => Some(EndReason::UntilPassed),
            StopPolicy::After(_) => {
                let left = self
                    .store
                    .consume_repetition(id)
                    .await
                    .map_err(|err| PassError::new(id, PassStage::StopEvaluation, err))?;
                debug!(template_id = %id, remaining = left, "repetition consumed");
                (left == 0).then_some(EndReason::RepetitionsExhausted)
            }
            _ => None,
        };

        if let Some(reason) = reason {
            self.store
                .end_series(id)
                .await
                .map_err(|err| PassError::new(id, PassStage::StopEvaluation, err))?;
            self.announce_end(id, reason).await;
        }
        Ok(reason)
    }

    async fn terminate(
        &self,
        id: TemplateId,
        reason: EndReason,
    ) -> Result<TemplateOutcome, PassError> {
        self.store
            .end_series(id)
            .await
            .map_err(|err| PassError::new(id, PassStage::Terminate, err))?;
        self.announce_end(id, reason).await;
        Ok(TemplateOutcome::Ended(reason))
    }

    async fn announce_end(&self, id: TemplateId, reason: EndReason) {
        info!(template_id = %id, reason = ?reason, "recurrence series ended");
        self.post(id, DomainEvent::SeriesEnded { reason }).await;
    }

    /// Put the cursor back after a failed insert so the next pass retries the
    /// same date. Loses quietly if someone else already moved it.
    async fn release_claim(&self, id: TemplateId, claimed: NaiveDate, previous: NaiveDate) {
        match self.store.claim_cursor(id, claimed, previous).await {
            Ok(true) => debug!(template_id = %id, %previous, "claim released"),
            Ok(false) => warn!(template_id = %id, %previous, "claim could not be released"),
            Err(err) => warn!(template_id = %id, error = %err, "claim release failed"),
        }
    }

    async fn post(&self, id: TemplateId, event: DomainEvent) {
        if let Err(err) = self.notes.post_note(id, &event.to_string()).await {
            warn!(template_id = %id, error = %err, "failed to post note");
        }
    }
}
