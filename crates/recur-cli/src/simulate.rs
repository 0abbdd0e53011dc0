//! Replay recurrence passes over a date range on an in-memory store.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use tracing::info;

use recur_core::domain::{Occurrence, TemplateDraft};
use recur_core::impls::{InMemoryTemplateStore, MemoryNoteSink};
use recur_core::ports::{IdGenerator, NoteSink, TemplateStore};
use recur_core::{PassReport, RecurrenceEditor, RecurrenceEngine};

pub fn load_drafts(path: &Path) -> anyhow::Result<Vec<TemplateDraft>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid template file {}", path.display()))
}

/// Insert `drafts` through the editor so each gets its cursor and summary.
pub async fn seed(
    store: Arc<dyn TemplateStore>,
    notes: Arc<dyn NoteSink>,
    ids: Arc<dyn IdGenerator>,
    preview_limit: usize,
    drafts: Vec<TemplateDraft>,
) -> anyhow::Result<usize> {
    let editor = RecurrenceEditor::new(store, notes, ids, preview_limit);
    let count = drafts.len();
    for draft in drafts {
        let template = editor.create_template(draft).await?;
        info!(template_id = %template.id, name = %template.name, "template loaded");
    }
    Ok(count)
}

pub struct Simulation {
    pub store: InMemoryTemplateStore,
    pub notes: MemoryNoteSink,
    pub engines: usize,
}

impl Simulation {
    /// Run one pass per day from `from` to `to` (inclusive), `engines` racing
    /// each day. Returns the merged report per day.
    pub async fn run(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<(NaiveDate, PassReport)>> {
        if to < from {
            bail!("end date {to} is before start date {from}");
        }

        let engines: Vec<_> = (0..self.engines.max(1))
            .map(|n| {
                Arc::new(
                    RecurrenceEngine::new(
                        Arc::new(self.store.clone()),
                        Arc::new(self.notes.clone()),
                    )
                    .with_worker_name(format!("sim-{n}")),
                )
            })
            .collect();

        let mut reports = Vec::new();
        for day in from.iter_days().take_while(|day| *day <= to) {
            let handles: Vec<_> = engines
                .iter()
                .map(|engine| {
                    let engine = Arc::clone(engine);
                    tokio::spawn(async move { engine.run_recurrence_pass(day).await })
                })
                .collect();

            let mut merged = PassReport::default();
            for handle in handles {
                merged.merge(&handle.await.context("simulation worker panicked")?);
            }
            reports.push((day, merged));
        }
        Ok(reports)
    }

    pub async fn occurrences(&self) -> Vec<Occurrence> {
        self.store.all_occurrences().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recur_core::ports::{SystemClock, UlidGenerator};

    const DRAFTS: &str = r#"[
        {
            "name": "Water plants",
            "rule": { "interval": 2, "unit": "day", "start_date": "2024-01-01",
                      "stop": { "type": "after", "value": 3 } }
        },
        {
            "name": "Team sync",
            "attributes": { "tags": ["work"] },
            "rule": { "interval": 1, "unit": "week", "weekdays": ["Mon", "Thu"],
                      "start_date": "2024-01-01" }
        }
    ]"#;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn replay_creates_each_date_once() {
        let drafts: Vec<TemplateDraft> = serde_json::from_str(DRAFTS).unwrap();
        let sim = Simulation {
            store: InMemoryTemplateStore::new(),
            notes: MemoryNoteSink::new(),
            engines: 3,
        };
        seed(
            Arc::new(sim.store.clone()),
            Arc::new(sim.notes.clone()),
            Arc::new(UlidGenerator::new(SystemClock)),
            100,
            drafts,
        )
        .await
        .unwrap();

        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
        let reports = sim.run(from, to).await.unwrap();

        assert_eq!(reports.len(), 14);
        let total: usize = reports.iter().map(|(_, r)| r.materialized).sum();
        // 3 waterings + Mon/Thu over two weeks
        assert_eq!(total, 3 + 4);
        assert_eq!(sim.occurrences().await.len(), 7);
    }

    #[tokio::test]
    async fn reversed_range_is_rejected() {
        let sim = Simulation {
            store: InMemoryTemplateStore::new(),
            notes: MemoryNoteSink::new(),
            engines: 1,
        };
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(sim.run(day, day.pred_opt().unwrap()).await.is_err());
    }
}
