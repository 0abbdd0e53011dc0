//! Trigger - 定期的にパスを起動するワーカー群
//!
//! - `shutdown_tx` に true を送るとワーカー全体が止まる
//! - 実行中のパスは中断せず、次の tick を取らなくなるだけ

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use recur_core::RecurrenceEngine;
use recur_core::ports::{Clock, NoteSink, TemplateStore};

pub struct TriggerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl TriggerGroup {
    /// Spawn `n` workers sharing one store, each running a pass every `period`.
    pub fn spawn(
        n: usize,
        period: Duration,
        store: Arc<dyn TemplateStore>,
        notes: Arc<dyn NoteSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let engine = RecurrenceEngine::new(Arc::clone(&store), Arc::clone(&notes))
                .with_worker_name(format!("trigger-{worker_id}"));
            let clock = Arc::clone(&clock);
            let mut rx = shutdown_rx.clone();

            joins.push(tokio::spawn(async move {
                trigger_loop(worker_id, engine, clock, period, &mut rx).await;
            }));
        }

        Self { shutdown_tx, joins }
    }

    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            let _ = join.await;
        }
    }
}

async fn trigger_loop(
    worker_id: usize,
    engine: RecurrenceEngine,
    clock: Arc<dyn Clock>,
    period: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        let today = clock.today();
        debug!(worker_id, %today, "trigger fired");
        engine.run_recurrence_pass(today).await;
    }

    info!(worker_id, "trigger stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use recur_core::domain::{RecurrenceRule, SeriesState, TaskAttributes, TemplateId, TemplateTask};
    use recur_core::impls::{InMemoryTemplateStore, MemoryNoteSink};
    use recur_core::ports::FixedClock;

    #[tokio::test]
    async fn workers_fire_then_stop_on_shutdown() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let store = InMemoryTemplateStore::new();
        let mut series = SeriesState::inactive();
        series.schedule(Some(today));
        let template = TemplateTask {
            id: TemplateId::generate(),
            name: "Ping".to_string(),
            attributes: TaskAttributes::default(),
            subtasks: vec![],
            rule: RecurrenceRule::daily(1, today),
            series,
        };
        store.insert_template(template.clone()).await.unwrap();

        let group = TriggerGroup::spawn(
            3,
            Duration::from_millis(10),
            Arc::new(store.clone()),
            Arc::new(MemoryNoteSink::new()),
            Arc::new(FixedClock::on(today)),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        group.shutdown_and_join().await;

        assert_eq!(store.occurrences_of(template.id).await.unwrap().len(), 1);
    }
}
