use std::sync::Arc;

use chrono::NaiveDate;
use recur_core::domain::{RecurrenceRule, TaskAttributes, TemplateDraft};
use recur_core::impls::{InMemoryTemplateStore, MemoryNoteSink};
use recur_core::ports::{SystemClock, TemplateStore, UlidGenerator};
use recur_core::{PassReport, RecurrenceEditor, RecurrenceEngine};
use tokio::sync::Barrier;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn draft(name: &str, rule: RecurrenceRule) -> TemplateDraft {
    TemplateDraft {
        name: name.to_string(),
        attributes: TaskAttributes::default(),
        subtasks: vec![],
        recurring: true,
        rule,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_workers_create_each_occurrence_once() {
    let store = InMemoryTemplateStore::new();
    let notes = MemoryNoteSink::new();
    let editor = RecurrenceEditor::new(
        Arc::new(store.clone()),
        Arc::new(notes.clone()),
        Arc::new(UlidGenerator::new(SystemClock)),
        100,
    );

    let mut ids = Vec::new();
    for i in 0..20 {
        let template = editor
            .create_template(draft(
                &format!("task {i}"),
                RecurrenceRule::daily(1, date(2024, 1, 1)),
            ))
            .await
            .unwrap();
        ids.push(template.id);
    }

    let engines: Vec<_> = (0..4)
        .map(|n| {
            Arc::new(
                RecurrenceEngine::new(Arc::new(store.clone()), Arc::new(notes.clone()))
                    .with_worker_name(format!("worker-{n}")),
            )
        })
        .collect();

    let handles: Vec<_> = engines
        .iter()
        .map(|engine| {
            let engine = Arc::clone(engine);
            tokio::spawn(async move { engine.run_recurrence_pass(date(2024, 1, 1)).await })
        })
        .collect();

    let mut total = PassReport::default();
    for handle in handles {
        total.merge(&handle.await.unwrap());
    }

    assert_eq!(total.materialized, 20);
    assert_eq!(total.duplicates, 0);
    assert_eq!(total.failed, 0);
    // every selected snapshot either won its claim or lost it cleanly
    assert_eq!(total.materialized + total.conflicts, total.selected);
    for id in ids {
        let occurrences = store.occurrences_of(id).await.unwrap();
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].occurrence_date, date(2024, 1, 1));
        let template = store.get_template(id).await.unwrap();
        assert_eq!(template.series.cursor(), Some(date(2024, 1, 2)));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn same_snapshot_is_claimed_exactly_once() {
    let store = InMemoryTemplateStore::new();
    let notes = MemoryNoteSink::new();
    let editor = RecurrenceEditor::new(
        Arc::new(store.clone()),
        Arc::new(notes.clone()),
        Arc::new(UlidGenerator::new(SystemClock)),
        100,
    );
    let template = editor
        .create_template(draft(
            "Rent",
            RecurrenceRule::monthly(1, date(2024, 1, 31)).after(2),
        ))
        .await
        .unwrap();

    let a = Arc::new(RecurrenceEngine::new(
        Arc::new(store.clone()),
        Arc::new(notes.clone()),
    ));
    let b = Arc::new(RecurrenceEngine::new(
        Arc::new(store.clone()),
        Arc::new(notes.clone()),
    ));

    // both workers read the template before either claims it
    let snapshot = store.due_templates(date(2024, 1, 31)).await.unwrap();
    assert_eq!(snapshot.len(), 1);
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [Arc::clone(&a), Arc::clone(&b)]
        .into_iter()
        .map(|engine| {
            let barrier = Arc::clone(&barrier);
            let snapshot = snapshot[0].clone();
            tokio::spawn(async move {
                barrier.wait().await;
                engine.process_template(&snapshot, date(2024, 1, 31)).await
            })
        })
        .collect();

    let mut report = PassReport::default();
    for handle in handles {
        report.record(&handle.await.unwrap().unwrap());
    }

    assert_eq!(report.materialized, 1);
    assert_eq!(report.conflicts, 1);
    assert_eq!(report.duplicates, 0);
    assert_eq!(store.occurrences_of(template.id).await.unwrap().len(), 1);
    assert_eq!(
        store.get_template(template.id).await.unwrap().series.remaining(),
        Some(1)
    );

    // Feb 29 then stop
    a.run_recurrence_pass(date(2024, 2, 29)).await;
    b.run_recurrence_pass(date(2024, 3, 29)).await;
    let dates: Vec<_> = store
        .occurrences_of(template.id)
        .await
        .unwrap()
        .into_iter()
        .map(|occ| occ.occurrence_date)
        .collect();
    assert_eq!(dates, vec![date(2024, 1, 31), date(2024, 2, 29)]);
    assert!(!store.get_template(template.id).await.unwrap().series.is_active());
}
