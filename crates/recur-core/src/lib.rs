//! recur-core
//!
//! Recurring task templates: rule arithmetic, a concurrency-safe generation
//! pass, and the editing operations around them.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, rule, template, occurrence, events, errors）
//! - **recurrence**: 純粋関数（次回日付計算・検証・プレビュー・要約）
//! - **ports**: 抽象化レイヤー（TemplateStore, NoteSink, Clock, IdGenerator）
//! - **impls**: 実装（InMemory / Tracing / Postgres）
//! - **app**: RecurrenceEngine と RecurrenceEditor
//! - **config**: 環境変数からの設定

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod recurrence;

pub use app::{PassReport, RecurrenceEditor, RecurrenceEngine, SeriesStatus};
pub use config::RecurConfig;
