//! App - アプリケーション層
//!
//! ports を組み合わせて定期タスクの生成と編集を実装します。
//!
//! # 主要コンポーネント
//! - **RecurrenceEngine**: 期限の来たテンプレートから occurrence を生成するパス
//! - **RecurrenceEditor**: テンプレートの作成・ルール変更・プレビュー
//! - **PassReport / SeriesStatus**: パス結果と series の状態

pub mod editor;
pub mod engine;
pub mod report;

pub use self::editor::{EditorError, RecurrenceEditor};
pub use self::engine::RecurrenceEngine;
pub use self::report::{PassReport, SeriesStatus, TemplateOutcome, series_status};
