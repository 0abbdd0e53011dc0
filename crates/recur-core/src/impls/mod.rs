//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryTemplateStore**: 開発用・テスト用の正本
//! - **TracingNoteSink / MemoryNoteSink**: メモの出力先
//! - **PgTemplateStore**: PostgreSQL 実装（`postgres` feature）

pub mod inmem_store;
pub mod notes;
#[cfg(feature = "postgres")]
pub mod pg_store;

pub use self::inmem_store::InMemoryTemplateStore;
pub use self::notes::{MemoryNoteSink, TracingNoteSink};
#[cfg(feature = "postgres")]
pub use self::pg_store::PgTemplateStore;
