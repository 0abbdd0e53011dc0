//! Ports - 抽象化レイヤー
//!
//! このコアが利用する外部コラボレーターの trait です。
//! 実装は `impls`（InMemory / Tracing / Postgres）にあります。

pub mod clock;
pub mod id_generator;
pub mod note_sink;
pub mod template_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::note_sink::NoteSink;
pub use self::template_store::TemplateStore;
