//! NoteSink port - テンプレートへのメモ投稿（chatter 相当）
//!
//! Fire-and-forget: 失敗しても永続化済みの状態は戻さない。

use async_trait::async_trait;

use crate::domain::{NoteError, TemplateId};

#[async_trait]
pub trait NoteSink: Send + Sync {
    async fn post_note(&self, target: TemplateId, message: &str) -> Result<(), NoteError>;
}
