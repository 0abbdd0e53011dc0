//! NoteSink implementations.
//!
//! - **TracingNoteSink**: メモをログに流すだけ（デフォルト）
//! - **MemoryNoteSink**: 投稿内容を保持する（テスト・シミュレーション用）

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{NoteError, TemplateId};
use crate::ports::NoteSink;

/// Writes every note to the log at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNoteSink;

#[async_trait]
impl NoteSink for TracingNoteSink {
    async fn post_note(&self, target: TemplateId, message: &str) -> Result<(), NoteError> {
        tracing::info!(template_id = %target, note = %message, "note posted");
        Ok(())
    }
}

/// Keeps posted notes in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryNoteSink {
    notes: Arc<Mutex<Vec<(TemplateId, String)>>>,
}

impl MemoryNoteSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn notes(&self) -> Vec<(TemplateId, String)> {
        self.notes.lock().await.clone()
    }

    pub async fn notes_for(&self, target: TemplateId) -> Vec<String> {
        self.notes
            .lock()
            .await
            .iter()
            .filter(|(id, _)| *id == target)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

#[async_trait]
impl NoteSink for MemoryNoteSink {
    async fn post_note(&self, target: TemplateId, message: &str) -> Result<(), NoteError> {
        self.notes.lock().await.push((target, message.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_sink_groups_by_target() {
        let sink = MemoryNoteSink::new();
        let a = TemplateId::generate();
        let b = TemplateId::generate();

        sink.post_note(a, "first").await.unwrap();
        sink.post_note(b, "other").await.unwrap();
        sink.post_note(a, "second").await.unwrap();

        assert_eq!(sink.notes_for(a).await, vec!["first", "second"]);
        assert_eq!(sink.notes().await.len(), 3);
    }
}
