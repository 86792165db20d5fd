//! Server-side conversation history for the planning loop.
//!
//! Histories are keyed by the client's conversation id; the first touch of an
//! id seeds the planner system prompt so every upstream call carries it.
//! Process lifetime only — nothing is persisted.

use crate::model::ChatMessage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default system prompt seeded into every conversation.
pub const SYSTEM_PROMPT: &str = "You are a Goal Planner AI. \
    Always respond in bullet points or numbered steps. \
    Keep answers short and structured.";

/// In-memory store of per-conversation message histories.
pub struct HistoryStore {
    system_prompt: String,
    inner: Arc<RwLock<HashMap<String, Vec<ChatMessage>>>>,
}

impl HistoryStore {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Append a message, seeding the system prompt when the id is new.
    pub async fn push(&self, conversation_id: &str, message: ChatMessage) {
        let mut g = self.inner.write().await;
        let entry = g
            .entry(conversation_id.to_string())
            .or_insert_with(|| vec![ChatMessage::system(self.system_prompt.clone())]);
        entry.push(message);
    }

    /// Snapshot of the conversation so far (system prompt included). Empty
    /// for an id that has never been touched.
    pub async fn messages(&self, conversation_id: &str) -> Vec<ChatMessage> {
        self.inner
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(SYSTEM_PROMPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_touch_seeds_the_system_prompt_once() {
        let store = HistoryStore::default();
        store.push("c1", ChatMessage::user("plan a trip")).await;
        store.push("c1", ChatMessage::assistant("- step one")).await;
        let messages = store.messages("c1").await;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].role, "assistant");
        let system_count = messages.iter().filter(|m| m.role == "system").count();
        assert_eq!(system_count, 1);
    }

    #[tokio::test]
    async fn conversations_are_isolated_by_id() {
        let store = HistoryStore::default();
        store.push("c1", ChatMessage::user("one")).await;
        store.push("c2", ChatMessage::user("two")).await;
        assert_eq!(store.messages("c1").await.len(), 2);
        assert_eq!(store.messages("c2").await.len(), 2);
        assert!(store.messages("c3").await.is_empty());
    }
}
