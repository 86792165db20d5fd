//! One planning turn: record the user message, call the upstream model with
//! the full conversation so far, record and return the reply.

use crate::history::HistoryStore;
use crate::model::{ChatMessage, ModelClient, ModelError};

/// Run one planning turn for a conversation. On upstream failure the user
/// message stays in the history, so a retried turn carries it.
pub async fn run_turn(
    history: &HistoryStore,
    conversation_id: &str,
    model_client: &ModelClient,
    model: &str,
    message: &str,
) -> Result<String, ModelError> {
    history.push(conversation_id, ChatMessage::user(message)).await;
    let messages = history.messages(conversation_id).await;
    log::info!(
        "planner: turn for {} ({} message(s), model {})",
        conversation_id,
        messages.len(),
        model
    );
    let reply = model_client.chat(model, messages).await?;
    history
        .push(conversation_id, ChatMessage::assistant(reply.clone()))
        .await;
    Ok(reply)
}
