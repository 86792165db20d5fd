//! Client-side conversation state for the chat screen.
//!
//! Owns the ordered message log, the single in-flight-turn flag, and the
//! per-screen conversation id sent with every request so the server can
//! correlate turns. Pure state; transport is the caller's concern.

use crate::api::ApiError;

/// Fallback assistant message when a chat turn fails (network error, non-2xx
/// status, malformed payload).
pub const FALLBACK_NOTICE: &str = "⚠️ Unable to connect to the AI planner.";

/// A single chat message (role + content). Immutable once appended; ordering
/// is insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Ordered message log, pending-turn flag, and stable conversation id for one
/// chat screen. Created when the screen opens and dropped wholesale when it
/// closes; nothing is persisted.
#[derive(Debug, Clone)]
pub struct Conversation {
    id: String,
    messages: Vec<Message>,
    pending: bool,
}

impl Conversation {
    /// Fresh conversation with a generated id and an empty log.
    pub fn new() -> Self {
        Self {
            id: format!("conv-{}", uuid::Uuid::new_v4()),
            messages: Vec::new(),
            pending: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// True while a turn is outstanding; new submissions are ignored until
    /// the turn resolves.
    pub fn pending(&self) -> bool {
        self.pending
    }

    /// Accept a submission: trims the input, appends the user message, and
    /// marks the turn pending. Returns the text to send, or None when the
    /// input is blank or a turn is already outstanding (no request is issued
    /// and the log is untouched in that case).
    pub fn submit(&mut self, input: &str) -> Option<String> {
        if self.pending {
            return None;
        }
        let text = input.trim();
        if text.is_empty() {
            return None;
        }
        self.messages.push(Message::user(text));
        self.pending = true;
        Some(text.to_string())
    }

    /// Resolve the outstanding turn: appends exactly one assistant message
    /// (the reply, or the fallback notice on error) and clears the flag.
    /// No-op when no turn is outstanding.
    pub fn resolve(&mut self, result: Result<String, ApiError>) {
        if !self.pending {
            return;
        }
        let content = match result {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("chat turn failed: {}", e);
                FALLBACK_NOTICE.to_string()
            }
        };
        self.messages.push(Message::assistant(content));
        self.pending = false;
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error() -> ApiError {
        ApiError::Api {
            status: 502,
            detail: "AI response failed".to_string(),
        }
    }

    #[test]
    fn successful_exchanges_alternate_in_order() {
        let mut c = Conversation::new();
        for i in 0..3 {
            let sent = c.submit(&format!("goal {}", i)).expect("accepted");
            assert_eq!(sent, format!("goal {}", i));
            assert!(c.pending());
            c.resolve(Ok(format!("plan {}", i)));
            assert!(!c.pending());
        }
        assert_eq!(c.messages().len(), 6);
        for (i, pair) in c.messages().chunks(2).enumerate() {
            assert_eq!(pair[0], Message::user(format!("goal {}", i)));
            assert_eq!(pair[1], Message::assistant(format!("plan {}", i)));
        }
    }

    #[test]
    fn submit_while_pending_is_a_no_op() {
        let mut c = Conversation::new();
        assert!(c.submit("first").is_some());
        let len = c.messages().len();
        assert!(c.submit("second").is_none());
        assert_eq!(c.messages().len(), len);
        assert!(c.pending());
    }

    #[test]
    fn blank_input_is_a_no_op() {
        let mut c = Conversation::new();
        assert!(c.submit("").is_none());
        assert!(c.submit("   ").is_none());
        assert!(c.submit("\n\t").is_none());
        assert!(c.messages().is_empty());
        assert!(!c.pending());
    }

    #[test]
    fn submission_text_is_trimmed() {
        let mut c = Conversation::new();
        let sent = c.submit("  Plan a trip  ").expect("accepted");
        assert_eq!(sent, "Plan a trip");
        assert_eq!(c.messages()[0], Message::user("Plan a trip"));
    }

    #[test]
    fn id_is_stable_within_one_conversation_and_differs_across() {
        let mut c = Conversation::new();
        let id = c.id().to_string();
        c.submit("one").unwrap();
        c.resolve(Ok("reply".to_string()));
        c.submit("two").unwrap();
        assert_eq!(c.id(), id);
        assert_ne!(Conversation::new().id(), id);
    }

    #[test]
    fn failure_appends_one_fallback_message_and_clears_the_flag() {
        let mut c = Conversation::new();
        c.submit("Plan a trip").unwrap();
        c.resolve(Err(server_error()));
        assert_eq!(c.messages().len(), 2);
        assert_eq!(c.messages()[1], Message::assistant(FALLBACK_NOTICE));
        assert!(!c.pending());
    }

    #[test]
    fn resolve_without_outstanding_turn_is_a_no_op() {
        let mut c = Conversation::new();
        c.resolve(Ok("stray reply".to_string()));
        assert!(c.messages().is_empty());
        c.submit("hi").unwrap();
        c.resolve(Ok("reply".to_string()));
        c.resolve(Ok("duplicate".to_string()));
        assert_eq!(c.messages().len(), 2);
    }

    #[test]
    fn successful_turn_matches_submission() {
        let mut c = Conversation::new();
        c.submit("Plan a trip").unwrap();
        assert_eq!(c.messages(), [Message::user("Plan a trip")]);
        assert!(c.pending());
        c.resolve(Ok("Here is a plan...".to_string()));
        assert_eq!(
            c.messages(),
            [
                Message::user("Plan a trip"),
                Message::assistant("Here is a plan..."),
            ]
        );
        assert!(!c.pending());
    }
}
