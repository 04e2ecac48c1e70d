// src/session.rs

//! In-memory chat transcript for one interactive session.
//!
//! The transcript is never persisted. Asking the assistant cannot fail from
//! the caller's point of view: any relay error becomes an assistant line
//! starting with `Error: `.

use crate::assistant::AssistantRelay;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
}

#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Record the user's input, ask the assistant, record the answer.
    ///
    /// Blank input is ignored and returns `None`.
    pub async fn ask(&mut self, assistant: &AssistantRelay, input: &str) -> Option<&ChatMessage> {
        if input.trim().is_empty() {
            return None;
        }

        self.push(Sender::User, input.to_string());

        let text = match assistant.ask(input).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "assistant call failed");
                format!("Error: {}", e)
            }
        };

        self.push(Sender::Assistant, text);
        self.messages.last()
    }

    fn push(&mut self, sender: Sender, text: String) {
        self.messages.push(ChatMessage { text, sender });
    }
}
