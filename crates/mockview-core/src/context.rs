use chrono::Utc;
use mockview_schema::{ChatMessage, Role};

/// Append-only transcript plus the set of topics already discussed.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    messages: Vec<ChatMessage>,
    topics: Vec<String>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, role: Role, text: impl Into<String>) {
        self.messages.push(ChatMessage {
            role,
            text: text.into(),
            at: Utc::now(),
        });
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Transcript rendered as `Speaker: text` blocks.
    pub fn history(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role.speaker(), m.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Records a topic once, case-insensitively. Returns false for duplicates and blanks.
    pub fn add_topic(&mut self, topic: &str) -> bool {
        let key = topic.trim().to_lowercase();
        if key.is_empty() || self.topics.contains(&key) {
            return false;
        }
        self.topics.push(key);
        true
    }

    /// Discussed topics in the order they first came up.
    pub fn topics(&self) -> &[String] {
        &self.topics
    }
}
