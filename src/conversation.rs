use crate::gemini::HistoryTurn;
use crate::state::Message;

/// Number of prior messages sent back to the provider with each question
pub const HISTORY_LIMIT: usize = 10;

/// Append-only, insertion-ordered list of messages
#[derive(Debug, Default, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The trailing `limit` messages, oldest first, in provider shape
    pub fn history(&self, limit: usize) -> Vec<HistoryTurn> {
        let start = self.messages.len().saturating_sub(limit);
        self.messages[start..]
            .iter()
            .map(|m| HistoryTurn {
                role: m.role,
                text: m.content.clone(),
            })
            .collect()
    }
}
