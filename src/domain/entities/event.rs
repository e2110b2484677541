use chrono::{DateTime, Utc};

use super::ChatUser;

/// One inbound message event from the chat platform
#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub message_id: String,
    pub channel_id: String,
    pub author: ChatUser,
    pub content: String,
    /// True when the message arrived in a private (direct) conversation
    pub is_private: bool,
    pub timestamp: DateTime<Utc>,
}

impl ChatEvent {
    pub fn new(
        message_id: impl Into<String>,
        channel_id: impl Into<String>,
        author: ChatUser,
        content: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            channel_id: channel_id.into(),
            author,
            content: content.into(),
            is_private: false,
            timestamp: Utc::now(),
        }
    }

    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
