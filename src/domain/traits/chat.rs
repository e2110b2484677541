use async_trait::async_trait;

use crate::application::errors::ChatError;
use crate::domain::entities::ChatUser;

/// ChatClient trait - abstraction for chat-platform adapters
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a message to a channel, returning the platform message id
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<String, ChatError>;

    /// Send a direct message to a user
    async fn send_direct(&self, user_id: &str, text: &str) -> Result<String, ChatError>;

    /// Delete a previously sent message
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), ChatError>;

    /// Resolve a user by id, falling back to a platform fetch when not cached
    async fn resolve_user(&self, user_id: &str) -> Result<ChatUser, ChatError>;

    /// Get bot identity
    fn bot_info(&self) -> BotInfo;
}

/// Bot identity on the chat platform
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
    pub username: String,
}
