//! Console adapter for development/testing

use async_trait::async_trait;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use crate::application::errors::ChatError;
use crate::domain::entities::{ChatEvent, ChatUser};
use crate::domain::traits::{BotInfo, ChatClient};

/// Channel id used for simulated channel traffic
pub const CONSOLE_CHANNEL: &str = "console";
/// Channel id used for simulated private conversations
pub const CONSOLE_DM: &str = "console-dm";

/// Console adapter for local development.  Each stdin line becomes a
/// channel message; a line starting with `#dm ` simulates a private
/// conversation instead.
pub struct ConsoleAdapter {
    info: BotInfo,
}

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self {
            info: BotInfo {
                id: "console-bot".to_string(),
                name: "discord-relay".to_string(),
                username: "console".to_string(),
            },
        }
    }

    /// Read stdin lines and forward them as chat events
    pub async fn run(&self, events: mpsc::Sender<ChatEvent>) {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        let author = ChatUser::new("console-user", "console-user");
        let mut counter: u64 = 0;

        while let Ok(Some(line)) = lines.next_line().await {
            if line.is_empty() {
                continue;
            }
            counter += 1;
            let message_id = format!("console-{}-{}", uuid::Uuid::new_v4(), counter);

            let event = match line.strip_prefix("#dm ") {
                Some(rest) => {
                    ChatEvent::new(message_id, CONSOLE_DM, author.clone(), rest).private()
                }
                None => ChatEvent::new(message_id, CONSOLE_CHANNEL, author.clone(), line),
            };

            if events.send(event).await.is_err() {
                break;
            }
        }
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatClient for ConsoleAdapter {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<String, ChatError> {
        println!("[{}] {}", channel_id, text);
        Ok("console_msg".to_string())
    }

    async fn send_direct(&self, user_id: &str, text: &str) -> Result<String, ChatError> {
        println!("[dm:{}] {}", user_id, text);
        Ok("console_msg".to_string())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), ChatError> {
        println!("[{}] (deleted {})", channel_id, message_id);
        Ok(())
    }

    async fn resolve_user(&self, user_id: &str) -> Result<ChatUser, ChatError> {
        Ok(ChatUser::new(user_id, user_id))
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
