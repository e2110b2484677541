//! Discord adapter
//!
//! REST-based integration: outbound traffic goes through the Discord HTTP
//! API, inbound messages are fetched with an `after` cursor on the relay
//! channel and on any direct-message channels the adapter has opened.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::application::errors::ChatError;
use crate::domain::entities::{ChatEvent, ChatUser};
use crate::domain::traits::{BotInfo, ChatClient};

/// Discord API base URL
const API_BASE: &str = "https://discord.com/api/v10";

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const FETCH_LIMIT: u8 = 50;

/// Discord message as returned by the channel messages endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordMessage {
    pub id: String,
    pub channel_id: String,
    pub content: String,
    pub author: DiscordUser,
    pub member: Option<DiscordMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordMember {
    pub nick: Option<String>,
}

impl DiscordUser {
    fn to_chat_user(&self, nick: Option<&str>) -> ChatUser {
        let mut user = ChatUser::new(self.id.as_str(), self.username.as_str()).with_bot(self.bot);
        if let Some(nickname) = nick.or(self.global_name.as_deref()) {
            user = user.with_nickname(nickname);
        }
        user
    }
}

/// Discord bot adapter
pub struct DiscordAdapter {
    token: String,
    client: Client,
    info: BotInfo,
    user_cache: Mutex<HashMap<String, ChatUser>>,
    dm_channels: Mutex<HashMap<String, String>>,
}

impl DiscordAdapter {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            client: Client::new(),
            info: BotInfo {
                id: "unknown".to_string(),
                name: "discord-relay".to_string(),
                username: "discord_relay".to_string(),
            },
            user_cache: Mutex::new(HashMap::new()),
            dm_channels: Mutex::new(HashMap::new()),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", API_BASE, path)
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// Fetch bot identity from the Discord API
    pub async fn fetch_bot_info(&mut self) -> Result<(), ChatError> {
        #[derive(Deserialize)]
        struct Response {
            id: String,
            username: String,
            global_name: Option<String>,
        }

        let url = self.api_url("/users/@me");
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChatError::Network(format!(
                "Discord API error: {}",
                response.status()
            )));
        }

        let data: Response = response
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))?;

        self.info = BotInfo {
            id: data.id,
            name: data.global_name.unwrap_or_else(|| data.username.clone()),
            username: data.username,
        };

        Ok(())
    }

    /// Fetch channel messages newer than `after`, oldest first
    pub async fn fetch_messages(
        &self,
        channel_id: &str,
        after: Option<&str>,
        limit: u8,
    ) -> Result<Vec<DiscordMessage>, ChatError> {
        let mut url = format!(
            "{}?limit={}",
            self.api_url(&format!("/channels/{}/messages", channel_id)),
            limit
        );
        if let Some(after) = after {
            url.push_str(&format!("&after={}", after));
        }

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChatError::Network(format!(
                "Discord API error: {}",
                response.status()
            )));
        }

        let mut messages: Vec<DiscordMessage> = response
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))?;

        // Discord returns newest first
        messages.reverse();
        Ok(messages)
    }

    /// Open (or reuse) the direct-message channel with a user
    async fn open_dm(&self, user_id: &str) -> Result<String, ChatError> {
        if let Some(channel_id) = self.dm_channels.lock().unwrap().get(user_id) {
            return Ok(channel_id.clone());
        }

        #[derive(Serialize)]
        struct OpenDmRequest<'a> {
            recipient_id: &'a str,
        }

        #[derive(Deserialize)]
        struct Response {
            id: String,
        }

        let url = self.api_url("/users/@me/channels");
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&OpenDmRequest {
                recipient_id: user_id,
            })
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChatError::Network(format!(
                "Discord API error: {}",
                response.status()
            )));
        }

        let data: Response = response
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))?;

        self.dm_channels
            .lock()
            .unwrap()
            .insert(user_id.to_string(), data.id.clone());
        Ok(data.id)
    }

    fn dm_channel_snapshot(&self) -> Vec<String> {
        self.dm_channels.lock().unwrap().values().cloned().collect()
    }

    /// Poll one channel past its cursor, forwarding fresh messages.
    /// A channel with no cursor yet is primed silently so history is not
    /// replayed.
    async fn poll_channel(
        &self,
        channel_id: &str,
        cursors: &mut HashMap<String, String>,
        is_private: bool,
        events: &mpsc::Sender<ChatEvent>,
    ) {
        let after = cursors.get(channel_id).cloned();

        if after.is_none() {
            match self.fetch_messages(channel_id, None, 1).await {
                Ok(messages) => {
                    if let Some(last) = messages.last() {
                        cursors.insert(channel_id.to_string(), last.id.clone());
                    }
                }
                Err(e) => tracing::warn!("Failed to prime channel {}: {}", channel_id, e),
            }
            return;
        }

        let messages = match self
            .fetch_messages(channel_id, after.as_deref(), FETCH_LIMIT)
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!("Failed to poll channel {}: {}", channel_id, e);
                return;
            }
        };

        for message in messages {
            cursors.insert(channel_id.to_string(), message.id.clone());
            if message.author.id == self.info.id {
                continue;
            }

            let author = message
                .author
                .to_chat_user(message.member.as_ref().and_then(|m| m.nick.as_deref()));
            self.cache_user(&author);
            let mut event = ChatEvent::new(
                message.id.clone(),
                message.channel_id.clone(),
                author,
                message.content.clone(),
            );
            if is_private {
                event = event.private();
            }

            if events.send(event).await.is_err() {
                return;
            }
        }
    }

    /// Run the polling loop: the relay channel every cycle, plus every
    /// direct-message channel the adapter has opened.  Non-bot authors seen
    /// in the relay channel get a DM channel opened lazily so their private
    /// commands can be picked up.
    pub async fn run(&self, channel_id: String, events: mpsc::Sender<ChatEvent>) {
        let mut cursors: HashMap<String, String> = HashMap::new();
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            self.poll_channel(&channel_id, &mut cursors, false, &events)
                .await;

            // The channel poll may have discovered new authors; make sure
            // their DM channels are open before polling DMs
            let known_users: Vec<String> = {
                let cache = self.user_cache.lock().unwrap();
                cache
                    .values()
                    .filter(|u| !u.is_bot && u.id != self.info.id)
                    .map(|u| u.id.clone())
                    .collect()
            };
            for user_id in known_users {
                if let Err(e) = self.open_dm(&user_id).await {
                    tracing::debug!("Could not open DM with {}: {}", user_id, e);
                }
            }

            for dm_channel in self.dm_channel_snapshot() {
                self.poll_channel(&dm_channel, &mut cursors, true, &events)
                    .await;
            }
        }
    }

    fn cache_user(&self, user: &ChatUser) {
        self.user_cache
            .lock()
            .unwrap()
            .insert(user.id.clone(), user.clone());
    }
}

#[async_trait]
impl ChatClient for DiscordAdapter {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<String, ChatError> {
        #[derive(Serialize)]
        struct SendMessageRequest<'a> {
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct Response {
            id: String,
        }

        let url = self.api_url(&format!("/channels/{}/messages", channel_id));
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&SendMessageRequest { content: text })
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChatError::Network(format!(
                "Discord API error: {}",
                response.status()
            )));
        }

        let data: Response = response
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))?;

        Ok(data.id)
    }

    async fn send_direct(&self, user_id: &str, text: &str) -> Result<String, ChatError> {
        let channel_id = self.open_dm(user_id).await?;
        self.send_message(&channel_id, text).await
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), ChatError> {
        let url = self.api_url(&format!("/channels/{}/messages/{}", channel_id, message_id));
        let response = self
            .client
            .delete(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::FORBIDDEN {
            return Err(ChatError::PermissionDenied(format!(
                "cannot delete message {}",
                message_id
            )));
        }
        if !response.status().is_success() {
            return Err(ChatError::Network(format!(
                "Discord API error: {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn resolve_user(&self, user_id: &str) -> Result<ChatUser, ChatError> {
        if let Some(user) = self.user_cache.lock().unwrap().get(user_id) {
            return Ok(user.clone());
        }

        let url = self.api_url(&format!("/users/{}", user_id));
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ChatError::NotFound(format!("user {}", user_id)));
        }
        if !response.status().is_success() {
            return Err(ChatError::Network(format!(
                "Discord API error: {}",
                response.status()
            )));
        }

        let data: DiscordUser = response
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))?;

        let user = data.to_chat_user(None);
        self.cache_user(&user);
        Ok(user)
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
