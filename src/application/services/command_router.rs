//! Command router - maps chat commands onto broker operations

use std::sync::Arc;
use std::time::Duration;

use crate::application::relay::broker::RelayBroker;
use crate::domain::entities::{ChatEvent, CommandRequest, LoginRequest};
use crate::domain::traits::ChatClient;

const SERVER_DOWN_REPLY: &str = "The server currently appears to be down.";
const LOGIN_QUEUED_REPLY: &str = "The server currently appears to be down, but your \
login attempt has been added to the queue and will be executed as soon as the \
server returns.";
const NOT_LOGGED_IN_REPLY: &str = "Not logged in.";
const LEAK_WARNING: &str = "You've quite possibly just leaked your password by using \
this command outside of direct messages; it is advised that you change it at once.\n\
*This message will be automatically deleted.*";
const LEAK_WARNING_TTL: Duration = Duration::from_secs(10);

/// Requester name stamped on synthetic status requests
const STATUS_REQUESTER: &str = "discord_relay";

/// Routes prefixed chat commands (`cmd`, `login`, `status`) to broker
/// operations, enforcing liveness, authentication, and channel scoping.
pub struct CommandRouter {
    broker: Arc<RelayBroker>,
    chat: Arc<dyn ChatClient>,
    prefix: String,
    channel_id: String,
    logins_allowed: bool,
}

impl CommandRouter {
    pub fn new(
        broker: Arc<RelayBroker>,
        chat: Arc<dyn ChatClient>,
        prefix: impl Into<String>,
        channel_id: impl Into<String>,
        logins_allowed: bool,
    ) -> Self {
        Self {
            broker,
            chat,
            prefix: prefix.into(),
            channel_id: channel_id.into(),
            logins_allowed,
        }
    }

    /// Handle one chat event.  Returns true when the event was consumed as
    /// a known command.
    pub async fn handle(&self, event: &ChatEvent) -> bool {
        let Some(rest) = event.content.strip_prefix(&self.prefix) else {
            return false;
        };

        let (name, remainder) = match rest.split_once(char::is_whitespace) {
            Some((name, remainder)) => (name, remainder.trim_start()),
            None => (rest.trim_end(), ""),
        };

        match name {
            "cmd" => self.run_command(event, remainder).await,
            "login" => self.login(event, remainder).await,
            "status" => self.status(event).await,
            _ => return false,
        }
        true
    }

    /// Outside the relay channel, only private conversations are honored
    fn in_scope(&self, event: &ChatEvent) -> bool {
        event.channel_id == self.channel_id || event.is_private
    }

    /// Private requests carry their conversation id so the reply can find
    /// its way back
    fn context_for(&self, event: &ChatEvent) -> Option<String> {
        event.is_private.then(|| event.channel_id.clone())
    }

    async fn run_command(&self, event: &ChatEvent, remainder: &str) {
        if !self.broker.is_alive() {
            self.reply(event, SERVER_DOWN_REPLY).await;
            return;
        }
        if !self.in_scope(event) || !self.logins_allowed {
            return;
        }
        let Some(username) = self.broker.authenticated_username(&event.author.id) else {
            self.reply(event, NOT_LOGGED_IN_REPLY).await;
            return;
        };

        let (command, params) = match remainder.split_once(char::is_whitespace) {
            Some((command, params)) => (command, params),
            None => (remainder, ""),
        };
        if command.is_empty() {
            self.reply(event, "Usage: cmd <command> [params]").await;
            return;
        }

        self.broker.enqueue_command(CommandRequest {
            name: username,
            command: command.to_string(),
            params: params.replace('\n', ""),
            context: self.context_for(event),
        });
    }

    async fn login(&self, event: &ChatEvent, remainder: &str) {
        if !self.logins_allowed {
            return;
        }
        if !event.is_private {
            self.handle_public_login(event).await;
            return;
        }

        let mut parts = remainder.split_whitespace();
        let Some(username) = parts.next() else {
            self.reply(event, "Usage: login <username> [password]").await;
            return;
        };
        let password = parts.next().unwrap_or("");

        // Queued regardless of liveness; only the reply changes
        self.broker.enqueue_login(LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
            user_id: event.author.id.clone(),
        });

        if !self.broker.is_alive() {
            self.reply(event, LOGIN_QUEUED_REPLY).await;
        }
    }

    /// A login attempt outside a private conversation is never enqueued:
    /// warn the author, then scrub both messages as well as we can.
    async fn handle_public_login(&self, event: &ChatEvent) {
        let warning = format!("<@{}> {}", event.author.id, LEAK_WARNING);
        match self.chat.send_message(&event.channel_id, &warning).await {
            Ok(warning_id) => {
                let chat = Arc::clone(&self.chat);
                let channel_id = event.channel_id.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(LEAK_WARNING_TTL).await;
                    if let Err(e) = chat.delete_message(&channel_id, &warning_id).await {
                        tracing::debug!("Could not clean up leak warning: {}", e);
                    }
                });
            }
            Err(e) => tracing::warn!("Failed to send leak warning: {}", e),
        }

        if let Err(e) = self
            .chat
            .delete_message(&event.channel_id, &event.message_id)
            .await
        {
            tracing::warn!(
                "Unable to delete possible password leak by user ID {}: {}",
                event.author.id,
                e
            );
        }
    }

    async fn status(&self, event: &ChatEvent) {
        if !self.broker.is_alive() {
            self.reply(event, SERVER_DOWN_REPLY).await;
            return;
        }
        if !self.in_scope(event) {
            return;
        }

        self.broker.enqueue_command(CommandRequest {
            name: STATUS_REQUESTER.to_string(),
            command: "status".to_string(),
            params: String::new(),
            context: self.context_for(event),
        });
    }

    async fn reply(&self, event: &ChatEvent, text: &str) {
        if let Err(e) = self.chat.send_message(&event.channel_id, text).await {
            tracing::warn!("Failed to reply in {}: {}", event.channel_id, e);
        }
    }
}
