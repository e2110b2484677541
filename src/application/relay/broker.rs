//! Relay broker - the hub owning the queues, liveness state, and the
//! poll protocol handler

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::application::relay::batcher::{OutgoingBatcher, MAX_MESSAGE_LEN};
use crate::application::relay::filter;
use crate::application::relay::liveness::LivenessTracker;
use crate::application::relay::queue::DrainQueue;
use crate::domain::entities::{
    ChatEvent, CommandRequest, InboundPayload, LoginRequest, PollResponse, RelayMessage,
};
use crate::domain::traits::ChatClient;

/// Behavior switches for the broker, resolved from configuration
#[derive(Debug, Clone)]
pub struct BrokerOptions {
    pub channel_id: String,
    pub bot_user_id: String,
    pub use_display_names: bool,
    pub clean_invite_links: bool,
}

/// The hub of the relay.  Owns the three directional queues, the liveness
/// tracker, and the authenticated-user map; every handler and task works
/// against one shared instance, no ambient globals.
pub struct RelayBroker {
    options: BrokerOptions,
    chat: Arc<dyn ChatClient>,
    liveness: LivenessTracker,
    messages: DrainQueue<RelayMessage>,
    commands: DrainQueue<CommandRequest>,
    logins: DrainQueue<LoginRequest>,
    authenticated: Mutex<HashMap<String, String>>,
    batcher: Option<Arc<OutgoingBatcher>>,
}

impl RelayBroker {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        options: BrokerOptions,
        liveness: LivenessTracker,
        batcher: Option<Arc<OutgoingBatcher>>,
    ) -> Self {
        Self {
            options,
            chat,
            liveness,
            messages: DrainQueue::new(),
            commands: DrainQueue::new(),
            logins: DrainQueue::new(),
            authenticated: Mutex::new(HashMap::new()),
            batcher,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    /// External-server username for an authenticated chat user, if any
    pub fn authenticated_username(&self, user_id: &str) -> Option<String> {
        self.authenticated.lock().unwrap().get(user_id).cloned()
    }

    pub fn enqueue_command(&self, request: CommandRequest) {
        self.commands.append(request);
    }

    pub fn enqueue_login(&self, request: LoginRequest) {
        self.logins.append(request);
    }

    /// Handle one inbound chat message.
    ///
    /// Only queues relay content; command handling runs separately (and
    /// unconditionally) in the event loop, so commands keep working while
    /// content relay is gated on liveness.
    pub fn on_chat_event(&self, event: &ChatEvent) {
        if !self.liveness.is_alive() {
            return;
        }
        if event.channel_id != self.options.channel_id
            || event.author.id == self.options.bot_user_id
        {
            return;
        }

        let author = if self.options.use_display_names {
            event.author.display_name().to_string()
        } else {
            event.author.username.clone()
        };

        let mut content = filter::fold_newlines(&event.content);
        if self.options.clean_invite_links {
            content = filter::clean_invites(&content);
        }
        if content.is_empty() {
            return;
        }

        self.messages.append(RelayMessage { author, content });
    }

    /// The single poll entry point, shared by GET and POST.
    ///
    /// Records liveness before anything else and always returns the full
    /// drain payload; a bad body can never cost the game server its
    /// response.
    pub async fn handle_poll(&self, body: &[u8]) -> PollResponse {
        self.liveness.record_poll();

        if !body.is_empty() {
            match serde_json::from_slice::<InboundPayload>(body) {
                Ok(payload) => self.dispatch_payload(payload).await,
                Err(e) => tracing::debug!("Ignoring unrecognized poll body: {}", e),
            }
        }

        PollResponse {
            messages: self.messages.drain_all(),
            commands: self.commands.drain_all(),
            logins: self.logins.drain_all(),
        }
    }

    async fn dispatch_payload(&self, payload: InboundPayload) {
        match payload {
            InboundPayload::RelayMessage { content, context } => {
                self.handle_relay_message(content, context).await;
            }
            InboundPayload::LoginResult {
                user_id,
                success,
                username,
            } => {
                self.handle_login_result(user_id, success, username).await;
            }
        }
    }

    async fn handle_relay_message(&self, content: String, context: Option<String>) {
        let mut text = filter::strip_control_sequences(&content);
        text = filter::redact_mentions(&text);
        if self.options.clean_invite_links {
            text = filter::clean_invites(&text);
        }
        let text = filter::truncate_chars(&text, MAX_MESSAGE_LEN).to_string();
        if text.is_empty() {
            return;
        }

        if let Some(channel_id) = context {
            if let Err(e) = self.chat.send_message(&channel_id, &text).await {
                tracing::warn!("Failed to deliver relayed message to {}: {}", channel_id, e);
            }
        } else if let Some(batcher) = &self.batcher {
            batcher.push(text);
        } else if let Err(e) = self.chat.send_message(&self.options.channel_id, &text).await {
            tracing::warn!("Failed to deliver relayed message: {}", e);
        }
    }

    async fn handle_login_result(&self, user_id: String, success: bool, username: Option<String>) {
        let user = match self.chat.resolve_user(&user_id).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("Could not resolve user {} for login result: {}", user_id, e);
                return;
            }
        };

        if success {
            let Some(username) = username else {
                tracing::warn!("Login result for user {} is missing a username", user_id);
                return;
            };
            self.authenticated.lock().unwrap().insert(user_id, username);
            if let Err(e) = self.chat.send_direct(&user.id, "Login successful.").await {
                tracing::warn!("Failed to notify {} of login success: {}", user.id, e);
            }
        } else if let Err(e) = self.chat.send_direct(&user.id, "Login failed.").await {
            tracing::warn!("Failed to notify {} of login failure: {}", user.id, e);
        }
    }
}
