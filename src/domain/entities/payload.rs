//! Wire types exchanged with the polling game server

use serde::{Deserialize, Serialize};

/// A chat line queued for delivery to the game server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub author: String,
    pub content: String,
}

/// An in-game command queued on behalf of an authenticated chat user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub name: String,
    pub command: String,
    pub params: String,
    /// Reply destination when the request came from a private conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// A login attempt forwarded verbatim to the game server.
/// The password travels in cleartext; the relay is a bridge, not a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub user_id: String,
}

/// Body of a POST poll request.  Anything that does not match one of these
/// shapes is ignored by the broker.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum InboundPayload {
    #[serde(rename = "relay-message")]
    RelayMessage {
        content: String,
        #[serde(default)]
        context: Option<String>,
    },
    #[serde(rename = "login-result")]
    LoginResult {
        user_id: String,
        success: bool,
        #[serde(default)]
        username: Option<String>,
    },
}

/// Response returned for every poll cycle, drained fresh per call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollResponse {
    pub messages: Vec<RelayMessage>,
    pub commands: Vec<CommandRequest>,
    pub logins: Vec<LoginRequest>,
}
