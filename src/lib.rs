//! Message relay bridging a Discord channel and a game server that polls
//! over HTTP instead of holding a push connection.

pub mod application;
pub mod domain;
pub mod infrastructure;
