//! Domain traits - Abstractions for infrastructure implementations

pub mod chat;

pub use chat::{BotInfo, ChatClient};
