//! Domain entities - Core relay objects

pub mod event;
pub mod payload;
pub mod user;

pub use event::ChatEvent;
pub use payload::{CommandRequest, InboundPayload, LoginRequest, PollResponse, RelayMessage};
pub use user::ChatUser;
