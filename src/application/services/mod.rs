//! Application services - Chat command routing

pub mod command_router;

pub use command_router::CommandRouter;
