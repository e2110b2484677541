//! Relay core - queues, liveness, filtering, batching, and the broker

pub mod batcher;
pub mod broker;
pub mod filter;
pub mod liveness;
pub mod queue;

pub use batcher::OutgoingBatcher;
pub use broker::{BrokerOptions, RelayBroker};
pub use liveness::LivenessTracker;
pub use queue::DrainQueue;
