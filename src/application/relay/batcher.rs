//! Periodic batching of game-originated lines toward the relay channel

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::domain::traits::ChatClient;

/// Platform maximum message length, in characters
pub const MAX_MESSAGE_LEN: usize = 2000;

const FLUSH_INTERVAL: Duration = Duration::from_secs(3);
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Accumulates pending lines and flushes them to the relay channel as
/// size-bounded batches on a fixed timer.  Delivery is best-effort: lines
/// dequeued for a failed flush are not requeued.
pub struct OutgoingBatcher {
    pending: Mutex<VecDeque<String>>,
    chat: Arc<dyn ChatClient>,
    channel_id: String,
}

impl OutgoingBatcher {
    pub fn new(chat: Arc<dyn ChatClient>, channel_id: impl Into<String>) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            chat,
            channel_id: channel_id.into(),
        }
    }

    pub fn push(&self, line: String) {
        self.pending.lock().unwrap().push_back(line);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Pop a maximal prefix of pending lines that fits in one message,
    /// counting one separator character per line.  Lines that do not fit
    /// stay queued for the next tick.  Non-suspending; the lock is only
    /// held while popping.
    pub fn take_batch(&self) -> Option<String> {
        let mut pending = self.pending.lock().unwrap();
        let mut lines: Vec<String> = Vec::new();
        let mut total = 0usize;

        while let Some(front) = pending.front() {
            let front_len = front.chars().count();
            if total + front_len > MAX_MESSAGE_LEN {
                break;
            }
            total += front_len + 1;
            if let Some(line) = pending.pop_front() {
                lines.push(line);
            }
        }

        if lines.is_empty() {
            // Either nothing pending, or an oversized head line: ship the
            // head alone, truncated, so the queue cannot wedge.
            let line = pending.pop_front()?;
            let truncated: String = line.chars().take(MAX_MESSAGE_LEN).collect();
            return Some(truncated);
        }

        Some(lines.join("\n"))
    }

    /// Run the periodic flush loop
    pub async fn run(self: Arc<Self>) {
        let mut tick = tokio::time::interval(FLUSH_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            self.flush().await;
        }
    }

    /// Flush one batch, bounded by the send timeout
    pub async fn flush(&self) {
        let Some(batch) = self.take_batch() else {
            return;
        };

        let send = self.chat.send_message(&self.channel_id, &batch);
        match tokio::time::timeout(SEND_TIMEOUT, send).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!("Failed to flush outgoing batch: {}", e),
            Err(_) => tracing::warn!("Timed out flushing outgoing batch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::application::errors::ChatError;
    use crate::domain::entities::ChatUser;
    use crate::domain::traits::BotInfo;

    struct NullChat;

    #[async_trait]
    impl ChatClient for NullChat {
        async fn send_message(&self, _channel_id: &str, _text: &str) -> Result<String, ChatError> {
            Ok("0".to_string())
        }

        async fn send_direct(&self, _user_id: &str, _text: &str) -> Result<String, ChatError> {
            Ok("0".to_string())
        }

        async fn delete_message(&self, _channel_id: &str, _message_id: &str) -> Result<(), ChatError> {
            Ok(())
        }

        async fn resolve_user(&self, user_id: &str) -> Result<ChatUser, ChatError> {
            Ok(ChatUser::new(user_id, user_id))
        }

        fn bot_info(&self) -> BotInfo {
            BotInfo {
                id: "0".to_string(),
                name: "null".to_string(),
                username: "null".to_string(),
            }
        }
    }

    fn batcher() -> OutgoingBatcher {
        OutgoingBatcher::new(Arc::new(NullChat), "chan")
    }

    #[test]
    fn empty_buffer_yields_nothing() {
        assert!(batcher().take_batch().is_none());
    }

    #[test]
    fn short_lines_are_joined_in_order() {
        let b = batcher();
        b.push("one".to_string());
        b.push("two".to_string());
        b.push("three".to_string());

        assert_eq!(b.take_batch().unwrap(), "one\ntwo\nthree");
        assert!(b.take_batch().is_none());
    }

    #[test]
    fn overflow_lines_stay_queued_for_the_next_tick() {
        let b = batcher();
        b.push("a".repeat(1200));
        b.push("b".repeat(1200));
        b.push("c".to_string());

        let first = b.take_batch().unwrap();
        assert_eq!(first, "a".repeat(1200));
        assert_eq!(b.pending_len(), 2);

        let second = b.take_batch().unwrap();
        assert_eq!(second, format!("{}\nc", "b".repeat(1200)));
        assert!(b.take_batch().is_none());
    }

    #[test]
    fn exact_fit_is_packed() {
        let b = batcher();
        b.push("x".repeat(2000));
        b.push("y".to_string());

        assert_eq!(b.take_batch().unwrap(), "x".repeat(2000));
        assert_eq!(b.take_batch().unwrap(), "y");
    }

    #[test]
    fn oversized_head_is_truncated_not_wedged() {
        let b = batcher();
        b.push("z".repeat(2500));
        b.push("tail".to_string());

        assert_eq!(b.take_batch().unwrap(), "z".repeat(2000));
        assert_eq!(b.take_batch().unwrap(), "tail");
    }
}
