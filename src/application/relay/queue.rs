//! Directional queue shared between the chat side and the poll handler

use std::collections::VecDeque;
use std::sync::Mutex;

/// Ordered append/drain container.
///
/// The lock is only held for a non-suspending push or drain, so `drain_all`
/// returns exactly the items fully appended since the previous drain, in
/// append order; an append racing a drain lands in the next drain.
pub struct DrainQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> DrainQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    pub fn append(&self, item: T) {
        self.items.lock().unwrap().push_back(item);
    }

    /// Atomically empty the queue, returning its contents in append order
    pub fn drain_all(&self) -> Vec<T> {
        let mut items = self.items.lock().unwrap();
        items.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().unwrap().is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

impl<T> Default for DrainQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn drain_returns_items_in_append_order() {
        let queue = DrainQueue::new();
        queue.append(1);
        queue.append(2);
        queue.append(3);

        assert_eq!(queue.drain_all(), vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn items_appended_after_a_drain_land_in_the_next_drain() {
        let queue = DrainQueue::new();
        queue.append("a");
        assert_eq!(queue.drain_all(), vec!["a"]);

        queue.append("b");
        queue.append("c");
        assert_eq!(queue.drain_all(), vec!["b", "c"]);
        assert_eq!(queue.drain_all(), Vec::<&str>::new());
    }

    #[test]
    fn concurrent_appends_are_never_lost() {
        let queue = Arc::new(DrainQueue::new());
        let mut handles = Vec::new();

        for t in 0..4 {
            let queue = Arc::clone(&queue);
            handles.push(std::thread::spawn(move || {
                for i in 0..250 {
                    queue.append(t * 1000 + i);
                }
            }));
        }

        let drainer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                let mut drained = Vec::new();
                while drained.len() < 1000 {
                    drained.extend(queue.drain_all());
                }
                drained
            })
        };

        for handle in handles {
            handle.join().unwrap();
        }
        let drained = drainer.join().unwrap();

        assert_eq!(drained.len(), 1000);

        // FIFO holds per producer even when drains interleave
        for t in 0..4 {
            let per_thread: Vec<i32> = drained
                .iter()
                .copied()
                .filter(|v| v / 1000 == t)
                .collect();
            let mut sorted = per_thread.clone();
            sorted.sort();
            assert_eq!(per_thread, sorted);
        }
    }
}
