//! Completion queue carrying worker results back to the session thread.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Receiving end, owned by the session thread.
pub struct CompletionQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

/// Sending end, cloned into job executors.
pub struct CompletionSender<T> {
    sender: Sender<T>,
}

impl<T> Clone for CompletionSender<T> {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

impl<T> CompletionSender<T> {
    /// Post a completion. Returns `false` if the queue has been dropped.
    pub fn send(&self, completion: T) -> bool {
        self.sender.send(completion).is_ok()
    }
}

impl<T> CompletionQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    pub fn sender(&self) -> CompletionSender<T> {
        CompletionSender { sender: self.sender.clone() }
    }

    /// Next completion, if one is waiting.
    pub fn try_next(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for the next completion.
    pub fn next_timeout(&self, timeout: Duration) -> Option<T> {
        match self.receiver.recv_timeout(timeout) {
            Ok(completion) => Some(completion),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Everything currently waiting, in arrival order.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }
}

impl<T> Default for CompletionQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_drain_preserves_order() {
        let queue = CompletionQueue::new();
        let sender = queue.sender();
        sender.send(1);
        sender.send(2);
        sender.send(3);

        assert_eq!(queue.drain(), vec![1, 2, 3]);
        assert!(queue.try_next().is_none());
    }

    #[test]
    fn test_cross_thread_delivery() {
        let queue = CompletionQueue::new();
        let sender = queue.sender();
        thread::spawn(move || sender.send("done")).join().unwrap();

        assert_eq!(queue.next_timeout(Duration::from_secs(1)), Some("done"));
    }

    #[test]
    fn test_timeout_when_empty() {
        let queue: CompletionQueue<u8> = CompletionQueue::new();
        assert_eq!(queue.next_timeout(Duration::from_millis(10)), None);
    }

    #[test]
    fn test_send_after_queue_dropped() {
        let queue: CompletionQueue<u8> = CompletionQueue::new();
        let sender = queue.sender();
        drop(queue);
        assert!(!sender.send(1));
    }
}
