//! Publish/subscribe with last-value replay.
//!
//! Every subscriber gets its own unbounded queue, so values arrive in
//! publish order and none are skipped. A new subscriber first receives the
//! most recent value, if one has been published.

use tokio::sync::mpsc;

pub type Subscription<T> = mpsc::UnboundedReceiver<T>;

#[derive(Debug)]
pub struct Feed<T> {
    latest: Option<T>,
    subscribers: Vec<mpsc::UnboundedSender<T>>,
}

impl<T> Default for Feed<T> {
    fn default() -> Self {
        Self {
            latest: None,
            subscribers: Vec::new(),
        }
    }
}

impl<T: Clone> Feed<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: T) -> Self {
        Self {
            latest: Some(value),
            subscribers: Vec::new(),
        }
    }

    pub fn latest(&self) -> Option<&T> {
        self.latest.as_ref()
    }

    pub fn subscribe(&mut self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(value) = &self.latest {
            let _ = tx.send(value.clone());
        }
        self.subscribers.push(tx);
        rx
    }

    /// Deliver to every live subscriber; dropped receivers are pruned.
    pub fn publish(&mut self, value: T) {
        self.subscribers.retain(|tx| tx.send(value.clone()).is_ok());
        self.latest = Some(value);
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Disconnect all subscribers; their receivers yield `None` once drained.
    pub fn close(&mut self) {
        self.subscribers.clear();
    }
}
