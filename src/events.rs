//! In-process publish/subscribe for live observers
//!
//! Each subscriber owns a small bounded inbox. Publishing never blocks: a
//! subscriber whose inbox is full misses the event.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Topic published after every recorded operation.
pub const DASHBOARD_STATS_TOPIC: &str = "dashboard-stats";

/// Default per-subscriber inbox capacity.
pub const DEFAULT_INBOX_CAPACITY: usize = 16;

struct Registry<T> {
    next_id: u64,
    subscribers: HashMap<u64, mpsc::Sender<T>>,
}

fn lock<T>(registry: &Mutex<Registry<T>>) -> MutexGuard<'_, Registry<T>> {
    // A poisoned registry is still a valid map.
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Broadcast registry handle. Clones share the same subscribers.
pub struct EventBus<T = String> {
    registry: Arc<Mutex<Registry<T>>>,
    capacity: usize,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            capacity: self.capacity,
        }
    }
}

impl<T: Clone + Send + 'static> EventBus<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INBOX_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                subscribers: HashMap::new(),
            })),
            capacity: capacity.max(1),
        }
    }

    /// Register a new subscriber with its own bounded inbox.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.subscribers.insert(id, tx);
            id
        };

        Subscription {
            id,
            rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `event` to every subscriber with room in its inbox.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, event: T) -> usize {
        let registry = lock(&self.registry);
        let mut delivered = 0;
        for (id, tx) in registry.subscribers.iter() {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::trace!(subscriber = id, "inbox full, event dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::trace!(subscriber = id, "inbox closed, event dropped");
                }
            }
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).subscribers.len()
    }
}

impl<T: Clone + Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Inbox handle returned by [`EventBus::subscribe`].
///
/// Dropping the subscription unregisters it.
pub struct Subscription<T> {
    id: u64,
    rx: mpsc::Receiver<T>,
    registry: Weak<Mutex<Registry<T>>>,
}

impl<T> Subscription<T> {
    /// Wait for the next event. Returns `None` once unregistered.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take the next pending event without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    pub fn unsubscribe(self) {
        drop(self);
    }

    fn detach(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).subscribers.remove(&self.id);
        }
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.detach();
    }
}
