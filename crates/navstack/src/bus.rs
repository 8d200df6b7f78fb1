//! # Notification Bus
//!
//! Fan-out channel shared by every stack built from one context. Stacks publish
//! a [`Broadcast`] after each debounced burst of mutations; subscribers decide
//! for themselves whether the broadcast concerns them. The bus never filters.
//!
//! Two delivery paths carry the same broadcasts:
//!
//! - synchronous [`BusSubscriber`]s, invoked in registration order on the
//!   publishing thread (the scheduler's turn that fired the debouncer);
//! - an async [`tokio::sync::broadcast`] stream via [`NotificationBus::receiver`]
//!   for render loops that prefer to poll.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::DEFAULT_BUS_CAPACITY;
use crate::errors::{NavigationError, Result};
use crate::identifiers::StackId;

/// Topic name used for stack change broadcasts
pub const STACK_CHANGED_TOPIC: &str = "stack-changed";

/// What a broadcast is about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// A stack's sequence changed; carries the stack identity
    StackChanged,
    /// Application-defined event sharing the bus
    Custom(String),
}

impl Topic {
    /// Topic name as published
    pub fn as_str(&self) -> &str {
        match self {
            Self::StackChanged => STACK_CHANGED_TOPIC,
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message on the bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Broadcast {
    topic: Topic,
    stack_id: Option<StackId>,
}

impl Broadcast {
    /// Build an arbitrary broadcast. Nothing is validated here.
    pub fn new(topic: Topic, stack_id: Option<StackId>) -> Self {
        Self { topic, stack_id }
    }

    /// Well-formed "stack changed" broadcast
    pub fn stack_changed(stack_id: StackId) -> Self {
        Self::new(Topic::StackChanged, Some(stack_id))
    }

    /// Application broadcast on a custom topic
    pub fn custom(name: impl Into<String>, stack_id: Option<StackId>) -> Self {
        Self::new(Topic::Custom(name.into()), stack_id)
    }

    /// Topic of this broadcast
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Stack identity carried by this broadcast.
    ///
    /// A `StackChanged` broadcast without one breaks the bus contract and
    /// yields `MalformedBroadcast`. Custom topics may legitimately omit it.
    pub fn stack_id(&self) -> Result<Option<&StackId>> {
        match (&self.topic, &self.stack_id) {
            (Topic::StackChanged, None) => {
                Err(NavigationError::malformed_broadcast(self.topic.as_str()))
            }
            (_, stack_id) => Ok(stack_id.as_ref()),
        }
    }

    /// Whether this is a stack change broadcast for `stack_id`
    pub fn concerns(&self, stack_id: &StackId) -> bool {
        self.topic == Topic::StackChanged && self.stack_id.as_ref() == Some(stack_id)
    }
}

/// Receives every broadcast published on a bus.
pub trait BusSubscriber: Send + Sync {
    /// Handle one broadcast. Called without any bus lock held.
    fn on_broadcast(&self, broadcast: &Broadcast);
}

struct FnSubscriber<F>(F);

impl<F> BusSubscriber for FnSubscriber<F>
where
    F: Fn(&Broadcast) + Send + Sync,
{
    fn on_broadcast(&self, broadcast: &Broadcast) {
        (self.0)(broadcast);
    }
}

/// Identifier of one registration on a bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct BusInner {
    subscribers: RwLock<Vec<(SubscriptionId, Weak<dyn BusSubscriber>)>>,
    next_id: AtomicU64,
    published: AtomicU64,
    sender: broadcast::Sender<Broadcast>,
}

/// Shared publish/subscribe channel, cheap to clone.
#[derive(Clone)]
pub struct NotificationBus {
    inner: Arc<BusInner>,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl NotificationBus {
    /// Create a bus whose async stream buffers `capacity` broadcasts.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(BusInner {
                subscribers: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(0),
                published: AtomicU64::new(0),
                sender,
            }),
        }
    }

    /// Register a subscriber.
    ///
    /// The bus holds it weakly; keep the `Arc` alive for as long as it should
    /// receive broadcasts. Dropping the returned [`Subscription`] unregisters it.
    pub fn subscribe(&self, subscriber: Arc<dyn BusSubscriber>) -> Subscription {
        let id = self.register(Arc::downgrade(&subscriber));
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
            _keepalive: None,
        }
    }

    /// Register a closure. The returned [`Subscription`] owns it.
    pub fn subscribe_fn<F>(&self, f: F) -> Subscription
    where
        F: Fn(&Broadcast) + Send + Sync + 'static,
    {
        let subscriber: Arc<dyn BusSubscriber> = Arc::new(FnSubscriber(f));
        let id = self.register(Arc::downgrade(&subscriber));
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
            _keepalive: Some(subscriber),
        }
    }

    /// Async stream of every broadcast published from now on
    pub fn receiver(&self) -> broadcast::Receiver<Broadcast> {
        self.inner.sender.subscribe()
    }

    /// Deliver `broadcast` to every live subscriber and the async stream.
    ///
    /// Returns the number of synchronous subscribers reached.
    pub fn publish(&self, broadcast: Broadcast) -> usize {
        self.inner.published.fetch_add(1, Ordering::Relaxed);

        let live: Vec<Arc<dyn BusSubscriber>> = {
            let mut subscribers = self.inner.subscribers.write();
            subscribers.retain(|(_, weak)| weak.strong_count() > 0);
            subscribers
                .iter()
                .filter_map(|(_, weak)| weak.upgrade())
                .collect()
        };

        tracing::trace!(
            topic = %broadcast.topic(),
            subscribers = live.len(),
            "Publishing broadcast"
        );

        for subscriber in &live {
            subscriber.on_broadcast(&broadcast);
        }

        // No async receivers is fine
        let _ = self.inner.sender.send(broadcast);
        live.len()
    }

    /// Number of registered subscribers that are still alive
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    /// Total broadcasts published on this bus
    pub fn published(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }

    fn register(&self, subscriber: Weak<dyn BusSubscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.subscribers.write().push((id, subscriber));
        id
    }
}

impl fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBus")
            .field("subscribers", &self.subscriber_count())
            .field("published", &self.published())
            .finish()
    }
}

/// Registration guard; unsubscribes on drop.
pub struct Subscription {
    id: SubscriptionId,
    bus: Weak<BusInner>,
    _keepalive: Option<Arc<dyn BusSubscriber>>,
}

impl Subscription {
    /// Identifier of this registration
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.subscribers.write().retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
