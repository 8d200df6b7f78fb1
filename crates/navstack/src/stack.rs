//! # Navigation Stack
//!
//! The coordinator: an ordered sequence of attached [`Destination`]s for one
//! navigable area.
//!
//! ## Invariants
//!
//! - No two entries share an identity.
//! - Every entry is attached under a token this stack issued.
//! - The sequence only grows at the tail and only loses a contiguous suffix.
//!   Every record in that suffix is detached before the sequence is truncated.
//!
//! ## Notifications
//!
//! Mutations apply synchronously and are immediately visible to queries. Each
//! mutation then pokes a [`Debouncer`] that publishes one
//! [`Broadcast::stack_changed`] per burst on the shared bus.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::bus::{Broadcast, NotificationBus};
use crate::config::NavigationConfig;
use crate::debounce::Debouncer;
use crate::destination::{AttachmentHandle, Destination, Detacher};
use crate::errors::{NavigationError, Result};
use crate::identifiers::{AttachmentToken, DestinationId, StackId};
use crate::scheduler::DeferredScheduler;

struct StackEntry<C: 'static> {
    destination: Destination<C>,
    token: AttachmentToken,
}

struct StackInner<C: 'static> {
    id: StackId,
    initial_marker: DestinationId,
    sequence: Mutex<Vec<StackEntry<C>>>,
    debouncer: Debouncer,
    self_ref: Weak<StackInner<C>>,
}

impl<C: 'static> StackInner<C> {
    /// Detach `entries[from..]`, then truncate. Caller holds the lock.
    fn truncate_from(&self, entries: &mut Vec<StackEntry<C>>, from: usize) -> usize {
        for entry in &entries[from..] {
            entry.destination.detach_with(entry.token);
        }
        let removed = entries.len() - from;
        entries.truncate(from);
        removed
    }

    fn position(entries: &[StackEntry<C>], id: &DestinationId) -> Option<usize> {
        entries.iter().position(|e| e.destination.id() == id)
    }

    fn notify(&self) {
        self.debouncer.call();
    }
}

impl<C: 'static> Detacher<C> for StackInner<C> {
    fn release(&self, destination: &Destination<C>, token: AttachmentToken) {
        let mut entries = self.sequence.lock();
        let found = entries
            .iter()
            .position(|e| e.token == token && e.destination == *destination);

        let Some(index) = found else {
            drop(entries);
            destination.detach_with(token);
            return;
        };

        if index + 1 != entries.len() {
            tracing::debug!(
                stack = %self.id,
                destination = %destination.id(),
                above = entries.len() - index - 1,
                "Self-detach below top; releasing everything above it too"
            );
        }

        let removed = self.truncate_from(&mut entries, index);
        drop(entries);

        tracing::debug!(stack = %self.id, destination = %destination.id(), removed, "Destination released itself");
        self.notify();
    }
}

/// Shared handle to one navigation stack.
pub struct NavigationStack<C: 'static> {
    inner: Arc<StackInner<C>>,
}

impl<C: 'static> NavigationStack<C> {
    /// Create a stack with the default configuration
    pub fn new(id: StackId, bus: NotificationBus, scheduler: Arc<dyn DeferredScheduler>) -> Self {
        Self::with_config(id, bus, scheduler, &NavigationConfig::default())
    }

    /// Create a stack publishing on `bus` through a debouncer on `scheduler`
    pub fn with_config(
        id: StackId,
        bus: NotificationBus,
        scheduler: Arc<dyn DeferredScheduler>,
        config: &NavigationConfig,
    ) -> Self {
        let broadcast_id = id.clone();
        let debouncer = Debouncer::new(config.debounce_window(), scheduler, move || {
            bus.publish(Broadcast::stack_changed(broadcast_id.clone()));
        });

        let inner = Arc::new_cyclic(|self_ref| StackInner {
            id,
            initial_marker: DestinationId::generate(),
            sequence: Mutex::new(Vec::new()),
            debouncer,
            self_ref: self_ref.clone(),
        });

        Self { inner }
    }

    /// Identity of this stack
    pub fn id(&self) -> &StackId {
        &self.inner.id
    }

    /// Synthetic identity standing for "the root, before anything was pushed"
    pub fn initial_marker(&self) -> &DestinationId {
        &self.inner.initial_marker
    }

    /// Number of destinations on the stack
    pub fn len(&self) -> usize {
        self.inner.sequence.lock().len()
    }

    /// Whether nothing has been pushed
    pub fn is_empty(&self) -> bool {
        self.inner.sequence.lock().is_empty()
    }

    /// Whether a destination with this identity is on the stack
    pub fn contains(&self, destination: &Destination<C>) -> bool {
        StackInner::position(&self.inner.sequence.lock(), destination.id()).is_some()
    }

    /// Snapshot of the sequence, bottom first
    pub fn destinations(&self) -> Vec<Destination<C>> {
        self.inner
            .sequence
            .lock()
            .iter()
            .map(|e| e.destination.clone())
            .collect()
    }

    /// Push `destination`.
    ///
    /// No-op (returns `false`) if it is attached anywhere or an equal identity
    /// is already on this stack.
    pub fn navigate_to(&self, destination: &Destination<C>) -> bool {
        let mut entries = self.inner.sequence.lock();

        if destination.is_attached()
            || StackInner::position(&entries, destination.id()).is_some()
        {
            tracing::trace!(
                stack = %self.inner.id,
                destination = %destination.id(),
                "Navigation to attached or present destination ignored"
            );
            return false;
        }

        let owner: Weak<dyn Detacher<C>> = self.inner.self_ref.clone();
        let handle = AttachmentHandle::issue(self.inner.id.clone(), owner);
        let token = handle.token();
        if !destination.try_attach(handle) {
            return false;
        }

        entries.push(StackEntry {
            destination: destination.clone(),
            token,
        });
        let depth = entries.len();
        drop(entries);

        tracing::debug!(stack = %self.inner.id, destination = %destination.id(), depth, "Navigated");
        self.inner.notify();
        true
    }

    /// Detach and remove everything. Notifies even when already empty.
    pub fn pop_all(&self) -> usize {
        let mut entries = self.inner.sequence.lock();
        let removed = self.inner.truncate_from(&mut entries, 0);
        drop(entries);

        tracing::debug!(stack = %self.inner.id, removed, "Popped all destinations");
        self.inner.notify();
        removed
    }

    /// Return to just before `destination`: it and everything above it are
    /// detached and removed. No-op if its identity is not on the stack.
    pub fn pop_to(&self, destination: &Destination<C>) -> usize {
        let mut entries = self.inner.sequence.lock();
        let Some(index) = StackInner::position(&entries, destination.id()) else {
            tracing::trace!(
                stack = %self.inner.id,
                destination = %destination.id(),
                "Pop to absent destination ignored"
            );
            return 0;
        };

        let removed = self.inner.truncate_from(&mut entries, index);
        drop(entries);

        tracing::debug!(stack = %self.inner.id, destination = %destination.id(), removed, "Popped to destination");
        self.inner.notify();
        removed
    }

    /// Whether a destination follows `id`.
    ///
    /// For the initial marker this is true only when exactly one destination
    /// has been pushed.
    pub fn has_destination_after(&self, id: &DestinationId) -> bool {
        let entries = self.inner.sequence.lock();
        if *id == self.inner.initial_marker {
            return entries.len() == 1;
        }
        match StackInner::position(&entries, id) {
            Some(index) => index + 1 < entries.len(),
            None => false,
        }
    }

    /// Destination immediately after `id` (the first one for the initial
    /// marker), or `None` when `id` is absent or already on top.
    pub fn destination_after(&self, id: &DestinationId) -> Option<Destination<C>> {
        let entries = self.inner.sequence.lock();
        let next = if *id == self.inner.initial_marker {
            0
        } else {
            StackInner::position(&entries, id)? + 1
        };
        entries.get(next).map(|e| e.destination.clone())
    }

    /// Like [`destination_after`](Self::destination_after), as a `Result`.
    pub fn try_destination_after(&self, id: &DestinationId) -> Result<Destination<C>> {
        self.destination_after(id)
            .ok_or_else(|| NavigationError::no_successor(id.clone()))
    }

    /// Destination after `id`, for callers that already checked
    /// [`has_destination_after`](Self::has_destination_after).
    ///
    /// # Panics
    ///
    /// Panics when there is no successor; that is a bug at the call site.
    pub fn destination_after_unchecked(&self, id: &DestinationId) -> Destination<C> {
        match self.try_destination_after(id) {
            Ok(destination) => destination,
            Err(err) => panic!("{err}"),
        }
    }

    /// Content of the destination after `id`.
    ///
    /// # Panics
    ///
    /// Panics when there is no successor.
    pub fn content_after(&self, id: &DestinationId) -> C {
        self.destination_after_unchecked(id).content()
    }

    /// Attached and on top
    pub fn is_active(&self, destination: &Destination<C>) -> bool {
        destination.is_attached() && self.is_top_of_stack(destination)
    }

    /// On top by identity, regardless of attachment
    pub fn is_top_of_stack(&self, destination: &Destination<C>) -> bool {
        self.inner
            .sequence
            .lock()
            .last()
            .is_some_and(|e| e.destination == *destination)
    }

    /// Identity on top, or the initial marker when empty
    pub fn last_destination_id(&self) -> DestinationId {
        self.inner
            .sequence
            .lock()
            .last()
            .map_or_else(
                || self.inner.initial_marker.clone(),
                |e| e.destination.id().clone(),
            )
    }

    /// Non-owning handle, used by observers
    pub fn downgrade(&self) -> WeakNavigationStack<C> {
        WeakNavigationStack {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Debouncer statistics: `(mutations, broadcasts)`
    pub fn notification_stats(&self) -> (u64, u64) {
        (self.inner.debouncer.calls(), self.inner.debouncer.emissions())
    }
}

impl<C: 'static> Clone for NavigationStack<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: 'static> fmt::Debug for NavigationStack<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<DestinationId> = self
            .inner
            .sequence
            .lock()
            .iter()
            .map(|e| e.destination.id().clone())
            .collect();
        f.debug_struct("NavigationStack")
            .field("id", &self.inner.id)
            .field("sequence", &ids)
            .finish()
    }
}

/// Weak counterpart of [`NavigationStack`]
pub struct WeakNavigationStack<C: 'static> {
    inner: Weak<StackInner<C>>,
}

impl<C: 'static> WeakNavigationStack<C> {
    /// Recover the stack if it is still alive
    pub fn upgrade(&self) -> Option<NavigationStack<C>> {
        self.inner.upgrade().map(|inner| NavigationStack { inner })
    }
}

impl<C: 'static> Clone for WeakNavigationStack<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
