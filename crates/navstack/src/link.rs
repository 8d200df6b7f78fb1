//! # Link Model
//!
//! Per-rendering-site observer of one navigation stack. A rendering site that
//! may push something (a list row, a button) owns a [`LinkModel`]. The model:
//!
//! 1. binds to a stack once, remembering which destination was on top at that
//!    moment (or the initial marker if none was);
//! 2. listens on the bus, ignoring broadcasts for other stacks;
//! 3. on each relevant broadcast re-derives whether "the destination right
//!    after mine" is now the active top of the stack, and if so holds on to it
//!    so its content can be rendered;
//! 4. drops the destination when something else detached it, and detaches it
//!    itself when the host reports the link was dismissed (back gesture).
//!
//! The stack is held weakly. A model bound to a stack that no longer exists
//! ignores everything.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::bus::{Broadcast, BusSubscriber, NotificationBus, Subscription, Topic};
use crate::destination::Destination;
use crate::identifiers::{DestinationId, StackId};
use crate::stack::{NavigationStack, WeakNavigationStack};

struct Binding<C: 'static> {
    stack: WeakNavigationStack<C>,
    stack_id: StackId,
    last_destination_id: DestinationId,
}

struct LinkState<C: 'static> {
    binding: Option<Binding<C>>,
    destination: Option<Destination<C>>,
    is_active: bool,
}

struct LinkInner<C: 'static> {
    state: Mutex<LinkState<C>>,
}

impl<C: 'static> LinkInner<C> {
    fn bind(&self, stack: &NavigationStack<C>) -> bool {
        let mut state = self.state.lock();
        if let Some(existing) = &state.binding {
            tracing::trace!(
                bound = %existing.stack_id,
                requested = %stack.id(),
                "Link already bound; rebind ignored"
            );
            return false;
        }
        state.binding = Some(Binding {
            stack: stack.downgrade(),
            stack_id: stack.id().clone(),
            last_destination_id: stack.last_destination_id(),
        });
        true
    }

    fn resync(&self, stack_id: &StackId) {
        let mut state = self.state.lock();

        let Some(binding) = &state.binding else {
            return;
        };
        if binding.stack_id != *stack_id {
            return;
        }
        let Some(stack) = binding.stack.upgrade() else {
            return;
        };
        let after = binding.last_destination_id.clone();

        if let Some(current) = &state.destination {
            if !current.is_attached() {
                tracing::debug!(
                    stack = %stack_id,
                    destination = %current.id(),
                    "Linked destination was detached externally"
                );
                state.is_active = false;
                state.destination = None;
                return;
            }
        }

        if let Some(next) = stack.destination_after(&after) {
            if stack.is_active(&next) {
                state.is_active = true;
                state.destination = Some(next);
            }
        }
    }

    fn release(&self) -> Option<Destination<C>> {
        let mut state = self.state.lock();
        state.is_active = false;
        state.destination.take()
    }
}

impl<C: 'static> BusSubscriber for LinkInner<C> {
    fn on_broadcast(&self, broadcast: &Broadcast) {
        if broadcast.topic() != &Topic::StackChanged {
            return;
        }
        match broadcast.stack_id() {
            Ok(Some(stack_id)) => self.resync(stack_id),
            Ok(None) => {}
            // Bus protocol violation: a stack-changed broadcast must name its stack
            Err(err) => panic!("{err}"),
        }
    }
}

impl<C: 'static> Drop for LinkInner<C> {
    fn drop(&mut self) {
        if let Some(destination) = self.state.get_mut().destination.take() {
            tracing::debug!(destination = %destination.id(), "Link dropped; releasing destination");
            destination.detach();
        }
    }
}

/// Observer binding for one rendering site.
pub struct LinkModel<C: 'static> {
    inner: Arc<LinkInner<C>>,
    _subscription: Subscription,
}

impl<C: 'static> LinkModel<C> {
    /// Create an unbound model listening on `bus`
    pub fn new(bus: &NotificationBus) -> Self {
        let inner = Arc::new(LinkInner {
            state: Mutex::new(LinkState {
                binding: None,
                destination: None,
                is_active: false,
            }),
        });
        let subscription = bus.subscribe(inner.clone());
        Self {
            inner,
            _subscription: subscription,
        }
    }

    /// Create a model already bound to `stack`
    pub fn bound(bus: &NotificationBus, stack: &NavigationStack<C>) -> Self {
        let link = Self::new(bus);
        link.bind(stack);
        link
    }

    /// Bind to `stack`. First write wins; later calls return `false`.
    pub fn bind(&self, stack: &NavigationStack<C>) -> bool {
        self.inner.bind(stack)
    }

    /// Whether this model has been bound
    pub fn is_bound(&self) -> bool {
        self.inner.state.lock().binding.is_some()
    }

    /// Identity of the bound stack
    pub fn stack_id(&self) -> Option<StackId> {
        self.inner
            .state
            .lock()
            .binding
            .as_ref()
            .map(|b| b.stack_id.clone())
    }

    /// The bound stack, if it is still alive
    pub fn stack(&self) -> Option<NavigationStack<C>> {
        self.inner
            .state
            .lock()
            .binding
            .as_ref()
            .and_then(|b| b.stack.upgrade())
    }

    /// Top of the stack captured at bind time
    pub fn last_destination_id(&self) -> Option<DestinationId> {
        self.inner
            .state
            .lock()
            .binding
            .as_ref()
            .map(|b| b.last_destination_id.clone())
    }

    /// Whether the destination after this site is currently presented
    pub fn is_active(&self) -> bool {
        self.inner.state.lock().is_active
    }

    /// Destination presented from this site
    pub fn destination(&self) -> Option<Destination<C>> {
        self.inner.state.lock().destination.clone()
    }

    /// Content of the destination presented from this site
    pub fn content(&self) -> Option<C> {
        // Factory runs outside the lock
        self.destination().map(|d| d.content())
    }

    /// Host-driven activation change.
    ///
    /// Going from active to inactive while the held destination is on top of
    /// the stack detaches it; this is how a back gesture pops without an
    /// explicit `pop_to`.
    pub fn set_active(&self, active: bool) {
        let mut state = self.inner.state.lock();
        let was_active = state.is_active;
        state.is_active = active;

        if !(was_active && !active) {
            return;
        }
        let (Some(destination), Some(binding)) = (&state.destination, &state.binding) else {
            return;
        };
        let Some(stack) = binding.stack.upgrade() else {
            return;
        };
        if !stack.is_top_of_stack(destination) {
            return;
        }
        drop(state);

        if let Some(destination) = self.inner.release() {
            tracing::debug!(stack = %stack.id(), destination = %destination.id(), "Link dismissed");
            destination.detach();
        }
    }

    /// Route one broadcast through this model directly.
    ///
    /// Used by hosts that consume the bus's async stream instead of the
    /// synchronous subscription.
    pub fn handle_broadcast(&self, broadcast: &Broadcast) {
        self.inner.on_broadcast(broadcast);
    }
}

impl<C: 'static> fmt::Debug for LinkModel<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("LinkModel")
            .field("stack_id", &state.binding.as_ref().map(|b| &b.stack_id))
            .field("destination", &state.destination.as_ref().map(Destination::id))
            .field("is_active", &state.is_active)
            .finish()
    }
}
