//! # Destination Records
//!
//! A [`Destination`] pairs a [`DestinationId`] with a lazily invoked content
//! factory and an attachment state. It is a shared handle: application code
//! usually builds one ahead of time (cached on a view model) and hands clones to
//! a stack, so the same record is reused across re-renders.
//!
//! ## Attachment
//!
//! A record is attached iff it holds an [`AttachmentHandle`]. A handle is
//! issued by exactly one stack per attach and carries a fresh
//! [`AttachmentToken`]. The record accepts a detach only for the token it
//! currently holds; a stale token from an earlier owner is ignored, so it can
//! never evict a record that has since moved to another stack.
//!
//! Equality and hashing delegate entirely to the identifier.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::identifiers::{AttachmentToken, DestinationId, StackId};

/// Produces the renderable content of a destination.
///
/// May be invoked any number of times, so it should be free of side effects.
pub trait ContentFactory<C>: Send + Sync {
    /// Build the content
    fn produce(&self) -> C;
}

impl<C, F> ContentFactory<C> for F
where
    F: Fn() -> C + Send + Sync,
{
    fn produce(&self) -> C {
        self()
    }
}

/// Callback side of an attachment: removes a record from the sequence that
/// owns it. Implemented by the navigation stack.
pub(crate) trait Detacher<C>: Send + Sync {
    fn release(&self, destination: &Destination<C>, token: AttachmentToken);
}

/// Capability issued by a stack to a record it has attached.
pub struct AttachmentHandle<C: 'static> {
    token: AttachmentToken,
    stack_id: StackId,
    owner: Weak<dyn Detacher<C>>,
}

impl<C: 'static> AttachmentHandle<C> {
    pub(crate) fn issue(stack_id: StackId, owner: Weak<dyn Detacher<C>>) -> Self {
        Self {
            token: AttachmentToken::issue(),
            stack_id,
            owner,
        }
    }

    /// Token this handle was issued with
    pub fn token(&self) -> AttachmentToken {
        self.token
    }

    /// Stack that issued this handle
    pub fn stack_id(&self) -> &StackId {
        &self.stack_id
    }
}

impl<C: 'static> Clone for AttachmentHandle<C> {
    fn clone(&self) -> Self {
        Self {
            token: self.token,
            stack_id: self.stack_id.clone(),
            owner: self.owner.clone(),
        }
    }
}

impl<C: 'static> PartialEq for AttachmentHandle<C> {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl<C: 'static> Eq for AttachmentHandle<C> {}

impl<C: 'static> fmt::Debug for AttachmentHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentHandle")
            .field("token", &self.token)
            .field("stack_id", &self.stack_id)
            .finish()
    }
}

struct DestinationInner<C: 'static> {
    id: DestinationId,
    factory: Box<dyn ContentFactory<C>>,
    handle: Mutex<Option<AttachmentHandle<C>>>,
    active: AtomicBool,
}

/// A navigable destination: identity, content factory and attachment state.
pub struct Destination<C: 'static> {
    inner: Arc<DestinationInner<C>>,
}

impl<C: 'static> Destination<C> {
    /// Create a destination with a freshly generated identity
    pub fn new<F>(factory: F) -> Self
    where
        F: ContentFactory<C> + 'static,
    {
        Self::with_id(DestinationId::generate(), factory)
    }

    /// Create a destination with an explicit identity.
    ///
    /// Use this when the destination depends on input, so that rebuilding it
    /// for the same input yields the same navigation target.
    pub fn with_id<F>(id: impl Into<DestinationId>, factory: F) -> Self
    where
        F: ContentFactory<C> + 'static,
    {
        Self {
            inner: Arc::new(DestinationInner {
                id: id.into(),
                factory: Box::new(factory),
                handle: Mutex::new(None),
                active: AtomicBool::new(true),
            }),
        }
    }

    /// Identity of this destination
    pub fn id(&self) -> &DestinationId {
        &self.inner.id
    }

    /// Invoke the content factory
    pub fn content(&self) -> C {
        self.inner.factory.produce()
    }

    /// Whether some stack currently owns this record
    pub fn is_attached(&self) -> bool {
        self.inner.handle.lock().is_some()
    }

    /// Token of the current attachment, if any
    pub fn attachment_token(&self) -> Option<AttachmentToken> {
        self.inner.handle.lock().as_ref().map(AttachmentHandle::token)
    }

    /// Stack that currently owns this record, if any
    pub fn owner_stack_id(&self) -> Option<StackId> {
        self.inner
            .handle
            .lock()
            .as_ref()
            .map(|h| h.stack_id().clone())
    }

    /// Record-level "presented" flag. Reset to `true` on every attach.
    pub fn is_active_flag(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Set the record-level flag; clearing it releases the record from its stack.
    pub fn set_active_flag(&self, active: bool) {
        self.inner.active.store(active, Ordering::Release);
        if !active {
            self.detach();
        }
    }

    /// Release this record from the stack that owns it ("close myself").
    ///
    /// No-op when unattached. If the owning stack no longer exists the record
    /// just drops its handle.
    pub fn detach(&self) {
        let current = self.inner.handle.lock().clone();
        let Some(handle) = current else {
            tracing::trace!(destination = %self.id(), "Detach of unattached destination ignored");
            return;
        };

        match handle.owner.upgrade() {
            Some(owner) => owner.release(self, handle.token),
            None => {
                tracing::debug!(
                    destination = %self.id(),
                    stack = %handle.stack_id,
                    "Owning stack dropped; clearing attachment"
                );
                self.detach_with(handle.token);
            }
        }
    }

    /// Attach under `handle` unless already attached. Returns whether it took.
    pub(crate) fn try_attach(&self, handle: AttachmentHandle<C>) -> bool {
        let mut slot = self.inner.handle.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(handle);
        self.inner.active.store(true, Ordering::Release);
        true
    }

    /// Drop the attachment if it was issued with `token`.
    ///
    /// Unattached records and mismatched tokens are left untouched.
    pub(crate) fn detach_with(&self, token: AttachmentToken) -> bool {
        let mut slot = self.inner.handle.lock();
        match slot.as_ref() {
            Some(current) if current.token == token => {
                *slot = None;
                true
            }
            Some(_) => {
                tracing::trace!(destination = %self.id(), "Stale attachment token ignored");
                false
            }
            None => false,
        }
    }
}

impl<C: 'static> Clone for Destination<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: 'static> PartialEq for Destination<C> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<C: 'static> Eq for Destination<C> {}

impl<C: 'static> Hash for Destination<C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl<C: 'static> fmt::Debug for Destination<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("id", &self.inner.id)
            .field("attachment", &self.attachment_token())
            .finish()
    }
}

/// Wrap a content value as a destination whose factory clones it.
pub trait IntoDestination: Clone + Send + Sync + Sized + 'static {
    /// Destination with a generated identity
    fn as_destination(&self) -> Destination<Self> {
        let content = self.clone();
        Destination::new(move || content.clone())
    }

    /// Destination with an explicit identity
    fn as_destination_with_id(&self, id: impl Into<DestinationId>) -> Destination<Self> {
        let content = self.clone();
        Destination::with_id(id, move || content.clone())
    }
}

impl<T> IntoDestination for T where T: Clone + Send + Sync + 'static {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;

    struct NullOwner;

    impl Detacher<&'static str> for NullOwner {
        fn release(&self, destination: &Destination<&'static str>, token: AttachmentToken) {
            destination.detach_with(token);
        }
    }

    fn handle_from(owner: &Arc<NullOwner>) -> AttachmentHandle<&'static str> {
        let owner: Arc<dyn Detacher<&'static str>> = owner.clone();
        AttachmentHandle::issue(StackId::main(), Arc::downgrade(&owner))
    }

    #[test]
    fn test_equality_follows_identity() {
        let a: Destination<&str> = Destination::with_id("chat-7", || "first");
        let b: Destination<&str> = Destination::with_id("chat-7", || "second");
        let c: Destination<&str> = Destination::with_id("chat-8", || "first");

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_content_factory_is_lazy_and_repeatable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let d = Destination::new(move || counted.fetch_add(1, Ordering::SeqCst));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(d.content(), 0);
        assert_eq!(d.content(), 1);
    }

    #[test]
    fn test_attach_is_exclusive() {
        let owner = Arc::new(NullOwner);
        let d: Destination<&str> = Destination::new(|| "x");

        assert!(d.try_attach(handle_from(&owner)));
        let first = d.attachment_token();
        assert!(!d.try_attach(handle_from(&owner)));
        assert_eq!(d.attachment_token(), first);
        assert_eq!(d.owner_stack_id(), Some(StackId::main()));
    }

    #[test]
    fn test_stale_token_cannot_detach() {
        let owner = Arc::new(NullOwner);
        let d: Destination<&str> = Destination::new(|| "x");

        let old = handle_from(&owner);
        let old_token = old.token();
        assert!(d.try_attach(old));
        assert!(d.detach_with(old_token));

        assert!(d.try_attach(handle_from(&owner)));
        assert!(!d.detach_with(old_token));
        assert!(d.is_attached());
    }

    #[test]
    fn test_detach_is_idempotent() {
        let owner = Arc::new(NullOwner);
        let d: Destination<&str> = Destination::new(|| "x");
        d.try_attach(handle_from(&owner));

        d.detach();
        assert!(!d.is_attached());
        d.detach();
        assert!(!d.is_attached());
    }

    #[test]
    fn test_detach_without_owner_clears_handle() {
        let owner = Arc::new(NullOwner);
        let d: Destination<&str> = Destination::new(|| "x");
        d.try_attach(handle_from(&owner));
        drop(owner);

        d.detach();
        assert!(!d.is_attached());
    }

    #[test]
    fn test_active_flag() {
        let owner = Arc::new(NullOwner);
        let d: Destination<&str> = Destination::new(|| "x");
        d.try_attach(handle_from(&owner));
        assert!(d.is_active_flag());

        d.set_active_flag(false);
        assert!(!d.is_active_flag());
        assert!(!d.is_attached());

        // Attaching again re-arms the flag
        d.try_attach(handle_from(&owner));
        assert!(d.is_active_flag());
    }

    #[test]
    fn test_into_destination() {
        let d = String::from("profile").as_destination_with_id("profile");
        assert_eq!(d.id(), &DestinationId::new("profile"));
        assert_eq!(d.content(), "profile");

        let e = 42_u32.as_destination();
        assert_eq!(e.content(), 42);
        assert_ne!(e.id(), d.id());
    }
}
