//! Navstack - Coordinator-Pattern Navigation Stack
//!
//! A navigation coordinator for declarative UI hosts. Screens push destinations
//! by value instead of owning their child screens; the stack owns the sequence
//! and everything else observes it.
//!
//! # Architecture
//!
//! ## Records and Ownership
//! - `Destination`: identity + lazy content factory + attachment state
//! - `AttachmentHandle`: capability issued by exactly one stack per attach
//! - `NavigationStack`: ordered, duplicate-free sequence of attached records
//!
//! ## Notifications
//! - `Debouncer`: coalesces a burst of mutations into one emission
//! - `NotificationBus`: topic broadcast shared by every stack in a context
//! - `DeferredScheduler`: Tokio-backed or host frame-driven deferral
//!
//! ## Observers
//! - `LinkModel`: per rendering site; tracks "the destination after mine"
//! - `NavigationContext`: owns the bus, scheduler and configuration
//!
//! ## Guarantees
//! - A record is attached to at most one stack at a time
//! - Queries observe mutations synchronously; observers are told once per burst
//! - Popping detaches every removed record before the sequence shrinks

#![forbid(unsafe_code)]

/// Topic broadcasts and subscriptions
pub mod bus;

/// Layered configuration
pub mod config;

/// Context owning the shared collaborators
pub mod context;

/// Single-shot coalescing debouncer
pub mod debounce;

/// Destination records and attachment handles
pub mod destination;

/// Unified error handling
pub mod errors;

/// Destination, stack and attachment identifiers
pub mod identifiers;

/// Per-site observer binding
pub mod link;

/// Deferred task hosts
pub mod scheduler;

/// The navigation stack
pub mod stack;

pub use bus::{Broadcast, BusSubscriber, NotificationBus, Subscription, SubscriptionId, Topic};
pub use config::NavigationConfig;
pub use context::NavigationContext;
pub use debounce::Debouncer;
pub use destination::{AttachmentHandle, ContentFactory, Destination, IntoDestination};
pub use errors::{NavigationError, Result};
pub use identifiers::{AttachmentToken, DestinationId, StackId};
pub use link::LinkModel;
pub use scheduler::{DeferredScheduler, DeferredTask, FrameScheduler, TokioScheduler};
pub use stack::{NavigationStack, WeakNavigationStack};

/// Common imports for hosts
pub mod prelude {
    pub use crate::{
        Broadcast, Destination, DestinationId, IntoDestination, LinkModel, NavigationConfig,
        NavigationContext, NavigationError, NavigationStack, NotificationBus, StackId, Topic,
    };
}
