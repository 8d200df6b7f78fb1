//! Navigation context
//!
//! Owns the collaborators every stack and link in one application shares: the
//! notification bus, the deferred scheduler and the configuration. Hosts build
//! one context and pass it (or clones of it) to whatever needs to create stacks
//! or bind links.

use std::sync::Arc;

use crate::bus::NotificationBus;
use crate::config::NavigationConfig;
use crate::errors::Result;
use crate::identifiers::StackId;
use crate::link::LinkModel;
use crate::scheduler::{DeferredScheduler, FrameScheduler, TokioScheduler};
use crate::stack::NavigationStack;

/// Shared bus, scheduler and configuration.
#[derive(Clone)]
pub struct NavigationContext {
    bus: NotificationBus,
    scheduler: Arc<dyn DeferredScheduler>,
    config: NavigationConfig,
}

impl NavigationContext {
    /// Build a context around an arbitrary scheduler.
    ///
    /// The configuration is validated first.
    pub fn new(config: NavigationConfig, scheduler: Arc<dyn DeferredScheduler>) -> Result<Self> {
        config.validate()?;
        let bus = NotificationBus::new(config.bus_capacity);
        tracing::debug!(
            debounce_window_ms = config.debounce_window_ms,
            bus_capacity = config.bus_capacity,
            "Navigation context created"
        );
        Ok(Self {
            bus,
            scheduler,
            config,
        })
    }

    /// Context driven by the Tokio runtime the caller is running on
    pub fn tokio(config: NavigationConfig) -> Result<Self> {
        let scheduler = TokioScheduler::current()?;
        Self::new(config, Arc::new(scheduler))
    }

    /// Context driven by a host frame loop.
    ///
    /// Returns the scheduler too; the host must `advance` it every frame.
    pub fn frames(config: NavigationConfig) -> Result<(Self, FrameScheduler)> {
        let scheduler = FrameScheduler::new();
        let context = Self::new(config, Arc::new(scheduler.clone()))?;
        Ok((context, scheduler))
    }

    /// Create a stack publishing on this context's bus
    pub fn stack<C: 'static>(&self, id: StackId) -> NavigationStack<C> {
        NavigationStack::with_config(id, self.bus.clone(), Arc::clone(&self.scheduler), &self.config)
    }

    /// Create an unbound link listening on this context's bus
    pub fn link<C: 'static>(&self) -> LinkModel<C> {
        LinkModel::new(&self.bus)
    }

    /// Create a link bound to `stack`
    pub fn link_for<C: 'static>(&self, stack: &NavigationStack<C>) -> LinkModel<C> {
        LinkModel::bound(&self.bus, stack)
    }

    /// Shared notification bus
    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Scheduler used by every stack's debouncer
    pub fn scheduler(&self) -> &Arc<dyn DeferredScheduler> {
        &self.scheduler
    }

    /// Active configuration
    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }
}

impl std::fmt::Debug for NavigationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationContext")
            .field("bus", &self.bus)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::Destination;
    use crate::errors::NavigationError;
    use std::time::Duration;

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = NavigationConfig {
            bus_capacity: 0,
            ..NavigationConfig::default()
        };
        let err = NavigationContext::frames(config).unwrap_err();
        assert!(matches!(err, NavigationError::InvalidConfig { .. }));
    }

    #[test]
    fn test_tokio_context_requires_runtime() {
        let err = NavigationContext::tokio(NavigationConfig::default()).unwrap_err();
        assert!(matches!(err, NavigationError::SchedulerUnavailable { .. }));
    }

    #[test]
    fn test_stacks_and_links_share_the_bus() {
        let (ctx, frames) = NavigationContext::frames(NavigationConfig::default()).unwrap();
        let stack = ctx.stack::<u32>(StackId::main());
        let link = ctx.link_for(&stack);
        let unbound = ctx.link::<u32>();

        assert_eq!(ctx.bus().subscriber_count(), 2);
        assert!(!unbound.is_bound());

        let d = Destination::with_id("settings", || 7_u32);
        stack.navigate_to(&d);
        frames.advance(Duration::from_millis(ctx.config().debounce_window_ms));

        assert!(link.is_active());
        assert_eq!(link.content(), Some(7));
        assert_eq!(ctx.bus().published(), 1);
    }

    #[tokio::test]
    async fn test_tokio_context_delivers_broadcasts() {
        let ctx = NavigationContext::tokio(NavigationConfig::default()).unwrap();
        let mut rx = ctx.bus().receiver();
        let stack = ctx.stack::<&'static str>(StackId::secondary());

        stack.navigate_to(&Destination::with_id("detail", || "detail"));
        let broadcast = rx.recv().await.unwrap();
        assert!(broadcast.concerns(&StackId::secondary()));
    }
}
