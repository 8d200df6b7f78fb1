//! Branch switching demo
//!
//! Two navigation branches share one bus: the "main" branch (inbox -> thread)
//! and the "secondary" branch (search -> result). A root router owns both and
//! clears the active branch before switching, so coming back to a branch
//! always starts from its root. A custom-topic broadcast asks the router to
//! replace the top screen of a branch.
//!
//! Run with `RUST_LOG=navstack=debug cargo run --example branch_switch`.

use std::sync::Arc;

use navstack::prelude::*;
use navstack::Subscription;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

const REPLACE_TOPIC: &str = "replace-screen";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Main,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Screen {
    Thread(u32),
    Result(String),
    Notice(&'static str),
}

struct Router {
    main: NavigationStack<Screen>,
    secondary: NavigationStack<Screen>,
    active: Mutex<Branch>,
}

impl Router {
    fn new(ctx: &NavigationContext) -> Self {
        Self {
            main: ctx.stack(StackId::main()),
            secondary: ctx.stack(StackId::secondary()),
            active: Mutex::new(Branch::Main),
        }
    }

    fn stack(&self, branch: Branch) -> &NavigationStack<Screen> {
        match branch {
            Branch::Main => &self.main,
            Branch::Secondary => &self.secondary,
        }
    }

    fn switch_to(&self, branch: Branch) {
        let mut active = self.active.lock();
        if *active == branch {
            return;
        }
        let cleared = self.stack(*active).pop_all();
        tracing::info!(from = ?*active, to = ?branch, cleared, "Switching branch");
        *active = branch;
    }

    fn current(&self) -> NavigationStack<Screen> {
        self.stack(*self.active.lock()).clone()
    }

    /// Replace the top of the stack named by a custom broadcast
    fn replace_top(&self, stack_id: &StackId, with: Destination<Screen>) {
        let stack = if *stack_id == StackId::secondary() {
            &self.secondary
        } else {
            &self.main
        };
        if let Some(top) = stack.destinations().last() {
            stack.pop_to(top);
        }
        stack.navigate_to(&with);
    }
}

fn listen_for_replacements(ctx: &NavigationContext, router: &Arc<Router>) -> Subscription {
    let router = Arc::clone(router);
    ctx.bus().subscribe_fn(move |broadcast| {
        if broadcast.topic() != &Topic::Custom(REPLACE_TOPIC.to_string()) {
            return;
        }
        match broadcast.stack_id() {
            Ok(Some(stack_id)) => {
                let notice = Screen::Notice("moved").as_destination_with_id("notice");
                router.replace_top(stack_id, notice);
            }
            Ok(None) => tracing::warn!("Replace request without a stack identity"),
            Err(err) => tracing::warn!(error = %err, "Rejected replace request"),
        }
    })
}

async fn settle(ctx: &NavigationContext) {
    tokio::time::sleep(ctx.config().debounce_window() * 3).await;
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> navstack::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = NavigationConfig::default();
    config.merge_with_env()?;
    let ctx = NavigationContext::tokio(config)?;
    let router = Arc::new(Router::new(&ctx));
    let _replacements = listen_for_replacements(&ctx, &router);

    // Root links of each branch, as the host would render them
    let main_link = ctx.link_for(&router.main);
    let secondary_link = ctx.link_for(&router.secondary);

    let thread = Screen::Thread(42).as_destination_with_id("thread-42");
    router.current().navigate_to(&thread);
    settle(&ctx).await;
    tracing::info!(content = ?main_link.content(), "Main branch presented");

    router.switch_to(Branch::Secondary);
    let result = Screen::Result("rust".into()).as_destination_with_id("result-rust");
    router.current().navigate_to(&result);
    settle(&ctx).await;
    tracing::info!(
        main_active = main_link.is_active(),
        secondary = ?secondary_link.content(),
        "Switched to secondary"
    );

    ctx.bus()
        .publish(Broadcast::custom(REPLACE_TOPIC, Some(StackId::secondary())));
    settle(&ctx).await;
    tracing::info!(
        top = ?router.secondary.destinations().last().map(Destination::content),
        "Secondary top replaced"
    );

    router.switch_to(Branch::Main);
    settle(&ctx).await;
    tracing::info!(
        secondary_len = router.secondary.len(),
        thread_attached = thread.is_attached(),
        "Back on main"
    );

    Ok(())
}
