//! Subscriptions held by a bound table and lifecycle hooks.
//!
//! A table watches its source path, the contents of the bound collection,
//! each column filter and the widget's visibility and search events. All of
//! them are registered here and released together on teardown, after which
//! the controller ignores every event.

use std::fmt;

use log::debug;

use crate::controller::TableId;

/// Something the table listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subscription {
    /// The collection reference at the bound path.
    Source,
    /// Items of the bound collection.
    Contents,
    /// Value of one column filter.
    Filter(usize),
    /// Column visibility changes of the widget.
    ColumnVisibility,
    /// Search passes of the widget.
    Search,
}

type Hook = Box<dyn Fn(&TableId) + Send + Sync>;

/// Host callbacks for widget lifecycle events.
#[derive(Default)]
pub struct LifecycleHooks {
    /// Called after a widget instance is created (or re-created).
    pub on_create: Option<Hook>,
    /// Called after a stale widget instance was destroyed.
    pub on_stale: Option<Hook>,
    /// Called on teardown.
    pub on_teardown: Option<Hook>,
}

impl fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("on_create", &self.on_create.is_some())
            .field("on_stale", &self.on_stale.is_some())
            .field("on_teardown", &self.on_teardown.is_some())
            .finish()
    }
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_create(mut self, hook: impl Fn(&TableId) + Send + Sync + 'static) -> Self {
        self.on_create = Some(Box::new(hook));
        self
    }

    pub fn on_stale(mut self, hook: impl Fn(&TableId) + Send + Sync + 'static) -> Self {
        self.on_stale = Some(Box::new(hook));
        self
    }

    pub fn on_teardown(mut self, hook: impl Fn(&TableId) + Send + Sync + 'static) -> Self {
        self.on_teardown = Some(Box::new(hook));
        self
    }

    pub fn call_on_create(&self, id: &TableId) {
        if let Some(hook) = &self.on_create {
            hook(id);
        }
    }

    pub fn call_on_stale(&self, id: &TableId) {
        if let Some(hook) = &self.on_stale {
            hook(id);
        }
    }

    pub fn call_on_teardown(&self, id: &TableId) {
        if let Some(hook) = &self.on_teardown {
            hook(id);
        }
    }
}

/// Registry of live subscriptions.
#[derive(Debug, Default)]
pub struct Lifecycle {
    active: Vec<Subscription>,
    disposed: bool,
    pub hooks: LifecycleHooks,
}

impl Lifecycle {
    pub fn new(hooks: LifecycleHooks) -> Self {
        Self {
            active: Vec::new(),
            disposed: false,
            hooks,
        }
    }

    /// Register a subscription. Ignored after disposal or if already active.
    pub fn subscribe(&mut self, subscription: Subscription) {
        if !self.disposed && !self.active.contains(&subscription) {
            self.active.push(subscription);
        }
    }

    pub fn is_active(&self, subscription: Subscription) -> bool {
        self.active.contains(&subscription)
    }

    pub fn active(&self) -> &[Subscription] {
        &self.active
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release every subscription, returning what was released.
    pub fn dispose(&mut self) -> Vec<Subscription> {
        self.disposed = true;
        let released = std::mem::take(&mut self.active);
        debug!("Released {} subscriptions", released.len());
        released
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_subscribe_is_idempotent() {
        let mut lifecycle = Lifecycle::default();
        lifecycle.subscribe(Subscription::Source);
        lifecycle.subscribe(Subscription::Source);
        lifecycle.subscribe(Subscription::Filter(2));
        assert_eq!(lifecycle.active().len(), 2);
        assert!(lifecycle.is_active(Subscription::Filter(2)));
        assert!(!lifecycle.is_active(Subscription::Filter(1)));
    }

    #[test]
    fn test_dispose_releases_everything() {
        let mut lifecycle = Lifecycle::default();
        lifecycle.subscribe(Subscription::Source);
        lifecycle.subscribe(Subscription::Contents);
        let released = lifecycle.dispose();
        assert_eq!(released, vec![Subscription::Source, Subscription::Contents]);
        assert!(lifecycle.active().is_empty());

        lifecycle.subscribe(Subscription::Search);
        assert!(!lifecycle.is_active(Subscription::Search));
    }

    #[test]
    fn test_hooks_are_called() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let hooks = LifecycleHooks::new().on_teardown(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let id = TableId::new();
        hooks.call_on_teardown(&id);
        hooks.call_on_create(&id);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
