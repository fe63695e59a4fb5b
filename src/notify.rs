//! Per-entity change-notification bus.
//!
//! Every stateful entity carries a [`Notifier`]. Listeners register against a
//! single field or the `"*"` wildcard and fire synchronously, in subscription
//! order, immediately after the mutation they describe has been committed.
//! Parent aggregates re-publish child events under a namespaced field key
//! (e.g. a `Table` state change surfaces to `Game` listeners as field
//! `"table"` with the child's property name as the mutation key).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

/// Structured description of a committed mutation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Mutation {
    /// Scalar field replaced wholesale.
    Replace,
    /// Element appended to a collection field.
    Append,
    /// Element inserted into a collection field.
    Insert { index: usize },
    /// Element removed from a collection field.
    Remove { index: usize },
    /// Keyed entry updated. Parents re-publishing a child's change use the
    /// child's own field name as the key.
    Update { key: String },
}

/// A committed change on one field of an entity.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChangeEvent {
    pub field: String,
    pub mutation: Mutation,
}

/// Handle returned by [`Notifier::subscribe`], usable for unsubscription.
pub type SubscriptionId = u64;

/// Field name that subscribes a listener to every field.
pub const WILDCARD: &str = "*";

type Callback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    /// `None` means the wildcard.
    field: Option<String>,
    callback: Callback,
}

#[derive(Default)]
struct NotifierInner {
    subscriptions: Mutex<Vec<Subscription>>,
    next_id: AtomicU64,
}

/// Synchronous publish/subscribe registry carried by each stateful entity.
///
/// Cloning a `Notifier` clones the handle, not the subscriber list, so a
/// parent can capture its own notifier inside a closure subscribed to a
/// child without creating an ownership cycle.
#[derive(Clone, Default)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `field`, or for every field when `field`
    /// is [`WILDCARD`].
    pub fn subscribe<F>(&self, field: &str, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let field = (field != WILDCARD).then(|| field.to_string());
        let mut subscriptions = self
            .inner
            .subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        subscriptions.push(Subscription {
            id,
            field,
            callback: Arc::new(callback),
        });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subscriptions = self
            .inner
            .subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        subscriptions.retain(|s| s.id != id);
    }

    /// Fire all matching listeners for a committed mutation.
    pub fn emit(&self, field: &str, mutation: Mutation) {
        let event = ChangeEvent {
            field: field.to_string(),
            mutation,
        };
        // Collect callbacks under the lock, invoke outside it so a listener
        // may subscribe or unsubscribe re-entrantly without deadlocking.
        let callbacks: Vec<Callback> = {
            let subscriptions = self
                .inner
                .subscriptions
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            subscriptions
                .iter()
                .filter(|s| s.field.as_deref().is_none_or(|f| f == field))
                .map(|s| Arc::clone(&s.callback))
                .collect()
        };
        for callback in callbacks {
            callback(&event);
        }
    }

    /// Re-publish every event from `child` under `field` on this notifier,
    /// keyed by the child's own field name.
    pub fn relay_from(&self, field: &'static str, child: &Notifier) -> SubscriptionId {
        let parent = self.clone();
        child.subscribe(WILDCARD, move |event| {
            parent.emit(
                field,
                Mutation::Update {
                    key: event.field.clone(),
                },
            );
        })
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_field_subscription_only_fires_for_matching_field() {
        let notifier = Notifier::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        notifier.subscribe("state", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        notifier.emit("state", Mutation::Replace);
        notifier.emit("turn", Mutation::Replace);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wildcard_subscription_fires_for_every_field() {
        let notifier = Notifier::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        notifier.subscribe(WILDCARD, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        notifier.emit("state", Mutation::Replace);
        notifier.emit("cards", Mutation::Append);

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_listeners_fire_in_subscription_order() {
        let notifier = Notifier::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            notifier.subscribe(WILDCARD, move |_| {
                order.lock().unwrap().push(tag);
            });
        }

        notifier.emit("state", Mutation::Replace);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe_removes_listener() {
        let notifier = Notifier::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = notifier.subscribe(WILDCARD, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        notifier.emit("state", Mutation::Replace);
        notifier.unsubscribe(id);
        notifier.emit("state", Mutation::Replace);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_relay_namespaces_child_events() {
        let parent = Notifier::new();
        let child = Notifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        parent.subscribe(WILDCARD, move |event| {
            sink.lock().unwrap().push(event.clone());
        });

        parent.relay_from("table", &child);
        child.emit("state", Mutation::Replace);

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].field, "table");
        assert_eq!(
            events[0].mutation,
            Mutation::Update {
                key: "state".to_string()
            }
        );
    }
}
