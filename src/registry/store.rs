//! Subscription registry implementation
//!
//! The central registry that tracks every live subscriber across the three
//! topologies and hands consistent snapshots of them to the broadcast engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::config::RegistryConfig;
use super::frame::{SubscriptionKey, Topology};
use super::subscriber::{Subscriber, SubscriberId, Subscription};

/// observer id -> agent id -> subscriber
type NestedIndex = HashMap<String, HashMap<String, Arc<Subscriber>>>;

#[derive(Default)]
struct Indexes {
    /// observer id -> subscriber
    overview: HashMap<String, Arc<Subscriber>>,
    detail: NestedIndex,
    events: NestedIndex,
}

impl Indexes {
    fn nested(&self, topology: Topology) -> Option<&NestedIndex> {
        match topology {
            Topology::Overview => None,
            Topology::Detail => Some(&self.detail),
            Topology::Events => Some(&self.events),
        }
    }

    /// Insert under the subscriber's key, returning whatever was there
    fn insert(&mut self, subscriber: Arc<Subscriber>) -> Option<Arc<Subscriber>> {
        let key = subscriber.key().clone();
        let index = match key.topology {
            Topology::Overview => return self.overview.insert(key.observer_id, subscriber),
            Topology::Detail => &mut self.detail,
            Topology::Events => &mut self.events,
        };

        index
            .entry(key.observer_id)
            .or_default()
            .insert(key.agent_id.unwrap_or_default(), subscriber)
    }

    fn get(&self, key: &SubscriptionKey) -> Option<&Arc<Subscriber>> {
        match self.nested(key.topology) {
            Some(index) => index
                .get(&key.observer_id)?
                .get(key.agent_id.as_deref()?),
            None => self.overview.get(&key.observer_id),
        }
    }

    /// Remove the entry under `key` if `only` is `None` or matches its id
    ///
    /// Empty inner maps are removed with their last entry.
    fn remove(&mut self, key: &SubscriptionKey, only: Option<SubscriberId>) -> Option<Arc<Subscriber>> {
        let matches = |sub: &Arc<Subscriber>| only.map_or(true, |id| sub.id() == id);

        let index = match key.topology {
            Topology::Overview => {
                if !self.overview.get(&key.observer_id).is_some_and(matches) {
                    return None;
                }
                return self.overview.remove(&key.observer_id);
            }
            Topology::Detail => &mut self.detail,
            Topology::Events => &mut self.events,
        };

        let agent_id = key.agent_id.as_deref()?;
        let inner = index.get_mut(&key.observer_id)?;
        if !inner.get(agent_id).is_some_and(matches) {
            return None;
        }

        let removed = inner.remove(agent_id);
        if inner.is_empty() {
            index.remove(&key.observer_id);
        }
        removed
    }

    fn drain(&mut self) -> Vec<Arc<Subscriber>> {
        let mut all: Vec<Arc<Subscriber>> = self.overview.drain().map(|(_, sub)| sub).collect();
        for index in [&mut self.detail, &mut self.events] {
            all.extend(index.drain().flat_map(|(_, inner)| inner.into_values()));
        }
        all
    }
}

/// Visit every subscriber in `index` watching `agent_id`
fn for_each_watching<F>(index: &NestedIndex, agent_id: &str, f: &mut F)
where
    F: FnMut(&Arc<Subscriber>),
{
    for inner in index.values() {
        if let Some(sub) = inner.get(agent_id) {
            f(sub);
        }
    }
}

/// Number of live subscribers per topology
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryCounts {
    /// Overview subscribers
    pub overview: usize,
    /// Detail subscribers
    pub detail: usize,
    /// Event subscribers
    pub events: usize,
    /// Distinct observer ids across all three indexes
    pub observers: usize,
}

impl RegistryCounts {
    /// Total subscribers
    pub fn total(&self) -> usize {
        self.overview + self.detail + self.events
    }
}

/// Central registry of active subscribers
///
/// All three indexes sit behind one `RwLock`. Registration and removal take
/// the write half; broadcast iteration takes the read half for the whole
/// visit, so one publish sees one consistent subscriber set. Enqueueing into
/// a subscriber never waits, so the read hold stays short.
pub struct SubscriptionRegistry {
    indexes: RwLock<Indexes>,

    next_subscriber_id: AtomicU64,

    /// Configuration
    config: RegistryConfig,
}

impl SubscriptionRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            indexes: RwLock::new(Indexes::default()),
            next_subscriber_id: AtomicU64::new(1),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Subscribe `observer_id` to frames from every agent
    ///
    /// An existing overview subscription for the same observer is superseded:
    /// it stops receiving but is not closed here.
    pub async fn register_overview(&self, observer_id: &str) -> Subscription {
        self.register(SubscriptionKey::overview(observer_id)).await
    }

    /// Subscribe `observer_id` to frames from `agent_id`
    pub async fn register_detail(&self, observer_id: &str, agent_id: &str) -> Subscription {
        self.register(SubscriptionKey::detail(observer_id, agent_id))
            .await
    }

    /// Subscribe `observer_id` to events from `agent_id`
    pub async fn register_events(&self, observer_id: &str, agent_id: &str) -> Subscription {
        self.register(SubscriptionKey::events(observer_id, agent_id))
            .await
    }

    async fn register(&self, key: SubscriptionKey) -> Subscription {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let subscription = Subscriber::new(id, key, &self.config);
        let subscriber = Arc::clone(subscription.subscriber());

        let previous = self.indexes.write().await.insert(Arc::clone(&subscriber));

        match previous {
            Some(prev) => tracing::debug!(
                subscription = %subscriber.key(),
                subscriber_id = id,
                superseded_id = prev.id(),
                "Subscriber registered, superseding previous"
            ),
            None => tracing::debug!(
                subscription = %subscriber.key(),
                subscriber_id = id,
                "Subscriber registered"
            ),
        }

        subscription
    }

    /// Remove and close the overview subscriber of `observer_id`
    ///
    /// Returns whether an entry was removed.
    pub async fn unregister_overview(&self, observer_id: &str) -> bool {
        self.unregister(&SubscriptionKey::overview(observer_id)).await
    }

    /// Remove and close the detail subscriber for (`observer_id`, `agent_id`)
    pub async fn unregister_detail(&self, observer_id: &str, agent_id: &str) -> bool {
        self.unregister(&SubscriptionKey::detail(observer_id, agent_id))
            .await
    }

    /// Remove and close the event subscriber for (`observer_id`, `agent_id`)
    pub async fn unregister_events(&self, observer_id: &str, agent_id: &str) -> bool {
        self.unregister(&SubscriptionKey::events(observer_id, agent_id))
            .await
    }

    /// Remove and close whatever subscriber is registered under `key`
    ///
    /// Removing a missing key is a no-op.
    pub async fn unregister(&self, key: &SubscriptionKey) -> bool {
        let removed = self.indexes.write().await.remove(key, None);

        match removed {
            Some(sub) => {
                sub.close();
                tracing::debug!(
                    subscription = %key,
                    subscriber_id = sub.id(),
                    "Subscriber unregistered"
                );
                true
            }
            None => false,
        }
    }

    /// Tear down one specific subscriber instance
    ///
    /// The registry entry is removed only while it still points at this
    /// subscriber, so a superseded subscriber never evicts its replacement.
    /// The subscriber is closed either way. Returns whether an entry was
    /// removed.
    pub async fn release(&self, subscriber: &Subscriber) -> bool {
        let removed = self
            .indexes
            .write()
            .await
            .remove(subscriber.key(), Some(subscriber.id()))
            .is_some();

        subscriber.close();

        tracing::debug!(
            subscription = %subscriber.key(),
            subscriber_id = subscriber.id(),
            removed,
            "Subscriber released"
        );

        removed
    }

    /// Non-blocking [`release`](Self::release)
    ///
    /// Returns `None` without touching the subscriber if the registry lock is
    /// held; otherwise removes and closes like `release`.
    pub fn try_release(&self, subscriber: &Subscriber) -> Option<bool> {
        let removed = self
            .indexes
            .try_write()
            .ok()?
            .remove(subscriber.key(), Some(subscriber.id()))
            .is_some();

        subscriber.close();

        tracing::debug!(
            subscription = %subscriber.key(),
            subscriber_id = subscriber.id(),
            removed,
            "Subscriber released without waiting"
        );

        Some(removed)
    }

    /// Look up the subscriber currently registered under `key`
    pub async fn get(&self, key: &SubscriptionKey) -> Option<Arc<Subscriber>> {
        self.indexes.read().await.get(key).cloned()
    }

    /// Visit every overview subscriber
    pub async fn for_each_overview<F>(&self, mut f: F)
    where
        F: FnMut(&Arc<Subscriber>),
    {
        let indexes = self.indexes.read().await;
        indexes.overview.values().for_each(|sub| f(sub));
    }

    /// Visit every detail subscriber watching `agent_id`
    pub async fn for_each_detail<F>(&self, agent_id: &str, mut f: F)
    where
        F: FnMut(&Arc<Subscriber>),
    {
        let indexes = self.indexes.read().await;
        for_each_watching(&indexes.detail, agent_id, &mut f);
    }

    /// Visit every event subscriber watching `agent_id`
    pub async fn for_each_events<F>(&self, agent_id: &str, mut f: F)
    where
        F: FnMut(&Arc<Subscriber>),
    {
        let indexes = self.indexes.read().await;
        for_each_watching(&indexes.events, agent_id, &mut f);
    }

    /// Visit every subscriber a frame from `agent_id` goes to
    ///
    /// Overview subscribers first, then matching detail subscribers, all
    /// under a single read acquisition.
    pub async fn for_each_frame_target<F>(&self, agent_id: &str, mut f: F)
    where
        F: FnMut(&Arc<Subscriber>),
    {
        let indexes = self.indexes.read().await;
        indexes.overview.values().for_each(&mut f);
        for_each_watching(&indexes.detail, agent_id, &mut f);
    }

    /// Subscriber counts per topology
    pub async fn counts(&self) -> RegistryCounts {
        let indexes = self.indexes.read().await;

        let nested_len = |index: &NestedIndex| index.values().map(HashMap::len).sum::<usize>();

        let mut observers: Vec<&str> = indexes
            .overview
            .keys()
            .chain(indexes.detail.keys())
            .chain(indexes.events.keys())
            .map(String::as_str)
            .collect();
        observers.sort_unstable();
        observers.dedup();

        RegistryCounts {
            overview: indexes.overview.len(),
            detail: nested_len(&indexes.detail),
            events: nested_len(&indexes.events),
            observers: observers.len(),
        }
    }

    /// Remove and close every subscriber
    ///
    /// Pumps see their queues end and finish gracefully. Returns the number
    /// of subscribers closed.
    pub async fn close_all(&self) -> usize {
        let drained = self.indexes.write().await.drain();

        let closed = drained.iter().filter(|sub| sub.close()).count();
        tracing::info!(closed, "All subscribers closed");
        closed
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::frame::FrameItem;
    use crate::registry::subscriber::Delivery;

    fn frame(agent: &str, ts: i64) -> Arc<FrameItem> {
        Arc::new(FrameItem::preview(agent, vec![1u8, 2, 3], ts))
    }

    async fn overview_ids(registry: &SubscriptionRegistry) -> Vec<SubscriberId> {
        let mut ids = Vec::new();
        registry.for_each_overview(|sub| ids.push(sub.id())).await;
        ids.sort_unstable();
        ids
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = SubscriptionRegistry::new();

        let overview = registry.register_overview("admin-1").await;
        let detail = registry.register_detail("admin-1", "a1").await;
        let events = registry.register_events("admin-1", "a1").await;

        let found = registry.get(&SubscriptionKey::overview("admin-1")).await.unwrap();
        assert_eq!(found.id(), overview.subscriber().id());
        let found = registry.get(&SubscriptionKey::detail("admin-1", "a1")).await.unwrap();
        assert_eq!(found.id(), detail.subscriber().id());
        let found = registry.get(&SubscriptionKey::events("admin-1", "a1")).await.unwrap();
        assert_eq!(found.id(), events.subscriber().id());

        let counts = registry.counts().await;
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.observers, 1);
    }

    #[tokio::test]
    async fn test_subscriber_ids_unique() {
        let registry = SubscriptionRegistry::new();

        let a = registry.register_overview("admin-1").await;
        let b = registry.register_overview("admin-2").await;
        let c = registry.register_detail("admin-1", "a1").await;

        assert_ne!(a.subscriber().id(), b.subscriber().id());
        assert_ne!(b.subscriber().id(), c.subscriber().id());
    }

    #[tokio::test]
    async fn test_reregister_supersedes() {
        let registry = SubscriptionRegistry::new();

        let first = registry.register_detail("admin-1", "a1").await;
        let second = registry.register_detail("admin-1", "a1").await;

        // One live entry per key, pointing at the newest subscriber
        assert_eq!(registry.counts().await.detail, 1);
        let mut seen = Vec::new();
        registry.for_each_detail("a1", |sub| seen.push(sub.id())).await;
        assert_eq!(seen, vec![second.subscriber().id()]);

        // The superseded subscriber is not closed by the registry
        assert!(!first.subscriber().is_closed());
    }

    #[tokio::test]
    async fn test_unregister_closes_and_prunes() {
        let registry = SubscriptionRegistry::new();

        let sub = registry.register_detail("admin-1", "a1").await;
        assert!(registry.unregister_detail("admin-1", "a1").await);

        assert!(sub.subscriber().is_closed());
        assert_eq!(registry.counts().await, RegistryCounts::default());

        // Missing keys are a no-op
        assert!(!registry.unregister_detail("admin-1", "a1").await);
        assert!(!registry.unregister_events("nobody", "a1").await);
        assert!(!registry.unregister_overview("nobody").await);
    }

    #[tokio::test]
    async fn test_unregister_keeps_siblings() {
        let registry = SubscriptionRegistry::new();

        let _a1 = registry.register_events("admin-1", "a1").await;
        let a2 = registry.register_events("admin-1", "a2").await;

        registry.unregister_events("admin-1", "a1").await;

        let counts = registry.counts().await;
        assert_eq!(counts.events, 1);
        assert_eq!(counts.observers, 1);
        assert!(!a2.subscriber().is_closed());
    }

    #[tokio::test]
    async fn test_release_ignores_superseded() {
        let registry = SubscriptionRegistry::new();

        let old = registry.register_overview("admin-1").await;
        let new = registry.register_overview("admin-1").await;

        // Old pump tearing down must not evict the newer subscriber
        assert!(!registry.release(old.subscriber()).await);
        assert!(old.subscriber().is_closed());
        assert_eq!(overview_ids(&registry).await, vec![new.subscriber().id()]);

        assert!(registry.release(new.subscriber()).await);
        assert!(overview_ids(&registry).await.is_empty());

        // Releasing again is a no-op
        assert!(!registry.release(new.subscriber()).await);
    }

    #[tokio::test]
    async fn test_try_release_skips_when_locked() {
        let registry = SubscriptionRegistry::new();
        let sub = registry.register_detail("admin-1", "a1").await;

        {
            let _held = registry.indexes.read().await;
            assert_eq!(registry.try_release(sub.subscriber()), None);
            assert!(!sub.subscriber().is_closed());
        }

        assert_eq!(registry.try_release(sub.subscriber()), Some(true));
        assert!(sub.subscriber().is_closed());
        assert_eq!(registry.counts().await.total(), 0);
        assert_eq!(registry.try_release(sub.subscriber()), Some(false));
    }

    #[tokio::test]
    async fn test_for_each_detail_filters_agent() {
        let registry = SubscriptionRegistry::new();

        let a1_one = registry.register_detail("admin-1", "a1").await;
        let a1_two = registry.register_detail("admin-2", "a1").await;
        let _b = registry.register_detail("admin-1", "b1").await;

        let mut seen = Vec::new();
        registry.for_each_detail("a1", |sub| seen.push(sub.id())).await;
        seen.sort_unstable();

        let mut expected = vec![a1_one.subscriber().id(), a1_two.subscriber().id()];
        expected.sort_unstable();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_frame_targets_overview_and_detail() {
        let registry = SubscriptionRegistry::new();

        let mut overview = registry.register_overview("admin-1").await;
        let mut detail = registry.register_detail("admin-2", "a1").await;
        let mut other = registry.register_detail("admin-2", "b1").await;
        let mut events = registry.register_events("admin-2", "a1").await;

        let f = frame("a1", 10);
        let mut outcomes = Vec::new();
        registry
            .for_each_frame_target("a1", |sub| outcomes.push(sub.try_send_frame(&f)))
            .await;

        assert_eq!(outcomes, vec![Delivery::Delivered, Delivery::Delivered]);
        assert_eq!(overview.try_next_frame().unwrap().timestamp, 10);
        assert_eq!(detail.try_next_frame().unwrap().timestamp, 10);
        assert!(other.try_next_frame().is_none());
        assert!(events.try_next_frame().is_none());
    }

    #[tokio::test]
    async fn test_close_all() {
        let registry = SubscriptionRegistry::new();

        let a = registry.register_overview("admin-1").await;
        let b = registry.register_detail("admin-1", "a1").await;
        let c = registry.register_events("admin-2", "a1").await;

        assert_eq!(registry.close_all().await, 3);
        assert!(a.subscriber().is_closed());
        assert!(b.subscriber().is_closed());
        assert!(c.subscriber().is_closed());
        assert_eq!(registry.counts().await.total(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_registration() {
        let registry = Arc::new(SubscriptionRegistry::new());

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    let observer = format!("admin-{}", i % 4);
                    let agent = format!("a{}", i);
                    let sub = registry.register_detail(&observer, &agent).await;
                    if i % 2 == 0 {
                        registry.release(sub.subscriber()).await;
                    }
                    sub
                })
            })
            .collect();

        let mut kept = Vec::new();
        for handle in handles {
            kept.push(handle.await.unwrap());
        }

        let counts = registry.counts().await;
        assert_eq!(counts.detail, 16);
        assert_eq!(counts.observers, 2);
    }
}
