//! Broadcast engine
//!
//! Producer-facing entry points. Each publish looks up the interested
//! subscribers under the registry's read lock and enqueues the item into
//! each of them with `try_send`. A full queue costs that one subscriber
//! that one item and nothing else.

use std::sync::Arc;

use crate::registry::{
    Delivery, EventItem, FrameItem, OverflowPolicy, RegistryConfig, SharedFrame, Subscriber,
    SubscriptionRegistry,
};
use crate::stats::{EngineStats, EngineStatsSnapshot};

/// Outcome of one publish across all targeted subscribers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Subscribers the item was queued for
    pub delivered: usize,
    /// Subscribers whose queue was full
    pub dropped: usize,
    /// Subscribers that were already closed
    pub closed: usize,
}

impl FanoutReport {
    /// Number of subscribers the publish targeted
    pub fn targets(&self) -> usize {
        self.delivered + self.dropped + self.closed
    }

    fn record(&mut self, outcome: Delivery) {
        match outcome {
            Delivery::Delivered => self.delivered += 1,
            Delivery::Dropped => self.dropped += 1,
            Delivery::Closed => self.closed += 1,
        }
    }
}

/// Fans published frames and events out to registered subscribers
///
/// Publishing never fails and never waits on an observer; the only await
/// point is acquiring the registry's read lock.
pub struct BroadcastEngine {
    registry: Arc<SubscriptionRegistry>,
    stats: EngineStats,
}

impl BroadcastEngine {
    /// Create an engine with a fresh registry and default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an engine with a fresh registry
    pub fn with_config(config: RegistryConfig) -> Self {
        Self::with_registry(Arc::new(SubscriptionRegistry::with_config(config)))
    }

    /// Create an engine over an existing registry
    pub fn with_registry(registry: Arc<SubscriptionRegistry>) -> Self {
        Self {
            registry,
            stats: EngineStats::new(),
        }
    }

    /// The registry this engine publishes into
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Counters since the engine was created
    pub fn stats(&self) -> EngineStatsSnapshot {
        self.stats.snapshot()
    }

    /// Deliver a frame to every overview subscriber and to every detail
    /// subscriber watching the frame's agent
    ///
    /// `None` is a no-op.
    pub async fn publish_frame(&self, frame: impl Into<Option<FrameItem>>) -> FanoutReport {
        match frame.into() {
            Some(frame) => self.fan_out_frame(Arc::new(frame)).await,
            None => FanoutReport::default(),
        }
    }

    /// Deliver an event to every event subscriber watching its agent
    ///
    /// There is no overview stream for events. `None` is a no-op.
    pub async fn publish_event(&self, event: impl Into<Option<EventItem>>) -> FanoutReport {
        let Some(event) = event.into() else {
            return FanoutReport::default();
        };
        let event = Arc::new(event);

        self.stats.record_event();

        let mut report = FanoutReport::default();
        let mut stale = Vec::new();
        self.registry
            .for_each_events(&event.agent_id, |sub| {
                let outcome = sub.try_send_event(&event);
                if self.on_delivery(sub, outcome, "event") {
                    stale.push(Arc::clone(sub));
                }
                report.record(outcome);
            })
            .await;

        self.prune(stale).await;
        self.stats.record_fanout(&report);
        tracing::trace!(
            agent_id = %event.agent_id,
            delivered = report.delivered,
            dropped = report.dropped,
            "Event fanned out"
        );

        report
    }

    /// Tell observers that `agent_id` went away
    ///
    /// Sends the offline marker down the same paths as a frame.
    pub async fn publish_agent_offline(&self, agent_id: &str) -> FanoutReport {
        let report = self
            .fan_out_frame(Arc::new(FrameItem::offline(agent_id)))
            .await;

        tracing::info!(
            agent_id,
            delivered = report.delivered,
            "Agent offline published"
        );

        report
    }

    /// Entry point for frames arriving from the agent side
    ///
    /// Same fan-out as [`publish_frame`](Self::publish_frame); offline
    /// markers are additionally logged. `None` is a no-op.
    pub async fn publish_incoming_frame(&self, frame: impl Into<Option<FrameItem>>) -> FanoutReport {
        let Some(frame) = frame.into() else {
            return FanoutReport::default();
        };
        let frame = Arc::new(frame);

        let report = self.fan_out_frame(Arc::clone(&frame)).await;

        if frame.is_offline() {
            tracing::info!(
                agent_id = %frame.agent_id,
                delivered = report.delivered,
                "Incoming offline marker fanned out"
            );
        }

        report
    }

    async fn fan_out_frame(&self, frame: SharedFrame) -> FanoutReport {
        self.stats.record_frame(frame.kind());

        let mut report = FanoutReport::default();
        let mut stale = Vec::new();
        self.registry
            .for_each_frame_target(&frame.agent_id, |sub| {
                let outcome = sub.try_send_frame(&frame);
                if self.on_delivery(sub, outcome, "frame") {
                    stale.push(Arc::clone(sub));
                }
                report.record(outcome);
            })
            .await;

        self.prune(stale).await;
        self.stats.record_fanout(&report);
        tracing::trace!(
            agent_id = %frame.agent_id,
            timestamp = frame.timestamp,
            delivered = report.delivered,
            dropped = report.dropped,
            "Frame fanned out"
        );

        report
    }

    /// Drop subscribers that can no longer receive from the registry
    ///
    /// Runs after the read lock is released. `release` matches by id, so an
    /// entry re-registered in the meantime is left alone.
    async fn prune(&self, stale: Vec<Arc<Subscriber>>) {
        for sub in stale {
            if self.registry.release(&sub).await {
                tracing::debug!(
                    subscription = %sub.key(),
                    subscriber_id = sub.id(),
                    "Closed subscriber pruned"
                );
            }
        }
    }

    /// Log a drop and apply the overflow policy
    ///
    /// Returns whether the subscriber is closed and should leave the registry.
    fn on_delivery(&self, sub: &Subscriber, outcome: Delivery, item: &'static str) -> bool {
        match outcome {
            Delivery::Delivered => return false,
            Delivery::Closed => return true,
            Delivery::Dropped => {}
        }

        let config = self.registry.config();
        if config.warn_on_drop {
            tracing::warn!(
                subscription = %sub.key(),
                subscriber_id = sub.id(),
                item,
                "Subscriber queue full, item dropped"
            );
        } else {
            tracing::trace!(
                subscription = %sub.key(),
                subscriber_id = sub.id(),
                item,
                "Subscriber queue full, item dropped"
            );
        }

        if config.overflow_policy != OverflowPolicy::CloseSubscriber {
            return false;
        }

        if sub.close() {
            tracing::warn!(
                subscription = %sub.key(),
                subscriber_id = sub.id(),
                "Lagging subscriber closed"
            );
        }
        true
    }
}

impl Default for BroadcastEngine {
    fn default() -> Self {
        Self::new()
    }
}
