//! Stream pump
//!
//! Drains one subscriber's queue into its sink until the queue ends or the
//! sink fails, then releases the subscriber exactly once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::Result;
use crate::registry::{
    SharedEvent, SharedFrame, Subscriber, SubscriberId, Subscription, SubscriptionKey,
    SubscriptionRegistry,
};

use super::sink::StreamSink;
use super::state::PumpState;

/// Summary of a pump that ended gracefully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpReport {
    /// Subscription that was pumped
    pub key: SubscriptionKey,
    /// Subscriber instance that was pumped
    pub subscriber_id: SubscriberId,
    /// Items handed to the sink
    pub forwarded: u64,
    /// Time from registration to teardown
    pub duration: Duration,
}

/// Runs observer subscriptions against a registry
///
/// One pump future per subscription; callers spawn them on the runtime.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use agentcast::{BroadcastEngine, SharedFrame, StreamPump};
/// use tokio::sync::mpsc;
///
/// # async fn example() -> agentcast::error::Result<()> {
/// let engine = Arc::new(BroadcastEngine::new());
/// let pump = StreamPump::new(Arc::clone(engine.registry()));
///
/// let (tx, mut rx) = mpsc::channel::<SharedFrame>(64);
/// tokio::spawn(async move { pump.run_overview("admin-1", tx).await });
///
/// while let Some(frame) = rx.recv().await {
///     println!("{} @ {}", frame.agent_id, frame.timestamp);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StreamPump {
    registry: Arc<SubscriptionRegistry>,
}

impl StreamPump {
    /// Create a pump runner for `registry`
    pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self { registry }
    }

    /// Stream frames from every agent to `observer_id`
    pub async fn run_overview<S>(&self, observer_id: &str, sink: S) -> Result<PumpReport>
    where
        S: StreamSink<SharedFrame>,
    {
        let subscription = self.registry.register_overview(observer_id).await;
        self.pump_frames(subscription, sink).await
    }

    /// Stream frames from `agent_id` to `observer_id`
    pub async fn run_detail<S>(&self, observer_id: &str, agent_id: &str, sink: S) -> Result<PumpReport>
    where
        S: StreamSink<SharedFrame>,
    {
        let subscription = self.registry.register_detail(observer_id, agent_id).await;
        self.pump_frames(subscription, sink).await
    }

    /// Stream events from `agent_id` to `observer_id`
    pub async fn run_events<S>(&self, observer_id: &str, agent_id: &str, sink: S) -> Result<PumpReport>
    where
        S: StreamSink<SharedEvent>,
    {
        let subscription = self.registry.register_events(observer_id, agent_id).await;
        self.pump_events(subscription, sink).await
    }

    /// Pump the frame queue of an already registered subscription
    pub async fn pump_frames<S>(&self, subscription: Subscription, sink: S) -> Result<PumpReport>
    where
        S: StreamSink<SharedFrame>,
    {
        let (subscriber, queue) = subscription.into_frames();
        self.drive(subscriber, queue, sink).await
    }

    /// Pump the event queue of an already registered subscription
    pub async fn pump_events<S>(&self, subscription: Subscription, sink: S) -> Result<PumpReport>
    where
        S: StreamSink<SharedEvent>,
    {
        let (subscriber, queue) = subscription.into_events();
        self.drive(subscriber, queue, sink).await
    }

    async fn drive<T, S>(
        &self,
        subscriber: Arc<Subscriber>,
        mut queue: mpsc::Receiver<T>,
        mut sink: S,
    ) -> Result<PumpReport>
    where
        T: Send,
        S: StreamSink<T>,
    {
        let mut state = PumpState::new(subscriber.key().clone());
        state.on_registered(subscriber.id());
        let mut teardown = Teardown::new(Arc::clone(&self.registry), Arc::clone(&subscriber));

        tracing::info!(
            subscription = %state.key,
            subscriber_id = subscriber.id(),
            "Subscription started"
        );
        state.start_streaming();

        let result = loop {
            let Some(item) = queue.recv().await else {
                state.close_graceful();
                break Ok(());
            };
            if let Err(e) = sink.send(item).await {
                state.close_error();
                break Err(e);
            }
            state.on_forwarded();
        };

        teardown.run().await;
        state.tear_down();

        match result {
            Ok(()) => {
                tracing::info!(
                    subscription = %state.key,
                    subscriber_id = subscriber.id(),
                    forwarded = state.forwarded,
                    "Subscription ended"
                );
                Ok(PumpReport {
                    key: state.key.clone(),
                    subscriber_id: subscriber.id(),
                    forwarded: state.forwarded,
                    duration: state.duration(),
                })
            }
            Err(e) => {
                tracing::warn!(
                    subscription = %state.key,
                    subscriber_id = subscriber.id(),
                    forwarded = state.forwarded,
                    error = %e,
                    "Subscription send failed"
                );
                Err(e)
            }
        }
    }
}

/// Releases a subscriber once, even if the pump future is dropped
struct Teardown {
    registry: Arc<SubscriptionRegistry>,
    subscriber: Arc<Subscriber>,
    done: bool,
}

impl Teardown {
    fn new(registry: Arc<SubscriptionRegistry>, subscriber: Arc<Subscriber>) -> Self {
        Self {
            registry,
            subscriber,
            done: false,
        }
    }

    async fn run(&mut self) {
        if !self.done {
            self.registry.release(&self.subscriber).await;
            self.done = true;
        }
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        if self.done {
            return;
        }

        // Closing is synchronous; removing the entry needs the registry lock
        self.subscriber.close();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let registry = Arc::clone(&self.registry);
                let subscriber = Arc::clone(&self.subscriber);
                handle.spawn(async move {
                    registry.release(&subscriber).await;
                });
            }
            Err(_) => {
                if self.registry.try_release(&self.subscriber).is_none() {
                    tracing::warn!(
                        subscription = %self.subscriber.key(),
                        subscriber_id = self.subscriber.id(),
                        "Pump dropped outside a runtime with the registry locked, entry not released"
                    );
                }
            }
        }
    }
}
