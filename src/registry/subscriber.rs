//! Subscriber and subscription types
//!
//! A [`Subscriber`] is the producer-facing half of one observer subscription:
//! two bounded queues plus an idempotent close. The registry and the
//! broadcast engine only ever see this half. The observer-facing half is a
//! [`Subscription`], which owns the receiving ends and is drained by a pump.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::stats::SubscriberStats;

use super::config::RegistryConfig;
use super::frame::{SharedEvent, SharedFrame, SubscriptionKey};

/// Registry-unique identity of a subscriber instance
pub type SubscriberId = u64;

/// Outcome of a non-blocking enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Item was queued
    Delivered,
    /// Queue was full; the item was dropped for this subscriber
    Dropped,
    /// Subscriber is closed or its receiver is gone
    Closed,
}

struct Queues {
    frames: mpsc::Sender<SharedFrame>,
    events: mpsc::Sender<SharedEvent>,
}

/// Producer-facing half of one subscription
///
/// Closing drops the queue senders, so the pump sees the end of its queue
/// once the buffered items are drained.
pub struct Subscriber {
    id: SubscriberId,
    key: SubscriptionKey,

    /// `None` once closed
    queues: RwLock<Option<Queues>>,

    created_at: Instant,
    frames_delivered: AtomicU64,
    frames_dropped: AtomicU64,
    events_delivered: AtomicU64,
    events_dropped: AtomicU64,
}

impl Subscriber {
    /// Create a subscriber and its receiving half
    pub(super) fn new(id: SubscriberId, key: SubscriptionKey, config: &RegistryConfig) -> Subscription {
        let (frame_tx, frame_rx) = mpsc::channel(config.frame_queue_capacity.max(1));
        let (event_tx, event_rx) = mpsc::channel(config.event_queue_capacity.max(1));

        let subscriber = Arc::new(Self {
            id,
            key,
            queues: RwLock::new(Some(Queues {
                frames: frame_tx,
                events: event_tx,
            })),
            created_at: Instant::now(),
            frames_delivered: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            events_delivered: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
        });

        Subscription {
            subscriber,
            frames: frame_rx,
            events: event_rx,
        }
    }

    /// Registry-unique id
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Registry key this subscriber was created for
    pub fn key(&self) -> &SubscriptionKey {
        &self.key
    }

    /// Observer that owns this subscription
    pub fn observer_id(&self) -> &str {
        &self.key.observer_id
    }

    /// Time since the subscriber was created
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Enqueue a frame without waiting
    pub fn try_send_frame(&self, frame: &SharedFrame) -> Delivery {
        let queues = self.queues.read().unwrap_or_else(PoisonError::into_inner);
        match queues.as_ref() {
            Some(q) => enqueue(
                &q.frames,
                Arc::clone(frame),
                &self.frames_delivered,
                &self.frames_dropped,
            ),
            None => Delivery::Closed,
        }
    }

    /// Enqueue an event without waiting
    pub fn try_send_event(&self, event: &SharedEvent) -> Delivery {
        let queues = self.queues.read().unwrap_or_else(PoisonError::into_inner);
        match queues.as_ref() {
            Some(q) => enqueue(
                &q.events,
                Arc::clone(event),
                &self.events_delivered,
                &self.events_dropped,
            ),
            None => Delivery::Closed,
        }
    }

    /// Close both queues
    ///
    /// Returns `true` only for the call that actually closed the subscriber;
    /// every later call is a no-op returning `false`.
    pub fn close(&self) -> bool {
        let taken = self
            .queues
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if taken.is_some() {
            tracing::debug!(
                subscription = %self.key,
                subscriber_id = self.id,
                "Subscriber closed"
            );
            true
        } else {
            false
        }
    }

    /// Whether [`close`](Self::close) has run
    pub fn is_closed(&self) -> bool {
        self.queues
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Delivery counters for this subscriber
    pub fn stats(&self) -> SubscriberStats {
        SubscriberStats {
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn enqueue<T>(tx: &mpsc::Sender<T>, item: T, delivered: &AtomicU64, dropped: &AtomicU64) -> Delivery {
    match tx.try_send(item) {
        Ok(()) => {
            delivered.fetch_add(1, Ordering::Relaxed);
            Delivery::Delivered
        }
        Err(TrySendError::Full(_)) => {
            dropped.fetch_add(1, Ordering::Relaxed);
            Delivery::Dropped
        }
        Err(TrySendError::Closed(_)) => Delivery::Closed,
    }
}

/// Observer-facing half of one subscription
///
/// Holds the receiving ends of the subscriber's queues. Items come out in
/// the order they were published; once the subscriber is closed the
/// remaining items are yielded and then `None`.
#[derive(Debug)]
pub struct Subscription {
    subscriber: Arc<Subscriber>,
    frames: mpsc::Receiver<SharedFrame>,
    events: mpsc::Receiver<SharedEvent>,
}

impl Subscription {
    /// The producer-facing half
    pub fn subscriber(&self) -> &Arc<Subscriber> {
        &self.subscriber
    }

    /// Registry key of this subscription
    pub fn key(&self) -> &SubscriptionKey {
        self.subscriber.key()
    }

    /// Wait for the next frame
    pub async fn next_frame(&mut self) -> Option<SharedFrame> {
        self.frames.recv().await
    }

    /// Wait for the next event
    pub async fn next_event(&mut self) -> Option<SharedEvent> {
        self.events.recv().await
    }

    /// Take the next frame if one is queued
    pub fn try_next_frame(&mut self) -> Option<SharedFrame> {
        self.frames.try_recv().ok()
    }

    /// Take the next event if one is queued
    pub fn try_next_event(&mut self) -> Option<SharedEvent> {
        self.events.try_recv().ok()
    }

    /// Keep only the frame queue
    pub fn into_frames(self) -> (Arc<Subscriber>, mpsc::Receiver<SharedFrame>) {
        (self.subscriber, self.frames)
    }

    /// Keep only the event queue
    pub fn into_events(self) -> (Arc<Subscriber>, mpsc::Receiver<SharedEvent>) {
        (self.subscriber, self.events)
    }
}
