//! Statistics for publishing and delivery

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::broadcast::{FanoutReport, FrameKind};

/// Per-subscriber delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriberStats {
    /// Frames queued for this subscriber
    pub frames_delivered: u64,
    /// Frames dropped because the frame queue was full
    pub frames_dropped: u64,
    /// Events queued for this subscriber
    pub events_delivered: u64,
    /// Events dropped because the event queue was full
    pub events_dropped: u64,
}

impl SubscriberStats {
    /// Total items dropped for this subscriber
    pub fn total_dropped(&self) -> u64 {
        self.frames_dropped + self.events_dropped
    }
}

/// Engine-wide counters
///
/// Updated with relaxed atomics from any number of publishers.
#[derive(Debug)]
pub struct EngineStats {
    started_at: Instant,
    frames_published: AtomicU64,
    events_published: AtomicU64,
    offline_published: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    closed: AtomicU64,
}

impl EngineStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            frames_published: AtomicU64::new(0),
            events_published: AtomicU64::new(0),
            offline_published: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            closed: AtomicU64::new(0),
        }
    }

    /// Count one published frame
    pub fn record_frame(&self, kind: FrameKind) {
        self.frames_published.fetch_add(1, Ordering::Relaxed);
        if kind == FrameKind::Offline {
            self.offline_published.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count one published event
    pub fn record_event(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Add the outcome of one fan-out
    pub fn record_fanout(&self, report: &FanoutReport) {
        self.delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.dropped.fetch_add(report.dropped as u64, Ordering::Relaxed);
        self.closed.fetch_add(report.closed as u64, Ordering::Relaxed);
    }

    /// Time since the counters were created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            frames_published: self.frames_published.load(Ordering::Relaxed),
            events_published: self.events_published.load(Ordering::Relaxed),
            offline_published: self.offline_published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
            uptime: self.uptime(),
        }
    }
}

impl Default for EngineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of [`EngineStats`] at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStatsSnapshot {
    /// Frames published, offline markers included
    pub frames_published: u64,
    /// Events published
    pub events_published: u64,
    /// Offline markers published
    pub offline_published: u64,
    /// Items queued across all subscribers
    pub delivered: u64,
    /// Items dropped on full queues
    pub dropped: u64,
    /// Items skipped because the subscriber was closed
    pub closed: u64,
    /// Time since the engine started
    pub uptime: Duration,
}

impl EngineStatsSnapshot {
    /// Fraction of enqueue attempts that were dropped
    pub fn drop_ratio(&self) -> f64 {
        let attempts = self.delivered + self.dropped;
        if attempts > 0 {
            self.dropped as f64 / attempts as f64
        } else {
            0.0
        }
    }
}
