//! Item and key types for subscription routing
//!
//! This module defines the items that are fanned out to observers and the
//! keys that identify a subscription in the registry.

use std::sync::Arc;

use bytes::Bytes;

/// A frame shared by every subscriber queue it is delivered to
pub type SharedFrame = Arc<FrameItem>;

/// An event shared by every subscriber queue it is delivered to
pub type SharedEvent = Arc<EventItem>;

/// A captured frame from one agent
///
/// Never mutated after construction. The engine wraps each frame in an `Arc`
/// once, and `Bytes` keeps the image itself reference-counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameItem {
    /// Producing agent
    pub agent_id: String,
    /// Encoded image payload (opaque to this crate)
    pub image_data: Bytes,
    /// Whether this is a reduced-size preview frame
    pub is_preview: bool,
    /// Producer-assigned timestamp in milliseconds
    pub timestamp: i64,
}

impl FrameItem {
    /// Create a frame
    pub fn new(
        agent_id: impl Into<String>,
        image_data: impl Into<Bytes>,
        is_preview: bool,
        timestamp: i64,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            image_data: image_data.into(),
            is_preview,
            timestamp,
        }
    }

    /// Create a preview frame
    pub fn preview(agent_id: impl Into<String>, image_data: impl Into<Bytes>, timestamp: i64) -> Self {
        Self::new(agent_id, image_data, true, timestamp)
    }

    /// Create a full-resolution frame
    pub fn full(agent_id: impl Into<String>, image_data: impl Into<Bytes>, timestamp: i64) -> Self {
        Self::new(agent_id, image_data, false, timestamp)
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.image_data.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.image_data.is_empty()
    }
}

/// A discrete event from one agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventItem {
    /// Producing agent
    pub agent_id: String,
    /// Event payload (opaque to this crate)
    pub payload: Bytes,
}

impl EventItem {
    /// Create an event
    pub fn new(agent_id: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            agent_id: agent_id.into(),
            payload: payload.into(),
        }
    }
}

/// Which of the three indexes a subscription lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    /// Frames from every agent
    Overview,
    /// Frames from one agent
    Detail,
    /// Events from one agent
    Events,
}

impl Topology {
    /// Short lowercase name, used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Topology::Overview => "overview",
            Topology::Detail => "detail",
            Topology::Events => "events",
        }
    }
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry key of one subscription
///
/// Overview subscriptions are keyed by observer alone; detail and event
/// subscriptions by the (observer, agent) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    /// Index the subscription belongs to
    pub topology: Topology,
    /// Caller-supplied observer id
    pub observer_id: String,
    /// Watched agent (`None` for overview)
    pub agent_id: Option<String>,
}

impl SubscriptionKey {
    /// Key for an overview subscription
    pub fn overview(observer_id: impl Into<String>) -> Self {
        Self {
            topology: Topology::Overview,
            observer_id: observer_id.into(),
            agent_id: None,
        }
    }

    /// Key for a detail subscription
    pub fn detail(observer_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            topology: Topology::Detail,
            observer_id: observer_id.into(),
            agent_id: Some(agent_id.into()),
        }
    }

    /// Key for an event subscription
    pub fn events(observer_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            topology: Topology::Events,
            observer_id: observer_id.into(),
            agent_id: Some(agent_id.into()),
        }
    }
}

impl std::fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.agent_id {
            Some(agent) => write!(f, "{}/{}/{}", self.topology, self.observer_id, agent),
            None => write!(f, "{}/{}", self.topology, self.observer_id),
        }
    }
}
