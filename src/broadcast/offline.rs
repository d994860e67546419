//! Offline signalling
//!
//! An agent going away is reported through the same frame stream as its
//! pictures: a frame with an empty payload and the reserved timestamp `0`.
//! Observers that only understand frames can still drop the agent from
//! their display, while Rust consumers get a typed view via [`AgentUpdate`].

use std::sync::Arc;

use crate::registry::{FrameItem, SharedFrame};

/// Timestamp reserved for the offline marker
pub const OFFLINE_TIMESTAMP: i64 = 0;

/// Classification of a frame on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// An actual picture
    Frame,
    /// The agent went offline
    Offline,
}

impl FrameItem {
    /// Build the offline marker for `agent_id`
    ///
    /// Marked as a preview so overview consumers pick it up as well.
    pub fn offline(agent_id: impl Into<String>) -> Self {
        Self::new(agent_id, bytes::Bytes::new(), true, OFFLINE_TIMESTAMP)
    }

    /// Whether this frame is an offline marker
    ///
    /// Matches on the empty payload and the reserved timestamp; the preview
    /// flag is not part of the rule.
    pub fn is_offline(&self) -> bool {
        self.timestamp == OFFLINE_TIMESTAMP && self.image_data.is_empty()
    }

    /// Classify this frame
    pub fn kind(&self) -> FrameKind {
        if self.is_offline() {
            FrameKind::Offline
        } else {
            FrameKind::Frame
        }
    }
}

/// Typed view of one item on a frame stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentUpdate {
    /// A picture from the agent
    Frame(SharedFrame),
    /// The agent went offline
    Offline {
        /// Agent that disappeared
        agent_id: String,
    },
}

impl AgentUpdate {
    /// Classify a frame taken off a stream
    pub fn from_frame(frame: SharedFrame) -> Self {
        if frame.is_offline() {
            AgentUpdate::Offline {
                agent_id: frame.agent_id.clone(),
            }
        } else {
            AgentUpdate::Frame(frame)
        }
    }

    /// Agent this update is about
    pub fn agent_id(&self) -> &str {
        match self {
            AgentUpdate::Frame(frame) => &frame.agent_id,
            AgentUpdate::Offline { agent_id } => agent_id,
        }
    }

    /// Wire representation
    pub fn into_frame(self) -> SharedFrame {
        match self {
            AgentUpdate::Frame(frame) => frame,
            AgentUpdate::Offline { agent_id } => Arc::new(FrameItem::offline(agent_id)),
        }
    }
}

impl From<SharedFrame> for AgentUpdate {
    fn from(frame: SharedFrame) -> Self {
        Self::from_frame(frame)
    }
}
