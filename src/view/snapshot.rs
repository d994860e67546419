//! Display snapshots
//!
//! What a dashboard consumes: the latest frame per agent with the image
//! inlined as base64, serialized in camelCase. An offline marker removes
//! the agent from the board.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::broadcast::AgentUpdate;
use crate::error::Result;
use crate::pump::StreamSink;
use crate::registry::{EventItem, FrameItem, SharedFrame};

/// One agent's latest frame, ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    /// Producing agent
    pub agent_id: String,
    /// Image payload, base64 (standard alphabet, padded)
    pub image_base64: String,
    /// Whether the frame is a reduced-size preview
    pub is_preview: bool,
    /// Producer timestamp in milliseconds (`0` on removal)
    pub timestamp: i64,
}

impl FrameSnapshot {
    /// Encode a frame for display
    pub fn from_frame(frame: &FrameItem) -> Self {
        Self {
            agent_id: frame.agent_id.clone(),
            image_base64: STANDARD.encode(&frame.image_data),
            is_preview: frame.is_preview,
            timestamp: frame.timestamp,
        }
    }

    /// Whether the display should drop this agent
    pub fn is_removal(&self) -> bool {
        self.timestamp == crate::broadcast::OFFLINE_TIMESTAMP && self.image_base64.is_empty()
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One event, ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSnapshot {
    /// Producing agent
    pub agent_id: String,
    /// Event payload, base64 (standard alphabet, padded)
    pub payload_base64: String,
}

impl EventSnapshot {
    /// Encode an event for display
    pub fn from_event(event: &EventItem) -> Self {
        Self {
            agent_id: event.agent_id.clone(),
            payload_base64: STANDARD.encode(&event.payload),
        }
    }
}

/// Latest frame of every agent currently online
///
/// Fed from an overview stream. Shared between the pump that writes into it
/// and whatever renders it.
#[derive(Debug, Default)]
pub struct FrameBoard {
    frames: RwLock<HashMap<String, FrameSnapshot>>,
}

impl FrameBoard {
    /// Create an empty board
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one frame from the stream
    ///
    /// Returns the snapshot to emit to the display. An offline marker
    /// removes the agent and yields the removal snapshot.
    pub fn apply(&self, frame: SharedFrame) -> FrameSnapshot {
        let snapshot = FrameSnapshot::from_frame(&frame);
        let mut frames = self.frames.write().unwrap_or_else(PoisonError::into_inner);

        match AgentUpdate::from_frame(frame) {
            AgentUpdate::Offline { agent_id } => {
                if frames.remove(&agent_id).is_some() {
                    tracing::debug!(agent_id = %agent_id, "Agent removed from board");
                }
            }
            AgentUpdate::Frame(frame) => {
                frames.insert(frame.agent_id.clone(), snapshot.clone());
            }
        }

        snapshot
    }

    /// Latest snapshot of one agent
    pub fn get(&self, agent_id: &str) -> Option<FrameSnapshot> {
        self.frames
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(agent_id)
            .cloned()
    }

    /// All snapshots, ordered by agent id
    pub fn latest(&self) -> Vec<FrameSnapshot> {
        let mut list: Vec<FrameSnapshot> = self
            .frames
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        list.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        list
    }

    /// Number of agents on the board
    pub fn len(&self) -> usize {
        self.frames
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the board is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Observer that only keeps the board up to date
impl StreamSink<SharedFrame> for Arc<FrameBoard> {
    fn send(&mut self, item: SharedFrame) -> impl Future<Output = Result<()>> + Send {
        self.apply(item);
        std::future::ready(Ok(()))
    }
}
