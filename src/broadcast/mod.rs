//! Fan-out of published items
//!
//! ```text
//!   agent ingestion                      BroadcastEngine
//!   ───────────────                      ───────────────
//!   publish_incoming_frame(frame) ──┐
//!   publish_frame(frame) ───────────┼──► overview subscribers
//!   publish_agent_offline(agent) ───┘    + detail(agent) subscribers
//!
//!   publish_event(event) ──────────────► events(agent) subscribers
//! ```
//!
//! Every enqueue is a `try_send`. A full queue drops the item for that one
//! subscriber (or closes it, per [`OverflowPolicy`](crate::registry::OverflowPolicy))
//! and the publish moves on.

pub mod engine;
pub mod offline;

pub use engine::{BroadcastEngine, FanoutReport};
pub use offline::{AgentUpdate, FrameKind, OFFLINE_TIMESTAMP};
