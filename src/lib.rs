//! # agentcast
//!
//! Live fan-out of agent frames and events to any number of administrative
//! observers.
//!
//! Agents produce screen frames and discrete events; observers subscribe to
//! one of three streams:
//!
//! - **overview**: frames from every agent
//! - **detail**: frames from one agent
//! - **events**: events from one agent
//!
//! The [`BroadcastEngine`] takes items from producers and enqueues them into
//! every interested subscriber without ever waiting on one. Each observer
//! stream is driven by a [`StreamPump`] that forwards its queue to a
//! transport [`StreamSink`] and cleans up when the stream ends.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use agentcast::{BroadcastEngine, FrameItem, FrameBoard, StreamPump};
//!
//! # async fn example() {
//! let engine = Arc::new(BroadcastEngine::new());
//! let pump = StreamPump::new(Arc::clone(engine.registry()));
//!
//! // An observer that keeps the latest frame per agent
//! let board = Arc::new(FrameBoard::new());
//! tokio::spawn({
//!     let board = Arc::clone(&board);
//!     async move { pump.run_overview("admin-1", board).await }
//! });
//!
//! engine.publish_frame(FrameItem::preview("agent-7", vec![0xFFu8, 0xD8], 1_700_000_000_000)).await;
//! engine.publish_agent_offline("agent-7").await;
//! # }
//! ```
//!
//! ## Delivery guarantees
//!
//! Items reach each subscriber in publish order. A subscriber whose queue is
//! full loses the item; nothing is retried or replayed, and no other
//! subscriber or producer is affected.

pub mod broadcast;
pub mod error;
pub mod pump;
pub mod registry;
pub mod stats;
pub mod view;

pub use broadcast::{AgentUpdate, BroadcastEngine, FanoutReport, FrameKind, OFFLINE_TIMESTAMP};
pub use error::{Error, Result};
pub use pump::{JsonLinesSink, PumpReport, StreamPump, StreamSink};
pub use registry::{
    EventItem, FrameItem, OverflowPolicy, RegistryConfig, SharedEvent, SharedFrame, Subscriber,
    Subscription, SubscriptionKey, SubscriptionRegistry, Topology,
};
pub use stats::{EngineStatsSnapshot, SubscriberStats};
pub use view::{EventSnapshot, FrameBoard, FrameSnapshot};
