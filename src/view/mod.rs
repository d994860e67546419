//! Presentation-side model
//!
//! Converts stream items into the JSON snapshots a dashboard renders, and
//! keeps the latest frame per agent.

pub mod snapshot;

pub use snapshot::{EventSnapshot, FrameBoard, FrameSnapshot};
