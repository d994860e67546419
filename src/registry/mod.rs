//! Subscription registry
//!
//! The registry tracks which observers want which items. It keeps three
//! independent indexes, all guarded by a single `tokio::sync::RwLock`:
//!
//! ```text
//!                    Arc<SubscriptionRegistry>
//!              ┌──────────────────────────────────┐
//!              │ overview: observer -> Subscriber │
//!              │ detail:   observer -> agent -> S │
//!              │ events:   observer -> agent -> S │
//!              └────────────────┬─────────────────┘
//!                               │ read lock per publish
//!        ┌──────────────────────┼──────────────────────┐
//!        ▼                      ▼                      ▼
//!   Subscriber             Subscriber             Subscriber
//!   try_send()             try_send()             try_send()
//!        │                      │                      │
//!   [mpsc queue]           [mpsc queue]           [mpsc queue]
//!        │                      │                      │
//!   StreamPump ──► sink    StreamPump ──► sink    StreamPump ──► sink
//! ```
//!
//! # Ownership
//!
//! A [`Subscriber`] is shared between the registry (one entry) and the
//! observer's [`Subscription`]. Closing the subscriber drops its queue
//! senders, which is how the observer learns the subscription has ended.

pub mod config;
pub mod frame;
pub mod store;
pub mod subscriber;

pub use config::{OverflowPolicy, RegistryConfig, DEFAULT_QUEUE_CAPACITY};
pub use frame::{EventItem, FrameItem, SharedEvent, SharedFrame, SubscriptionKey, Topology};
pub use store::{RegistryCounts, SubscriptionRegistry};
pub use subscriber::{Delivery, Subscriber, SubscriberId, Subscription};
