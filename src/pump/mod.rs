//! Observer stream pumps
//!
//! A transport handler that accepts a subscription request hands its
//! outbound stream to a [`StreamPump`]. The pump registers a subscriber,
//! forwards queued items in order, and on exit unregisters and closes the
//! subscriber exactly once:
//!
//! ```text
//!   SubscribeOverview(admin) ──► run_overview(admin, sink)
//!                                   │ register
//!                                   ▼
//!                            ┌─────────────┐   recv    ┌──────┐
//!                            │ Subscriber  │ ────────► │ sink │ ──► observer
//!                            │ mpsc queue  │           └──────┘
//!                            └─────────────┘
//!                                   │ queue closed / send failed
//!                                   ▼
//!                              release + close
//! ```
//!
//! There is no cancel token: an observer stream ends when its queue is
//! closed (unregister, shutdown) or when the sink reports a failure.

pub mod runner;
pub mod sink;
pub mod state;

pub use runner::{PumpReport, StreamPump};
pub use sink::{JsonLinesSink, StreamSink};
pub use state::{PumpPhase, PumpState};
