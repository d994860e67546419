//! Pump state machine
//!
//! Tracks one subscription from registration to teardown:
//!
//! ```text
//! Started ─► Registered ─► Streaming ─┬─► ClosingGraceful ─┬─► TornDown
//!                                     └─► ClosingError ────┘
//! ```

use std::time::{Duration, Instant};

use crate::registry::{SubscriberId, SubscriptionKey};

/// Lifecycle phase of a pump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpPhase {
    /// Pump created, no subscriber yet
    Started,
    /// Subscriber registered
    Registered,
    /// Forwarding items
    Streaming,
    /// Queue ended; tearing down
    ClosingGraceful,
    /// Forward failed; tearing down
    ClosingError,
    /// Unregistered and closed
    TornDown,
}

/// State of one pump
#[derive(Debug)]
pub struct PumpState {
    /// Subscription being pumped
    pub key: SubscriptionKey,

    /// Current phase
    pub phase: PumpPhase,

    /// Subscriber instance (after registration)
    pub subscriber_id: Option<SubscriberId>,

    /// When the pump was created
    pub started_at: Instant,

    /// Items handed to the sink
    pub forwarded: u64,
}

impl PumpState {
    /// Create a new pump state
    pub fn new(key: SubscriptionKey) -> Self {
        Self {
            key,
            phase: PumpPhase::Started,
            subscriber_id: None,
            started_at: Instant::now(),
            forwarded: 0,
        }
    }

    /// Subscriber registered
    pub fn on_registered(&mut self, id: SubscriberId) {
        if self.phase == PumpPhase::Started {
            self.phase = PumpPhase::Registered;
            self.subscriber_id = Some(id);
        }
    }

    /// Begin forwarding
    pub fn start_streaming(&mut self) {
        if self.phase == PumpPhase::Registered {
            self.phase = PumpPhase::Streaming;
        }
    }

    /// One item reached the sink
    pub fn on_forwarded(&mut self) {
        if self.phase == PumpPhase::Streaming {
            self.forwarded += 1;
        }
    }

    /// Queue closed
    pub fn close_graceful(&mut self) {
        if matches!(self.phase, PumpPhase::Registered | PumpPhase::Streaming) {
            self.phase = PumpPhase::ClosingGraceful;
        }
    }

    /// Sink failed
    pub fn close_error(&mut self) {
        if matches!(self.phase, PumpPhase::Registered | PumpPhase::Streaming) {
            self.phase = PumpPhase::ClosingError;
        }
    }

    /// Subscriber released
    pub fn tear_down(&mut self) {
        if self.is_closing() {
            self.phase = PumpPhase::TornDown;
        }
    }

    /// Whether the pump is between end of stream and teardown
    pub fn is_closing(&self) -> bool {
        matches!(
            self.phase,
            PumpPhase::ClosingGraceful | PumpPhase::ClosingError
        )
    }

    /// Whether the pump has finished
    pub fn is_torn_down(&self) -> bool {
        self.phase == PumpPhase::TornDown
    }

    /// Time since the pump was created
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graceful_lifecycle() {
        let mut state = PumpState::new(SubscriptionKey::overview("admin-1"));
        assert_eq!(state.phase, PumpPhase::Started);

        state.on_registered(7);
        assert_eq!(state.phase, PumpPhase::Registered);
        assert_eq!(state.subscriber_id, Some(7));

        state.start_streaming();
        state.on_forwarded();
        state.on_forwarded();
        assert_eq!(state.forwarded, 2);

        state.close_graceful();
        assert!(state.is_closing());

        state.tear_down();
        assert!(state.is_torn_down());
    }

    #[test]
    fn test_error_lifecycle() {
        let mut state = PumpState::new(SubscriptionKey::detail("admin-1", "a1"));
        state.on_registered(1);
        state.start_streaming();
        state.close_error();
        assert_eq!(state.phase, PumpPhase::ClosingError);

        state.tear_down();
        assert_eq!(state.phase, PumpPhase::TornDown);
    }

    #[test]
    fn test_torn_down_is_terminal() {
        let mut state = PumpState::new(SubscriptionKey::events("admin-1", "a1"));
        state.on_registered(1);
        state.start_streaming();
        state.close_graceful();
        state.tear_down();

        state.close_error();
        state.start_streaming();
        state.on_forwarded();
        assert_eq!(state.phase, PumpPhase::TornDown);
        assert_eq!(state.forwarded, 0);
    }

    #[test]
    fn test_no_teardown_before_closing() {
        let mut state = PumpState::new(SubscriptionKey::overview("admin-1"));
        state.tear_down();
        assert_eq!(state.phase, PumpPhase::Started);

        // Items are only counted while streaming
        state.on_forwarded();
        assert_eq!(state.forwarded, 0);
    }
}
