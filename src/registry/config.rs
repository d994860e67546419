//! Registry configuration

/// Default capacity of each subscriber queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// What happens when a subscriber's queue is full at publish time
///
/// Neither policy ever blocks the publisher or touches other subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop the new item for that subscriber only
    #[default]
    DropNewest,
    /// Close the lagging subscriber; its pump drains what is queued and ends
    CloseSubscriber,
}

/// Registry configuration options
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Capacity of each subscriber's frame queue
    pub frame_queue_capacity: usize,

    /// Capacity of each subscriber's event queue
    pub event_queue_capacity: usize,

    /// Behavior when a queue is full
    pub overflow_policy: OverflowPolicy,

    /// Log dropped items at warn level (trace otherwise)
    pub warn_on_drop: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            frame_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            event_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::DropNewest,
            warn_on_drop: true,
        }
    }
}

impl RegistryConfig {
    /// Set the frame queue capacity (minimum 1)
    pub fn frame_queue_capacity(mut self, capacity: usize) -> Self {
        self.frame_queue_capacity = capacity.max(1);
        self
    }

    /// Set the event queue capacity (minimum 1)
    pub fn event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity.max(1);
        self
    }

    /// Set both queue capacities (minimum 1)
    pub fn queue_capacity(self, capacity: usize) -> Self {
        self.frame_queue_capacity(capacity)
            .event_queue_capacity(capacity)
    }

    /// Set the overflow policy
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Choose whether drops are logged at warn level
    pub fn warn_on_drop(mut self, enabled: bool) -> Self {
        self.warn_on_drop = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();

        assert_eq!(config.frame_queue_capacity, 4096);
        assert_eq!(config.event_queue_capacity, 4096);
        assert_eq!(config.overflow_policy, OverflowPolicy::DropNewest);
        assert!(config.warn_on_drop);
    }

    #[test]
    fn test_builder_queue_capacity() {
        let config = RegistryConfig::default().queue_capacity(8);

        assert_eq!(config.frame_queue_capacity, 8);
        assert_eq!(config.event_queue_capacity, 8);
    }

    #[test]
    fn test_builder_capacity_clamped() {
        // tokio mpsc rejects a zero bound
        let config = RegistryConfig::default()
            .frame_queue_capacity(0)
            .event_queue_capacity(0);

        assert_eq!(config.frame_queue_capacity, 1);
        assert_eq!(config.event_queue_capacity, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default()
            .frame_queue_capacity(2)
            .event_queue_capacity(16)
            .overflow_policy(OverflowPolicy::CloseSubscriber)
            .warn_on_drop(false);

        assert_eq!(config.frame_queue_capacity, 2);
        assert_eq!(config.event_queue_capacity, 16);
        assert_eq!(config.overflow_policy, OverflowPolicy::CloseSubscriber);
        assert!(!config.warn_on_drop);
    }
}
