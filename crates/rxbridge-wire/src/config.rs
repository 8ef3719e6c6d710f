#![forbid(unsafe_code)]

//! Channel configuration.

/// Tunables for a [`Channel`](crate::Channel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Log every enqueue and flush at debug level.
    pub debug: bool,
    /// Initial capacity of the pending mutation queue.
    pub batch_capacity: usize,
}

impl ChannelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = capacity;
        self
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            debug: false,
            batch_capacity: 64,
        }
    }
}
