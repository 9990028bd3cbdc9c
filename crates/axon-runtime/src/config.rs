//! Runtime tuning knobs.

/// Default capacity of a bridge's migration pending queue.
pub const DEFAULT_PENDING_CAPACITY: usize = 128;

/// Configuration of a protocol bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Maximum number of messages deferred while a connection migrates.
    ///
    /// Overflowing input is dropped with a warning and reported to the
    /// caller as a recoverable error.
    pub pending_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            pending_capacity: DEFAULT_PENDING_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacity() {
        assert_eq!(BridgeConfig::default().pending_capacity, 128);
    }
}
