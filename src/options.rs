//! Reader configuration.

use crate::telemetry::{noop_event_listener, BlockEventListener};

use serde::Deserialize;
use std::sync::Arc;

/// Options shared by the index and series readers.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Verify the CRC32 trailer of every index section before decoding its payload.
    pub verify_checksums: bool,
    /// Structured event hook for observability (no-op by default).
    pub event_listener: Arc<dyn BlockEventListener>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            verify_checksums: false,
            event_listener: noop_event_listener(),
        }
    }
}

impl ReaderOptions {
    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    pub fn with_event_listener(mut self, listener: Arc<dyn BlockEventListener>) -> Self {
        self.event_listener = listener;
        self
    }

    /// Overwrites only the fields that are set in `partial`.
    pub fn merge(&mut self, partial: &ReaderFileConfig) {
        if let Some(v) = partial.verify_checksums {
            self.verify_checksums = v;
        }
    }
}

/// Reader section as read from a config file or environment. Every field optional for layering.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReaderFileConfig {
    pub verify_checksums: Option<bool>,
}
