use crate::constants::{DISCONNECT_GRACE_MS, MAX_LINE_BYTES, SETTLE_DELAY_MS};
use radar_data::ScanConfig;
use std::time::Duration;

/// Tuning for [`RadarClient`](crate::RadarClient).
#[derive(Clone, Debug, PartialEq)]
pub struct ClientOptions {
    /// Config assumed active before any request; sent at the first sweep
    /// boundary when nothing else was requested.
    pub initial_config: ScanConfig,
    /// Wait after opening the port before reading, while the device resets.
    pub settle_delay: Duration,
    /// How long `disconnect` waits for the acquisition thread to exit.
    pub disconnect_grace: Duration,
    /// Unterminated input longer than this is discarded.
    pub max_line_bytes: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            initial_config: ScanConfig::default(),
            settle_delay: Duration::from_millis(SETTLE_DELAY_MS),
            disconnect_grace: Duration::from_millis(DISCONNECT_GRACE_MS),
            max_line_bytes: MAX_LINE_BYTES,
        }
    }
}

impl ClientOptions {
    pub fn with_initial_config(mut self, config: ScanConfig) -> Self {
        self.initial_config = config;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_disconnect_grace(mut self, grace: Duration) -> Self {
        self.disconnect_grace = grace;
        self
    }

    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes.max(1);
        self
    }
}
