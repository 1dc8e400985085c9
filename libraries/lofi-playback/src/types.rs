//! Playback configuration

use crate::tracker::TickSource;
use std::time::Duration;

/// Delay between tearing a graph down and building its replacement
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Capacity of the controller's command queue
pub const DEFAULT_COMMAND_BUFFER: usize = 32;

/// Controller tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Wait after teardown before reconnecting; commands arriving in this
    /// window are folded into the same rebuild
    pub settle_delay: Duration,
    pub tick_source: TickSource,
    pub command_buffer: usize,
    /// Seed for procedural noise; `None` draws from OS entropy
    pub noise_seed: Option<u64>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            tick_source: TickSource::default(),
            command_buffer: DEFAULT_COMMAND_BUFFER,
            noise_seed: None,
        }
    }
}

impl PlaybackConfig {
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_tick_source(mut self, source: TickSource) -> Self {
        self.tick_source = source;
        self
    }

    pub fn with_noise_seed(mut self, seed: u64) -> Self {
        self.noise_seed = Some(seed);
        self
    }
}
