//! Kernel configuration options.

use serde::{Deserialize, Serialize};
use types::SimDuration;

/// Configuration for a simulation run.
///
/// All intervals and delays are in milliseconds of simulated time. The
/// session horizon itself (start and end times) comes from the replay feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Smallest clock advance when no messages are pending, so periodic
    /// triggers keep firing on an idle queue.
    pub min_tick: SimDuration,

    /// Interval between analytics refreshes.
    pub analytics_interval: SimDuration,

    /// Interval between market-data polls.
    pub market_data_interval: SimDuration,

    /// Interval between trading-agent wake-ups.
    pub wake_interval: SimDuration,

    /// Upper bound on the random jitter added to replay order injection,
    /// so recorded bursts do not arrive artificially synchronized.
    pub replay_jitter_max: SimDuration,

    /// Seed for the kernel's random state; runs with the same seed and
    /// inputs replay identically.
    pub seed: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            min_tick: 1,
            analytics_interval: 100,
            market_data_interval: 100,
            wake_interval: 500,
            replay_jitter_max: 5,
            seed: 7,
        }
    }
}

impl KernelConfig {
    /// Set the minimum idle clock advance.
    pub fn with_min_tick(mut self, min_tick: SimDuration) -> Self {
        self.min_tick = min_tick;
        self
    }

    /// Set the analytics refresh interval.
    pub fn with_analytics_interval(mut self, interval: SimDuration) -> Self {
        self.analytics_interval = interval;
        self
    }

    /// Set the market-data poll interval.
    pub fn with_market_data_interval(mut self, interval: SimDuration) -> Self {
        self.market_data_interval = interval;
        self
    }

    /// Set the wake-up interval.
    pub fn with_wake_interval(mut self, interval: SimDuration) -> Self {
        self.wake_interval = interval;
        self
    }

    /// Set the maximum replay injection jitter.
    pub fn with_replay_jitter_max(mut self, jitter: SimDuration) -> Self {
        self.replay_jitter_max = jitter;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
