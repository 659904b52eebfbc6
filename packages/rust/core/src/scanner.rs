//! Bounded polling of the item source.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use glimpse_shared::{AppConfig, ItemHandle, ItemSource, ScheduleConfig};

/// Round limits and delays for the scan loop.
#[derive(Debug, Clone, Copy)]
pub struct ScanSettings {
    pub max_rounds: u32,
    /// Settle delay before the first scan.
    pub initial_delay: Duration,
    /// Delay before every later scan.
    pub round_delay: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self::from(&ScheduleConfig::default())
    }
}

impl From<&ScheduleConfig> for ScanSettings {
    fn from(config: &ScheduleConfig) -> Self {
        Self {
            max_rounds: config.max_rounds,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            round_delay: Duration::from_millis(config.round_delay_ms),
        }
    }
}

impl From<&AppConfig> for ScanSettings {
    fn from(config: &AppConfig) -> Self {
        Self::from(&config.schedule)
    }
}

/// Yields batches of unannotated items until the source runs dry or the
/// round cap is reached.
pub struct ItemScanner {
    source: Arc<dyn ItemSource>,
    settings: ScanSettings,
    rounds: u32,
    exhausted: bool,
}

impl ItemScanner {
    pub fn new(source: Arc<dyn ItemSource>, settings: ScanSettings) -> Self {
        Self {
            source,
            settings,
            rounds: 0,
            exhausted: false,
        }
    }

    /// Scan rounds performed so far, including a final empty one.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Handles of every item not yet marked annotated, in source order.
    pub fn scan(&self) -> Vec<ItemHandle> {
        self.source.query_unannotated()
    }

    /// Wait out the round delay, then scan.
    ///
    /// Returns `None` once a scan came back empty or `max_rounds` scans ran.
    pub async fn next_batch(&mut self) -> Option<Vec<ItemHandle>> {
        if self.exhausted || self.rounds >= self.settings.max_rounds {
            return None;
        }

        let delay = if self.rounds == 0 {
            self.settings.initial_delay
        } else {
            self.settings.round_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.rounds += 1;
        let batch = self.scan();
        debug!(round = self.rounds, items = batch.len(), "scan");

        if batch.is_empty() {
            self.exhausted = true;
            return None;
        }
        Some(batch)
    }
}
