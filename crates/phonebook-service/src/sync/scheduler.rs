use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at};

use crate::service::PhonebookService;

/// Runs `sync_all` on a fixed period.
pub struct SyncScheduler {
    service: PhonebookService,
    period: Duration,
}

impl SyncScheduler {
    #[must_use]
    pub const fn new(service: PhonebookService, period: Duration) -> Self {
        Self { service, period }
    }

    /// Builds a scheduler from a period in seconds. Zero disables scheduling.
    #[must_use]
    pub fn from_secs(service: PhonebookService, interval_secs: u64) -> Option<Self> {
        (interval_secs > 0).then(|| Self::new(service, Duration::from_secs(interval_secs)))
    }

    /// Runs one pass per period, forever. The first pass starts one period
    /// after the call. A slow pass delays the next one instead of stacking.
    pub async fn run(self) {
        let mut ticker = interval_at(tokio::time::Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(period_secs = self.period.as_secs(), "Sync scheduler started");
        loop {
            ticker.tick().await;
            self.pass().await;
        }
    }

    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn pass(&self) {
        match self.service.sync_all().await {
            Ok(reports) => {
                let failed: usize = reports.iter().map(|r| r.failed().count()).sum();
                tracing::debug!(books = reports.len(), failed_sources = failed, "Scheduled sync pass done");
            }
            Err(e) => {
                tracing::error!(error = %e, report = true, "Scheduled sync pass failed");
            }
        }
    }
}
