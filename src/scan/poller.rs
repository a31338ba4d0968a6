use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::discovery::discover;
use super::{QueryFilter, ScanConfig};
use crate::archiver::{Archiver, MediaDownloader, RunResult};
use crate::error::ArchiveError;
use crate::linkding::Client;

/// When scans run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub interval: Duration,
    pub single_run: bool,
    pub skip_first_run: bool,
}

impl Schedule {
    /// Whether the first tick is skipped. A single run always scans.
    #[must_use]
    pub const fn skips_first_tick(&self) -> bool {
        self.skip_first_run && !self.single_run
    }
}

/// Runs scans and carries the modification watermark between them.
pub struct Scanner {
    client: Client,
    downloader: Arc<dyn MediaDownloader>,
    base: ScanConfig,
    watermark: Option<DateTime<Utc>>,
}

impl Scanner {
    pub fn new(client: Client, downloader: Arc<dyn MediaDownloader>, base: ScanConfig) -> Self {
        Self {
            client,
            downloader,
            base,
            watermark: None,
        }
    }

    /// Start time of the last scan whose discovery succeeded.
    #[must_use]
    pub const fn watermark(&self) -> Option<DateTime<Utc>> {
        self.watermark
    }

    fn next_config(&self) -> ScanConfig {
        ScanConfig {
            filter: QueryFilter {
                modified_since: self.watermark,
                ..self.base.filter.clone()
            },
            ..self.base.clone()
        }
    }

    /// Discover bookmarks and archive them.
    ///
    /// The watermark only moves forward when discovery succeeds, so a failed
    /// listing is retried in full on the next scan.
    ///
    /// # Errors
    ///
    /// Returns the discovery error; per-bookmark failures are counted in
    /// the result instead.
    pub async fn scan_once(&mut self) -> Result<RunResult, ArchiveError> {
        let started = Utc::now();
        let config = self.next_config();
        debug!(modified_since = ?config.filter.modified_since, "Starting scan");

        let bookmarks = discover(&self.client, &config.filter).await?;
        self.watermark = Some(started);

        let archiver = Archiver::new(
            self.client.clone(),
            Arc::clone(&self.downloader),
            config.dry_run,
            config.concurrency,
        );
        Ok(archiver.run(bookmarks).await)
    }
}

/// Scan now and then once per interval, or just once for a single run.
///
/// Only returns after a single run.
pub async fn scan_loop(mut scanner: Scanner, schedule: Schedule) {
    if schedule.single_run && schedule.skip_first_run {
        warn!("Single run requested; ignoring skip-first-run");
    }

    if schedule.single_run {
        scan_and_log(&mut scanner).await;
        return;
    }

    let mut ticker = tokio::time::interval(schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    if schedule.skips_first_tick() {
        ticker.tick().await;
        info!(
            interval_secs = schedule.interval.as_secs(),
            "Skipping first scan"
        );
    }

    loop {
        ticker.tick().await;
        scan_and_log(&mut scanner).await;
        debug!(
            interval_secs = schedule.interval.as_secs(),
            "Waiting for next scan"
        );
    }
}

async fn scan_and_log(scanner: &mut Scanner) {
    match scanner.scan_once().await {
        Ok(result) => info!(
            succeeded = result.succeeded,
            failed = result.failed,
            "Scan finished"
        ),
        Err(e) => error!(error = %e, "Scan failed during discovery"),
    }
}
