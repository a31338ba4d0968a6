use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::simulate::simulated_asset;
use super::ytdlp::MediaDownloader;
use crate::error::ArchiveError;
use crate::linkding::{Asset, Bookmark, Client};

/// Where a bookmark was in its pipeline when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Checking,
    Downloading,
    Uploading,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Checking => "checking",
            Self::Downloading => "downloading",
            Self::Uploading => "uploading",
        })
    }
}

#[derive(Debug, Error)]
#[error("bookmark {bookmark_id} failed while {stage}: {source}")]
pub struct BookmarkFailure {
    pub bookmark_id: i64,
    pub stage: Stage,
    #[source]
    pub source: ArchiveError,
}

impl BookmarkFailure {
    fn at(bookmark_id: i64, stage: Stage) -> impl FnOnce(ArchiveError) -> Self {
        move |source| Self {
            bookmark_id,
            stage,
            source,
        }
    }
}

/// How a bookmark left the pipeline when nothing failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A media asset was attached before this scan.
    AlreadyArchived,
    /// Assets created (or simulated) by this scan.
    Archived(Vec<Asset>),
}

/// Tally of one scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunResult {
    pub succeeded: usize,
    pub failed: usize,
}

impl RunResult {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    fn merge(&mut self, other: Self) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

/// Bounded pool that archives media for a set of bookmarks.
#[derive(Clone)]
pub struct Archiver {
    client: Client,
    downloader: Arc<dyn MediaDownloader>,
    dry_run: bool,
    concurrency: usize,
}

impl Archiver {
    pub fn new(
        client: Client,
        downloader: Arc<dyn MediaDownloader>,
        dry_run: bool,
        concurrency: usize,
    ) -> Self {
        Self {
            client,
            downloader,
            dry_run,
            concurrency: concurrency.max(1),
        }
    }

    /// Process every bookmark, at most `concurrency` at a time.
    ///
    /// Returns once all of them have finished. A failed bookmark is counted
    /// and logged but never stops the others.
    pub async fn run(&self, bookmarks: Vec<Bookmark>) -> RunResult {
        let workers = self.concurrency.min(bookmarks.len());
        if workers == 0 {
            return RunResult::default();
        }

        info!(
            count = bookmarks.len(),
            workers,
            dry_run = self.dry_run,
            "Processing bookmarks"
        );

        let queue = Arc::new(Mutex::new(VecDeque::from(bookmarks)));
        let mut pool = JoinSet::new();
        for worker in 0..workers {
            let archiver = self.clone();
            let queue = Arc::clone(&queue);
            pool.spawn(async move { archiver.drain(worker, &queue).await });
        }

        let mut result = RunResult::default();
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(tally) => result.merge(tally),
                Err(e) => error!("Worker task panicked: {e}"),
            }
        }

        info!(
            succeeded = result.succeeded,
            failed = result.failed,
            "Finished processing bookmarks"
        );
        result
    }

    async fn drain(&self, worker: usize, queue: &Mutex<VecDeque<Bookmark>>) -> RunResult {
        let mut tally = RunResult::default();
        loop {
            let next = queue.lock().await.pop_front();
            let Some(bookmark) = next else {
                break;
            };

            match self.process_bookmark(&bookmark).await {
                Ok(_) => tally.succeeded += 1,
                Err(failure) => {
                    error!(
                        bookmark_id = failure.bookmark_id,
                        stage = %failure.stage,
                        error = %failure.source,
                        "Failed to archive bookmark"
                    );
                    tally.failed += 1;
                }
            }
        }
        debug!(worker, succeeded = tally.succeeded, failed = tally.failed, "Worker finished");
        tally
    }

    /// Archive one bookmark: check for media, download, then upload.
    ///
    /// # Errors
    ///
    /// Returns the stage and cause of the first failure. Remaining files of
    /// the bookmark are not attempted after a failed upload.
    pub async fn process_bookmark(&self, bookmark: &Bookmark) -> Result<Outcome, BookmarkFailure> {
        let bookmark_id = bookmark.id;

        debug!(bookmark_id, "Checking bookmark assets");
        let assets = self
            .client
            .bookmark_assets(bookmark_id)
            .await
            .map_err(BookmarkFailure::at(bookmark_id, Stage::Checking))?;

        if let Some(asset) = assets.iter().find(|a| a.is_media()) {
            info!(bookmark_id, asset_id = asset.id, "Media asset already exists");
            return Ok(Outcome::AlreadyArchived);
        }

        info!(bookmark_id, url = %bookmark.url, "Downloading media");
        let download = self
            .downloader
            .download(&bookmark.url)
            .await
            .map_err(BookmarkFailure::at(bookmark_id, Stage::Downloading))?;

        if download.paths.is_empty() {
            warn!(bookmark_id, "Download produced no files");
        } else {
            info!(bookmark_id, paths = ?download.paths, "Media downloaded");
        }

        let uploaded = self.upload_all(bookmark_id, &download.paths).await;
        if let Err(e) = download.close() {
            warn!(bookmark_id, error = %e, "Failed to remove download directory");
        }

        let assets = uploaded.map_err(BookmarkFailure::at(bookmark_id, Stage::Uploading))?;
        Ok(Outcome::Archived(assets))
    }

    async fn upload_all(
        &self,
        bookmark_id: i64,
        paths: &[PathBuf],
    ) -> Result<Vec<Asset>, ArchiveError> {
        let mut assets = Vec::with_capacity(paths.len());
        for path in paths {
            info!(bookmark_id, path = %path.display(), dry_run = self.dry_run, "Adding asset");

            let added = if self.dry_run {
                simulated_asset(path).await
            } else {
                self.client.add_asset(bookmark_id, path).await
            };
            remove_local(path).await;

            let asset = added?;
            info!(
                bookmark_id,
                path = %path.display(),
                asset_id = asset.id,
                dry_run = self.dry_run,
                "Asset added"
            );
            assets.push(asset);
        }
        Ok(assets)
    }
}

async fn remove_local(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed local media file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove local media file"),
    }
}
