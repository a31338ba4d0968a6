//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use linkding_media_archiver::archiver::{Download, MediaDownloader};
use linkding_media_archiver::error::ArchiveError;
use serde_json::{json, Value};
use tempfile::TempDir;

pub fn bookmark_json(id: i64) -> Value {
    json!({
        "id": id,
        "url": format!("https://media.example.com/watch/{id}"),
        "title": format!("Bookmark {id}"),
        "tag_names": ["video"],
    })
}

pub fn page_json(results: Vec<Value>, next: Option<String>) -> Value {
    json!({
        "count": results.len(),
        "next": next,
        "previous": null,
        "results": results,
    })
}

pub fn media_asset_json(id: i64) -> Value {
    json!({
        "id": id,
        "asset_type": "upload",
        "content_type": "video/mp4",
        "display_name": "clip.mp4",
    })
}

pub fn snapshot_asset_json(id: i64) -> Value {
    json!({
        "id": id,
        "asset_type": "snapshot",
        "content_type": "text/html",
        "display_name": "snapshot.html",
    })
}

pub fn bookmark_url(id: i64) -> String {
    format!("https://media.example.com/watch/{id}")
}

/// Scripted stand-in for yt-dlp.
///
/// URLs with a script entry get those file names written into a fresh
/// directory; any other URL fails like an unsupported site would.
pub struct FakeDownloader {
    root: TempDir,
    script: HashMap<String, Vec<String>>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    dirs: std::sync::Mutex<Vec<PathBuf>>,
}

impl FakeDownloader {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("Failed to create temp dir"),
            script: HashMap::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            dirs: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_files(mut self, url: &str, files: &[&str]) -> Self {
        self.script.insert(
            url.to_string(),
            files.iter().map(ToString::to_string).collect(),
        );
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Directories handed out so far.
    pub fn dirs(&self) -> Vec<PathBuf> {
        self.dirs.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaDownloader for FakeDownloader {
    async fn download(&self, url: &str) -> Result<Download, ArchiveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let Some(files) = self.script.get(url) else {
            return Err(ArchiveError::Download(format!("unsupported URL: {url}")));
        };

        let dir = tempfile::tempdir_in(self.root.path())
            .map_err(|e| ArchiveError::Download(e.to_string()))?;
        let mut paths = Vec::new();
        for name in files {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("media for {url}"))
                .map_err(|e| ArchiveError::Download(e.to_string()))?;
            paths.push(path);
        }
        self.dirs.lock().unwrap().push(dir.path().to_path_buf());

        Ok(Download::new(dir, paths))
    }
}
