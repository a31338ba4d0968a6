//! Bookmark discovery and the periodic scan loop.

use chrono::{DateTime, Utc};

pub mod discovery;
pub mod poller;

pub use discovery::discover;
pub use poller::{scan_loop, Schedule, Scanner};

/// Which bookmarks a scan looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    /// A bookmark matching any of these tags is included; empty matches all.
    pub tags: Vec<String>,
    pub bundle_id: Option<i64>,
    pub modified_since: Option<DateTime<Utc>>,
}

/// Settings for one scan, built fresh on every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub filter: QueryFilter,
    pub dry_run: bool,
    pub concurrency: usize,
}
