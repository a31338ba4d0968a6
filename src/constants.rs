//! Shared constants used across the application.

/// User agent sent with every linkding request.
pub const USER_AGENT: &str = concat!("linkding-media-archiver/", env!("CARGO_PKG_VERSION"));

/// Worker pool size when none is configured.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Seconds between scans when none is configured.
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 3600;

/// Seconds a single yt-dlp invocation may run.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 3600;

/// Display name prefix of assets produced by dry runs.
pub const SIMULATED_ASSET_NAME: &str = "Simulated Asset";

/// Id of assets produced by dry runs; linkding never assigns it.
pub const SIMULATED_ASSET_ID: i64 = -1;
