//! Per-bookmark archival: media check, download, upload.

pub mod simulate;
pub mod worker;
pub mod ytdlp;

pub use simulate::simulated_asset;
pub use worker::{Archiver, BookmarkFailure, Outcome, RunResult, Stage};
pub use ytdlp::{Download, MediaDownloader, Ytdlp};
