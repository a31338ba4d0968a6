//! linkding media archiver library.
//!
//! Scans a linkding instance for bookmarks, downloads the media they point
//! to with yt-dlp, and attaches it back to the bookmark as an asset.

pub mod archiver;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod linkding;
pub mod scan;
