//! Client for the linkding bookmark manager's REST API.

pub mod client;
pub mod mimetypes;
pub mod multipart;
pub mod pagination;
pub mod query;
pub mod types;
pub mod version;

pub use client::Client;
pub use mimetypes::{is_media_type, mime_type_for};
pub use query::BookmarksQuery;
pub use types::{Asset, Bookmark, Page, UserProfile, ASSET_TYPE_UPLOAD};
pub use version::{Version, BUNDLE_FILTER_MIN_VERSION};
