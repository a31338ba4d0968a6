use serde::{Deserialize, Serialize};

use super::mimetypes::is_media_type;

/// Asset type linkding assigns to user uploads.
pub const ASSET_TYPE_UPLOAD: &str = "upload";

/// A bookmark as returned by `GET /api/bookmarks/`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Bookmark {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tag_names: Vec<String>,
}

/// A file attached to a bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Asset {
    pub id: i64,
    pub asset_type: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub display_name: String,
}

impl Asset {
    /// Whether this asset is an uploaded audio/video file.
    #[must_use]
    pub fn is_media(&self) -> bool {
        self.asset_type == ASSET_TYPE_UPLOAD && is_media_type(&self.content_type)
    }
}

/// One page of a paginated linkding collection.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: u64,
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Subset of `GET /api/user/profile/`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub version: Option<String>,
}
