use std::path::Path;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::mimetypes::mime_type_for;
use super::multipart::{MultipartEnvelope, StreamingUpload, FILE_FIELD};
use super::pagination::fetch_all;
use super::query::BookmarksQuery;
use super::types::{Asset, Bookmark, Page, UserProfile};
use crate::constants::USER_AGENT;
use crate::error::ArchiveError;

/// Authenticated client for the linkding REST API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client for the linkding instance at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Configuration`] if the base URL is empty, not
    /// absolute, or not http(s).
    pub fn new(base_url: &str, token: &str) -> Result<Self, ArchiveError> {
        if base_url.trim().is_empty() {
            return Err(ArchiveError::Configuration(
                "base URL is required".to_string(),
            ));
        }

        let base_url = Url::parse(base_url.trim()).map_err(|e| {
            ArchiveError::Configuration(format!("base URL is not absolute: {base_url} ({e})"))
        })?;

        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ArchiveError::Configuration(format!(
                "base URL must be an http(s) URL: {base_url}"
            )));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            token: token.to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// List every bookmark matching `query`, across all pages.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails or cannot be decoded.
    pub async fn bookmarks(&self, query: &BookmarksQuery) -> Result<Vec<Bookmark>, ArchiveError> {
        let mut url = self.endpoint(&["bookmarks"])?;
        query.apply(&mut url);

        debug!(tag = ?query.tag, bundle_id = ?query.bundle_id, modified_since = ?query.modified_since, "Fetching bookmarks");

        let bookmarks = fetch_all(url, |page| self.get_page::<Bookmark>(page)).await?;

        debug!(count = bookmarks.len(), "Fetched bookmarks");
        Ok(bookmarks)
    }

    /// List the assets attached to a bookmark.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails or cannot be decoded.
    pub async fn bookmark_assets(&self, bookmark_id: i64) -> Result<Vec<Asset>, ArchiveError> {
        let url = self.endpoint(&["bookmarks", &bookmark_id.to_string(), "assets"])?;

        debug!(bookmark_id, "Fetching assets for bookmark");
        let assets = fetch_all(url, |page| self.get_page::<Asset>(page)).await?;
        debug!(bookmark_id, count = assets.len(), "Fetched assets for bookmark");

        Ok(assets)
    }

    /// Start downloading an asset's content.
    ///
    /// The returned response has not been read yet; consume it with
    /// `bytes_stream()` to avoid buffering the whole file.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or linkding answers non-2xx.
    pub async fn download_asset(
        &self,
        bookmark_id: i64,
        asset_id: i64,
    ) -> Result<Response, ArchiveError> {
        let url = self.endpoint(&[
            "bookmarks",
            &bookmark_id.to_string(),
            "assets",
            &asset_id.to_string(),
            "download",
        ])?;

        debug!(bookmark_id, asset_id, "Downloading asset content");
        self.send(self.http.get(url)).await
    }

    /// Upload the file at `path` as a new asset of a bookmark.
    ///
    /// The file is streamed; its MIME type comes from its extension.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Filesystem`] if the file cannot be opened,
    /// [`ArchiveError::UnknownMime`] for unsupported extensions, and wire or
    /// upload errors if the transfer fails.
    pub async fn add_asset(&self, bookmark_id: i64, path: &Path) -> Result<Asset, ArchiveError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| ArchiveError::filesystem(path, e))?;
        let file_size = file
            .metadata()
            .await
            .map_err(|e| ArchiveError::filesystem(path, e))?
            .len();

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ArchiveError::UnknownMime(path.display().to_string()))?;
        let mime_type = mime_type_for(file_name)?;

        let envelope = MultipartEnvelope::new(FILE_FIELD, file_name, mime_type);
        let StreamingUpload {
            content_type,
            content_length,
            body,
            encoder,
        } = StreamingUpload::start(envelope, file, file_size)?;
        let url = self.endpoint(&["bookmarks", &bookmark_id.to_string(), "assets", "upload"])?;

        debug!(
            bookmark_id,
            file_name, mime_type, file_size, content_length, "Adding asset for bookmark"
        );

        let request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, content_length)
            .body(body);

        match self.authorize(request).send().await {
            // linkding may reject the upload before reading the whole body.
            Ok(response) if !response.status().is_success() => {
                encoder.abort();
                Err(wire_error(response).await)
            }
            Ok(response) => {
                encoder.finish().await?;
                let asset: Asset = decode(response).await?;
                debug!(bookmark_id, asset_id = asset.id, "Added asset");
                Ok(asset)
            }
            Err(e) => {
                // A failed body surfaces here as a transport error; prefer the encoder's cause.
                encoder.finish().await?;
                Err(ArchiveError::Transport(e))
            }
        }
    }

    /// Fetch the authenticated user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be decoded.
    pub async fn user_profile(&self) -> Result<UserProfile, ArchiveError> {
        let url = self.endpoint(&["user", "profile"])?;
        let response = self.send(self.http.get(url)).await?;
        decode(response).await
    }

    /// `{base}/api/{segments...}/`
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ArchiveError> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                ArchiveError::Configuration(format!("base URL cannot have a path: {}", self.base_url))
            })?;
            path.pop_if_empty().push("api").extend(segments).push("");
        }
        Ok(url)
    }

    async fn get_page<T: DeserializeOwned>(&self, url: Url) -> Result<Page<T>, ArchiveError> {
        let response = self.send(self.http.get(url)).await?;
        decode(response).await
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(AUTHORIZATION, format!("Token {}", self.token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ArchiveError> {
        let response = self.authorize(request).send().await?;
        self.check(response).await
    }

    async fn check(&self, response: Response) -> Result<Response, ArchiveError> {
        debug!(url = %response.url(), status = response.status().as_u16(), "Received HTTP response");

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(wire_error(response).await)
        }
    }
}

async fn wire_error(response: Response) -> ArchiveError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ArchiveError::Wire { status, body }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ArchiveError> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| ArchiveError::Decode(e.to_string()))
}
