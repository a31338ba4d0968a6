//! Typed query parameters for the bookmark listing endpoint.

use chrono::{DateTime, SecondsFormat, Utc};
use url::Url;

/// Prefix linkding's search syntax uses to match a tag.
const TAG_MARKER: char = '#';

/// Filter for a single bookmark listing request.
///
/// linkding's search only combines tags as an intersection, so callers that
/// want "any of these tags" issue one query per tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarksQuery {
    pub tag: Option<String>,
    pub bundle_id: Option<i64>,
    pub modified_since: Option<DateTime<Utc>>,
}

impl BookmarksQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let tag = tag.trim();
        self.tag = (!tag.is_empty()).then(|| tag.to_string());
        self
    }

    #[must_use]
    pub fn bundle(mut self, bundle_id: Option<i64>) -> Self {
        self.bundle_id = bundle_id;
        self
    }

    #[must_use]
    pub fn modified_since(mut self, since: Option<DateTime<Utc>>) -> Self {
        self.modified_since = since;
        self
    }

    /// Query pairs in the order they are appended to the URL.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(tag) = &self.tag {
            pairs.push(("q", format!("{TAG_MARKER}{tag}")));
        }

        if let Some(since) = self.modified_since {
            pairs.push((
                "modified_since",
                since.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }

        if let Some(bundle_id) = self.bundle_id {
            pairs.push(("bundle", bundle_id.to_string()));
        }

        pairs
    }

    /// Append this query's parameters to `url`.
    pub fn apply(&self, url: &mut Url) {
        let pairs = self.to_pairs();
        if pairs.is_empty() {
            return;
        }

        let mut query = url.query_pairs_mut();
        for (key, value) in pairs {
            query.append_pair(key, &value);
        }
    }
}
