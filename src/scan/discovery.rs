use std::collections::HashSet;

use tracing::{debug, info};

use super::QueryFilter;
use crate::error::ArchiveError;
use crate::linkding::{Bookmark, BookmarksQuery, Client};

/// Find every bookmark matching `filter`.
///
/// Tags are combined as a union: one listing per tag, merged by id in the
/// order bookmarks were first seen. With no tags a single unfiltered
/// listing is made.
///
/// # Errors
///
/// Returns the first listing error; no partial result is produced.
pub async fn discover(client: &Client, filter: &QueryFilter) -> Result<Vec<Bookmark>, ArchiveError> {
    let mut listings = Vec::new();
    for query in queries(filter) {
        listings.push(client.bookmarks(&query).await?);
    }

    let bookmarks = merge_unique(listings);
    info!(
        count = bookmarks.len(),
        tags = ?filter.tags,
        bundle_id = ?filter.bundle_id,
        modified_since = ?filter.modified_since,
        "Discovered bookmarks"
    );
    Ok(bookmarks)
}

fn queries(filter: &QueryFilter) -> Vec<BookmarksQuery> {
    let base = BookmarksQuery::new()
        .bundle(filter.bundle_id)
        .modified_since(filter.modified_since);

    let mut seen = HashSet::new();
    let queries: Vec<_> = filter
        .tags
        .iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty() && seen.insert(*tag))
        .map(|tag| base.clone().tag(tag))
        .collect();

    if queries.is_empty() {
        vec![base]
    } else {
        queries
    }
}

fn merge_unique(listings: Vec<Vec<Bookmark>>) -> Vec<Bookmark> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for bookmark in listings.into_iter().flatten() {
        if seen.insert(bookmark.id) {
            merged.push(bookmark);
        } else {
            debug!(bookmark_id = bookmark.id, "Skipping duplicate bookmark");
        }
    }
    merged
}
