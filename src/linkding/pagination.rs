use std::future::Future;

use url::Url;

use super::types::Page;
use crate::error::ArchiveError;

/// Collect every item of a paginated collection.
///
/// Starts at `first` and follows each page's `next` link exactly as the server
/// sent it until a page has none. Any failed page aborts the traversal.
///
/// # Errors
///
/// Returns the first error from `fetch_page`, or [`ArchiveError::Decode`] if a
/// `next` link is not a valid URL.
pub async fn fetch_all<T, F, Fut>(first: Url, mut fetch_page: F) -> Result<Vec<T>, ArchiveError>
where
    F: FnMut(Url) -> Fut,
    Fut: Future<Output = Result<Page<T>, ArchiveError>>,
{
    let mut results = Vec::new();
    let mut next = Some(first);

    while let Some(url) = next.take() {
        let page = fetch_page(url).await?;
        results.extend(page.results);

        if let Some(link) = page.next {
            let url = Url::parse(&link)
                .map_err(|e| ArchiveError::Decode(format!("invalid next link {link:?}: {e}")))?;
            next = Some(url);
        }
    }

    Ok(results)
}
