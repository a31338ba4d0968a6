use std::path::Path;

use crate::constants::{SIMULATED_ASSET_ID, SIMULATED_ASSET_NAME};
use crate::error::ArchiveError;
use crate::linkding::{mime_type_for, Asset, ASSET_TYPE_UPLOAD};

/// Stand-in for the asset an upload of `path` would create.
///
/// The file must exist and have a known media extension; nothing is sent.
///
/// # Errors
///
/// Returns [`ArchiveError::Filesystem`] if the file cannot be opened and
/// [`ArchiveError::UnknownMime`] if its extension is not a media type.
pub async fn simulated_asset(path: &Path) -> Result<Asset, ArchiveError> {
    tokio::fs::File::open(path)
        .await
        .map_err(|e| ArchiveError::filesystem(path, e))?;

    let content_type = mime_type_for(path)?;
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    Ok(Asset {
        id: SIMULATED_ASSET_ID,
        asset_type: ASSET_TYPE_UPLOAD.to_string(),
        content_type: content_type.to_string(),
        display_name: format!("{SIMULATED_ASSET_NAME}{extension}"),
    })
}
