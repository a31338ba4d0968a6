//! Audio/video content types recognised as archived media.

use std::path::Path;

use crate::error::ArchiveError;

/// Lower-cased file extension (without the dot) to canonical MIME type.
const EXTENSION_MAP: &[(&str, &str)] = &[
    ("3g2", "video/3gpp2"),
    ("3gp", "video/3gpp"),
    ("aac", "audio/aac"),
    ("avi", "video/x-msvideo"),
    ("flac", "audio/flac"),
    ("flv", "video/x-flv"),
    ("m4a", "audio/mp4"),
    ("m4v", "video/x-m4v"),
    ("mkv", "video/x-matroska"),
    ("mov", "video/quicktime"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("ogg", "audio/ogg"),
    ("ogv", "video/ogg"),
    ("opus", "audio/opus"),
    ("wav", "audio/wav"),
    ("weba", "audio/webm"),
    ("webm", "video/webm"),
    ("wmv", "video/x-ms-wmv"),
];

/// Look up the MIME type for a file name by its extension.
///
/// # Errors
///
/// Returns [`ArchiveError::UnknownMime`] when the extension is missing or not in the table.
pub fn mime_type_for(file_name: impl AsRef<Path>) -> Result<&'static str, ArchiveError> {
    let file_name = file_name.as_ref();
    let ext = file_name
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    ext.and_then(|ext| {
        EXTENSION_MAP
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, mime)| *mime)
    })
    .ok_or_else(|| ArchiveError::UnknownMime(file_name.display().to_string()))
}

/// Whether a content type is one of the media types in the table.
///
/// Compared case-insensitively against the table values, so an asset counts
/// as media regardless of which extension produced it.
#[must_use]
pub fn is_media_type(content_type: &str) -> bool {
    EXTENSION_MAP
        .iter()
        .any(|(_, mime)| mime.eq_ignore_ascii_case(content_type))
}
