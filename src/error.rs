//! Error types shared by the wire client and the archival pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of an [`ArchiveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Wire,
    Download,
    Upload,
    Filesystem,
    UnknownMime,
}

/// Errors produced while talking to linkding or archiving a bookmark.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// linkding answered with a non-2xx status.
    #[error("expected success status code, was {status}: {body}")]
    Wire {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("media download failed: {0}")]
    Download(String),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown MIME type for {0}")]
    UnknownMime(String),
}

impl ArchiveError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// The closed error kind this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Wire { .. } | Self::Transport(_) | Self::Decode(_) => ErrorKind::Wire,
            Self::Download(_) => ErrorKind::Download,
            Self::Upload(_) => ErrorKind::Upload,
            Self::Filesystem { .. } => ErrorKind::Filesystem,
            Self::UnknownMime(_) => ErrorKind::UnknownMime,
        }
    }

    /// HTTP status of a non-2xx response, if this is one.
    #[must_use]
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::Wire { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_groups_wire_failures() {
        let wire = ArchiveError::Wire {
            status: reqwest::StatusCode::NOT_FOUND,
            body: String::new(),
        };
        assert_eq!(wire.kind(), ErrorKind::Wire);
        assert_eq!(wire.status(), Some(reqwest::StatusCode::NOT_FOUND));

        let decode = ArchiveError::Decode("bad json".to_string());
        assert_eq!(decode.kind(), ErrorKind::Wire);
        assert_eq!(decode.status(), None);
    }

    #[test]
    fn test_kind_for_local_failures() {
        let fs = ArchiveError::filesystem(
            "/tmp/missing.mp4",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert_eq!(fs.kind(), ErrorKind::Filesystem);
        assert!(fs.to_string().contains("/tmp/missing.mp4"));

        assert_eq!(
            ArchiveError::UnknownMime("a.txt".to_string()).kind(),
            ErrorKind::UnknownMime
        );
        assert_eq!(
            ArchiveError::Download("exit 1".to_string()).kind(),
            ErrorKind::Download
        );
    }
}
