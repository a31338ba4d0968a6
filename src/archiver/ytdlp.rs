use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use crate::error::ArchiveError;

/// Fetches the media behind a URL into local files.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Download the media at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Download`] if the tool fails or times out.
    async fn download(&self, url: &str) -> Result<Download, ArchiveError>;
}

/// Files produced by one download, living in their own directory.
///
/// The directory and anything left in it are removed on drop.
#[derive(Debug)]
pub struct Download {
    dir: TempDir,
    pub paths: Vec<PathBuf>,
}

impl Download {
    #[must_use]
    pub const fn new(dir: TempDir, paths: Vec<PathBuf>) -> Self {
        Self { dir, paths }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the download directory.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Filesystem`] if the directory cannot be removed.
    pub fn close(self) -> Result<(), ArchiveError> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|e| ArchiveError::filesystem(path, e))
    }
}

/// yt-dlp invoked as a child process.
#[derive(Debug, Clone)]
pub struct Ytdlp {
    binary: String,
    download_dir: PathBuf,
    format: Option<String>,
    timeout: Duration,
}

impl Ytdlp {
    /// Downloads land in fresh subdirectories of `download_dir`.
    #[must_use]
    pub fn new(binary: impl Into<String>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            download_dir: download_dir.into(),
            format: None,
            timeout: Duration::from_secs(crate::constants::DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: Option<String>) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check if the binary runs.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--no-simulate".to_string(),
            "--restrict-filenames".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
        ];
        if let Some(format) = &self.format {
            args.push("--format".to_string());
            args.push(format.clone());
        }
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl MediaDownloader for Ytdlp {
    async fn download(&self, url: &str) -> Result<Download, ArchiveError> {
        let dir = tempfile::Builder::new()
            .prefix("download-")
            .tempdir_in(&self.download_dir)
            .map_err(|e| ArchiveError::filesystem(&self.download_dir, e))?;

        let args = self.args(url);
        debug!(url, dir = %dir.path().display(), ?args, "Running yt-dlp");

        let child = Command::new(&self.binary)
            .args(&args)
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ArchiveError::Download(format!("failed to spawn {}: {e}", self.binary)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                ArchiveError::Download(format!(
                    "yt-dlp timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| ArchiveError::Download(format!("failed to wait for yt-dlp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ArchiveError::Download(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let paths = parse_printed_paths(&stdout, dir.path());
        debug!(url, count = paths.len(), "yt-dlp finished");

        Ok(Download::new(dir, paths))
    }
}

/// One path per non-blank stdout line, relative ones resolved against `dir`.
fn parse_printed_paths(stdout: &str, dir: &Path) -> Vec<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| dir.join(line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_without_format() {
        let ytdlp = Ytdlp::new("yt-dlp", "/tmp");
        assert_eq!(
            ytdlp.args("https://example.com/v/1"),
            vec![
                "--no-simulate",
                "--restrict-filenames",
                "--print",
                "after_move:filepath",
                "https://example.com/v/1",
            ]
        );
    }

    #[test]
    fn test_args_with_format() {
        let ytdlp = Ytdlp::new("yt-dlp", "/tmp").with_format(Some("bestaudio".to_string()));
        let args = ytdlp.args("https://example.com/v/1");
        assert_eq!(&args[4..], ["--format", "bestaudio", "https://example.com/v/1"]);
    }

    #[test]
    fn test_parse_printed_paths() {
        let dir = Path::new("/work/download-abc");
        let stdout = "/work/download-abc/Clip.mp4\n\n  Clip.m4a  \r\n";
        assert_eq!(
            parse_printed_paths(stdout, dir),
            vec![
                PathBuf::from("/work/download-abc/Clip.mp4"),
                PathBuf::from("/work/download-abc/Clip.m4a"),
            ]
        );
        assert!(parse_printed_paths("\n \n", dir).is_empty());
    }

    #[tokio::test]
    async fn test_missing_binary_is_download_error() {
        let work = tempfile::tempdir().unwrap();
        let ytdlp = Ytdlp::new("definitely-not-a-real-yt-dlp", work.path());

        assert!(!ytdlp.is_available().await);
        let err = ytdlp.download("https://example.com").await.unwrap_err();
        assert!(matches!(err, ArchiveError::Download(_)));
    }

    #[test]
    fn test_download_close_removes_dir() {
        let work = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir_in(work.path()).unwrap();
        let path = dir.path().to_path_buf();
        std::fs::write(path.join("left.mp4"), b"x").unwrap();

        Download::new(dir, vec![]).close().unwrap();
        assert!(!path.exists());
    }
}
