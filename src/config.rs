use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_SCAN_INTERVAL_SECS,
};
use crate::scan::{QueryFilter, ScanConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // linkding
    pub base_url: String,
    pub token: String,

    // Bookmark filter
    pub tags: Vec<String>,
    pub bundle_id: Option<i64>,

    // Scanning
    pub scan_interval: Duration,
    pub dry_run: bool,
    pub single_run: bool,
    pub skip_first_run: bool,

    // Archive workers
    pub concurrency: usize,
    pub work_dir: PathBuf,
    pub yt_dlp_path: String,
    pub format: Option<String>,
    pub max_height: Option<u32>,
    pub download_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // linkding
            base_url: required_env("LDMA_BASEURL")?,
            token: required_env("LDMA_TOKEN")?,

            // Bookmark filter
            tags: parse_tags(&env_or_default("LDMA_TAGS", "")),
            bundle_id: parse_env_opt("LDMA_BUNDLE_ID")?,

            // Scanning
            scan_interval: Duration::from_secs(parse_scan_interval(
                optional_env("LDMA_SCAN_INTERVAL").as_deref(),
            )),
            dry_run: parse_env_bool("LDMA_DRY_RUN", false)?,
            single_run: parse_env_bool("LDMA_SINGLE_RUN", false)?,
            skip_first_run: parse_env_bool("LDMA_SKIP_FIRST_RUN", false)?,

            // Archive workers
            concurrency: parse_env("LDMA_CONCURRENCY", DEFAULT_CONCURRENCY)?,
            work_dir: optional_env("LDMA_WORK_DIR").map_or_else(std::env::temp_dir, PathBuf::from),
            yt_dlp_path: env_or_default("LDMA_YTDLP_PATH", "yt-dlp"),
            format: optional_env("LDMA_FORMAT"),
            max_height: parse_env_opt("LDMA_MAX_HEIGHT")?,
            download_timeout: Duration::from_secs(parse_env(
                "LDMA_DOWNLOAD_TIMEOUT",
                DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            )?),
        })
    }

    /// Baseline configuration for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            base_url: "http://localhost:9090".to_string(),
            token: "test-token".to_string(),
            tags: Vec::new(),
            bundle_id: None,
            scan_interval: Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECS),
            dry_run: false,
            single_run: true,
            skip_first_run: false,
            concurrency: DEFAULT_CONCURRENCY,
            work_dir: std::env::temp_dir(),
            yt_dlp_path: "yt-dlp".to_string(),
            format: None,
            max_height: None,
            download_timeout: Duration::from_secs(60),
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(_) => {
                return Err(ConfigError::InvalidValue {
                    name: "LDMA_BASEURL".to_string(),
                    message: format!("must be an http(s) URL, got '{}'", self.base_url),
                });
            }
            Err(e) => {
                return Err(ConfigError::InvalidValue {
                    name: "LDMA_BASEURL".to_string(),
                    message: format!("not an absolute URL: {e}"),
                });
            }
        }
        if self.token.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "LDMA_TOKEN".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                name: "LDMA_CONCURRENCY".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_height == Some(0) {
            return Err(ConfigError::InvalidValue {
                name: "LDMA_MAX_HEIGHT".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Scan settings, without a modification watermark.
    #[must_use]
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            filter: QueryFilter {
                tags: self.tags.clone(),
                bundle_id: self.bundle_id,
                modified_since: None,
            },
            dry_run: self.dry_run,
            concurrency: self.concurrency,
        }
    }

    /// The yt-dlp `--format` expression, if any.
    ///
    /// An explicit format wins over a height cap.
    #[must_use]
    pub fn format_selection(&self) -> Option<String> {
        self.format.clone().or_else(|| {
            self.max_height
                .map(|h| format!("b[height<={h}]/bv*[height<={h}]+ba/b[height<={h}]"))
        })
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    optional_env(name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    optional_env(name).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    Ok(parse_env_opt(name)?.unwrap_or(default))
}

fn parse_env_opt<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    optional_env(name)
        .map(|val| {
            val.trim().parse().map_err(|e| ConfigError::ParseInt {
                name: name.to_string(),
                source: e,
            })
        })
        .transpose()
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match optional_env(name) {
        Some(val) => match val.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        None => Ok(default),
    }
}

/// Whitespace-separated tags, blanks and repeats dropped.
fn parse_tags(value: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in value.split_whitespace() {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Non-positive or unparsable intervals fall back to the default.
fn parse_scan_interval(value: Option<&str>) -> u64 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|secs| u64::try_from(secs).ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_SCAN_INTERVAL_SECS)
}
