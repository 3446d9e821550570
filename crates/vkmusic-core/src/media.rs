//! Audio extraction from shared links via yt-dlp
//!
//! Every download runs in its own working directory under the configured
//! downloads root; callers remove it with [`FetchedAudio::cleanup`] once the
//! file has been delivered.

use async_trait::async_trait;
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// yt-dlp messages meaning the media can never be fetched
const FATAL_ERROR_PATTERNS: &[&str] = &[
    "Video unavailable",
    "Private video",
    "This video is private",
    "Sign in to confirm your age",
    "members-only",
    "removed by the uploader",
    "no longer available",
    "blocked it in your country",
    "copyright",
    "ERROR: Unsupported URL",
    "is not a valid URL",
    "HTTP Error 403",
    "HTTP Error 404",
];

/// Maximum characters of yt-dlp stderr kept in an error
const STDERR_LIMIT: usize = 500;

/// Errors raised while fetching audio
#[derive(Debug, Error)]
pub enum MediaError {
    /// The text is not an http(s) URL
    #[error("Not a downloadable link: {0}")]
    InvalidUrl(String),
    /// The source refused the media (private, removed, geo-blocked, ...)
    #[error("Media unavailable: {0}")]
    Unavailable(String),
    /// yt-dlp failed for another reason
    #[error("yt-dlp failed: {0}")]
    Failed(String),
    /// yt-dlp did not finish in time
    #[error("Download timed out after {0:?}")]
    Timeout(Duration),
    /// yt-dlp succeeded but reported no usable file
    #[error("yt-dlp produced no audio file")]
    MissingOutput,
    /// Filesystem or process spawning error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An audio file extracted from a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAudio {
    /// Path of the audio file
    pub path: PathBuf,
    /// Title reported by the source
    pub title: String,
    /// Per-download directory holding `path`
    pub workdir: PathBuf,
}

impl FetchedAudio {
    /// Deletes the download directory.
    pub async fn cleanup(&self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.workdir).await {
            warn!(path = %self.workdir.display(), error = %e, "Failed to remove download directory");
        }
    }
}

/// Interface for media downloaders
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Downloads the audio track behind `url`.
    async fn fetch_audio(&self, url: &str) -> Result<FetchedAudio, MediaError>;
}

/// Returns the parsed URL when `text` is a single http(s) link.
#[must_use]
pub fn parse_link(text: &str) -> Option<Url> {
    let text = text.trim();
    if text.is_empty() || text.contains(char::is_whitespace) {
        return None;
    }
    Url::parse(text)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
}

fn is_fatal_ytdlp_error(stderr: &str) -> bool {
    FATAL_ERROR_PATTERNS
        .iter()
        .any(|pattern| stderr.contains(pattern))
}

/// Extracts `(title, filepath)` from the two `--print after_move:` lines.
fn parse_print_output(stdout: &str) -> Option<(String, PathBuf)> {
    let mut lines = stdout.lines().map(str::trim).filter(|line| !line.is_empty());
    let path = lines.next_back()?;
    let title = lines.next_back().unwrap_or_default();
    Some((title.to_string(), PathBuf::from(path)))
}

/// Fetcher that shells out to yt-dlp and converts to mp3
pub struct YtDlpFetcher {
    binary: String,
    downloads_dir: PathBuf,
    timeout: Duration,
}

impl YtDlpFetcher {
    /// Creates a fetcher.
    #[must_use]
    pub fn new(binary: impl Into<String>, downloads_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            downloads_dir: downloads_dir.into(),
            timeout,
        }
    }

    async fn run(&self, url: &Url, workdir: &Path) -> Result<FetchedAudio, MediaError> {
        let template = workdir.join("%(title).80s.%(ext)s");

        let mut command = Command::new(&self.binary);
        command
            .args(["-x", "--audio-format", "mp3", "--audio-quality", "0"])
            .args(["--no-playlist", "--no-progress", "--no-warnings"])
            .args(["--print", "after_move:title", "--print", "after_move:filepath"])
            .arg("-o")
            .arg(&template)
            .arg(url.as_str())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!(url = %url, "Running yt-dlp");
        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| MediaError::Timeout(self.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = crate::utils::truncate_str(stderr.trim(), STDERR_LIMIT);
            if is_fatal_ytdlp_error(&message) {
                return Err(MediaError::Unavailable(message));
            }
            return Err(MediaError::Failed(message));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (title, path) = parse_print_output(&stdout).ok_or(MediaError::MissingOutput)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(MediaError::MissingOutput);
        }

        Ok(FetchedAudio {
            title: if title.is_empty() {
                path.file_stem()
                    .map_or_else(String::new, |stem| stem.to_string_lossy().to_string())
            } else {
                title
            },
            path,
            workdir: workdir.to_path_buf(),
        })
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch_audio(&self, url: &str) -> Result<FetchedAudio, MediaError> {
        let url = parse_link(url).ok_or_else(|| MediaError::InvalidUrl(url.to_string()))?;

        let workdir = self.downloads_dir.join(uuid::Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&workdir).await?;

        match self.run(&url, &workdir).await {
            Ok(audio) => {
                info!(url = %url, title = %audio.title, "Audio extracted");
                Ok(audio)
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Audio extraction failed");
                let _ = tokio::fs::remove_dir_all(&workdir).await;
                Err(e)
            }
        }
    }
}
