//! Music catalog client and track model
//!
//! [`CatalogClient`] performs the transport half of a search and hands back
//! the raw response envelope; [`envelope::decode_audio_search`] turns that
//! envelope into [`Track`]s or rejects it.

/// Strict decoding of catalog response envelopes.
pub mod envelope;
/// VK API HTTP client.
pub mod vk;

pub use envelope::decode_audio_search;
pub use vk::VkClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// VK method used for track search.
pub const AUDIO_SEARCH_METHOD: &str = "audio.search";

/// Errors reported by the catalog or while decoding its responses
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The catalog answered with an error envelope
    #[error("VK API error {code}: {message}")]
    Api {
        /// VK error code
        code: i64,
        /// VK error message
        message: String,
    },
    /// Non-2xx HTTP status
    #[error("HTTP status {status}: {body}")]
    Status {
        /// Status code
        status: u16,
        /// Response body, truncated
        body: String,
    },
    /// Connection or transport failure
    #[error("Network error: {0}")]
    Network(String),
    /// The request did not finish in time
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// The response did not match the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Opaque track identifier, `"{owner_id}_{id}"` for VK tracks
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    /// Compose the identifier of a VK track.
    #[must_use]
    pub fn from_parts(owner_id: i64, id: i64) -> Self {
        Self(format!("{owner_id}_{id}"))
    }

    /// The identifier as stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits a VK composite identifier into owner id and track id.
    #[must_use]
    pub fn parts(&self) -> Option<(i64, i64)> {
        let (owner, id) = self.0.rsplit_once('_')?;
        Some((owner.parse().ok()?, id.parse().ok()?))
    }

    /// VK page of the track, when the identifier is a VK composite.
    #[must_use]
    pub fn page_url(&self) -> Option<String> {
        self.parts()
            .map(|(owner_id, id)| vk_audio_page(owner_id, id))
    }
}

impl From<String> for TrackId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn vk_audio_page(owner_id: i64, id: i64) -> String {
    format!("https://vk.com/audio{owner_id}_{id}")
}

/// Enough information to reach a track again without searching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Owner of the audio record
    pub owner_id: i64,
    /// Audio record id within the owner
    pub track_id: i64,
    /// Direct stream URL, when the catalog exposed one
    pub url: Option<String>,
}

impl SourceRef {
    /// Public VK page for the track.
    #[must_use]
    pub fn page_url(&self) -> String {
        vk_audio_page(self.owner_id, self.track_id)
    }
}

/// A track returned by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Composite identifier
    pub id: TrackId,
    /// Track title, may be empty
    pub title: String,
    /// Performer, may be empty
    pub artist: String,
    /// Reference used to rebuild a link
    pub source_ref: SourceRef,
}

impl Track {
    /// `"artist - title"`, falling back to whichever part is present.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (self.artist.trim(), self.title.trim()) {
            ("", "") => self.id.to_string(),
            (artist, "") => artist.to_string(),
            ("", title) => title.to_string(),
            (artist, title) => format!("{artist} - {title}"),
        }
    }
}

/// Folds case and collapses whitespace so equivalent queries share a key.
///
/// # Examples
///
/// ```
/// use vkmusic_core::catalog::normalize_query;
///
/// assert_eq!(normalize_query("  Adele   HELLO "), "adele hello");
/// ```
#[must_use]
pub fn normalize_query(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parameters of one `audio.search` call, minus the credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    /// Normalized query text
    pub query: String,
    /// Maximum number of results requested
    pub count: u32,
    /// API protocol version
    pub version: String,
}

impl SearchParams {
    /// Parameters for an already normalized query.
    #[must_use]
    pub fn new(query: String, count: u32, version: impl Into<String>) -> Self {
        Self {
            query,
            count,
            version: version.into(),
        }
    }

    /// Deterministic cache key covering every parameter that affects the result.
    ///
    /// JSON object keys are emitted in sorted order, so equal parameters
    /// always produce the same key and distinct ones never collide.
    #[must_use]
    pub fn cache_key(&self) -> String {
        json!({
            "method": AUDIO_SEARCH_METHOD,
            "q": self.query,
            "count": self.count,
            "v": self.version,
        })
        .to_string()
    }
}

/// Interface for music catalogs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Runs a track search and returns the raw response envelope.
    async fn audio_search(&self, params: &SearchParams) -> Result<Value, UpstreamError>;
}
