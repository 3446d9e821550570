//! Strict decoding of VK response envelopes.
//!
//! Any structural mismatch becomes [`UpstreamError::Malformed`]; an
//! `error` object becomes [`UpstreamError::Api`].

use super::{SourceRef, Track, TrackId, UpstreamError};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Envelope {
    response: Option<Value>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_msg: String,
}

#[derive(Debug, Deserialize)]
struct AudioSearchResponse {
    items: Vec<AudioItem>,
}

#[derive(Debug, Deserialize)]
struct AudioItem {
    id: i64,
    owner_id: i64,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: Option<String>,
}

impl From<AudioItem> for Track {
    fn from(item: AudioItem) -> Self {
        Self {
            id: TrackId::from_parts(item.owner_id, item.id),
            title: item.title,
            artist: item.artist,
            source_ref: SourceRef {
                owner_id: item.owner_id,
                track_id: item.id,
                // VK sends an empty string for restricted tracks
                url: item.url.filter(|url| !url.is_empty()),
            },
        }
    }
}

/// Extracts the track list from an `audio.search` envelope.
///
/// # Errors
///
/// Returns `UpstreamError::Api` for an error envelope and
/// `UpstreamError::Malformed` when `response.items` is missing or any item
/// lacks its identifiers.
pub fn decode_audio_search(body: Value) -> Result<Vec<Track>, UpstreamError> {
    let envelope: Envelope =
        serde_json::from_value(body).map_err(|e| UpstreamError::Malformed(e.to_string()))?;

    if let Some(error) = envelope.error {
        return Err(UpstreamError::Api {
            code: error.error_code,
            message: error.error_msg,
        });
    }

    let response = envelope
        .response
        .ok_or_else(|| UpstreamError::Malformed("missing `response` field".to_string()))?;
    let parsed: AudioSearchResponse = serde_json::from_value(response)
        .map_err(|e| UpstreamError::Malformed(format!("unexpected `response` shape: {e}")))?;

    Ok(parsed.items.into_iter().map(Track::from).collect())
}
