//! Inline button payload codec
//!
//! Payloads travel as Telegram callback data, which is capped at 64 bytes.

use crate::catalog::TrackId;
use std::fmt;
use thiserror::Error;

/// Telegram callback data limit in bytes
pub const MAX_PAYLOAD_BYTES: usize = 64;

const ADD_PREFIX: &str = "add";

/// Errors produced by the payload codec
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    /// The encoded payload exceeds the callback data limit
    #[error("Payload is {0} bytes, limit is {MAX_PAYLOAD_BYTES}")]
    TooLong(usize),
    /// The payload does not match any known action
    #[error("Unrecognized button payload: {0}")]
    Unrecognized(String),
}

/// Action carried by an inline button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonPayload {
    /// Add a track to the playlist of the user the button was rendered for
    AddToPlaylist {
        /// Owner of the search results
        user_id: i64,
        /// Track to append
        track_id: TrackId,
    },
}

impl ButtonPayload {
    /// Serializes the payload as `add:{user_id}:{track_id}`.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::TooLong` when the result would not fit in
    /// callback data.
    pub fn encode(&self) -> Result<String, PayloadError> {
        let encoded = self.to_string();
        if encoded.len() > MAX_PAYLOAD_BYTES {
            return Err(PayloadError::TooLong(encoded.len()));
        }
        Ok(encoded)
    }

    /// Parses callback data produced by [`ButtonPayload::encode`].
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::Unrecognized` for anything else, including
    /// buttons rendered by older layouts.
    pub fn decode(data: &str) -> Result<Self, PayloadError> {
        let unrecognized = || PayloadError::Unrecognized(data.to_string());

        let mut parts = data.splitn(3, ':');
        let (Some(ADD_PREFIX), Some(user_id), Some(track_id)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(unrecognized());
        };

        let user_id = user_id.parse::<i64>().map_err(|_| unrecognized())?;
        let track_id = TrackId::from(track_id);
        if track_id.parts().is_none() {
            return Err(unrecognized());
        }

        Ok(Self::AddToPlaylist { user_id, track_id })
    }
}

impl fmt::Display for ButtonPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddToPlaylist { user_id, track_id } => {
                write!(f, "{ADD_PREFIX}:{user_id}:{track_id}")
            }
        }
    }
}
