//! Testing helpers and mock utilities.
//!
//! Provides a controllable clock, track fixtures, canned catalog envelopes
//! and a transport that records outbound actions.

use crate::cache::Clock;
use crate::catalog::{MockCatalogClient, SourceRef, Track, TrackId};
use crate::chat::{ChatTransport, Outbound};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at 2024-01-01T00:00:00Z.
    #[must_use]
    pub fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let Ok(delta) = TimeDelta::from_std(by) else {
            return;
        };
        if let Ok(mut now) = self.now.lock() {
            *now += delta;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}

/// Build a track as the catalog decoder would.
#[must_use]
pub fn sample_track(owner_id: i64, id: i64, artist: &str, title: &str) -> Track {
    Track {
        id: TrackId::from_parts(owner_id, id),
        title: title.to_string(),
        artist: artist.to_string(),
        source_ref: SourceRef {
            owner_id,
            track_id: id,
            url: None,
        },
    }
}

/// A successful `audio.search` envelope with `n` items.
#[must_use]
pub fn search_envelope(n: usize) -> Value {
    let items: Vec<Value> = (1..=n)
        .map(|i| {
            json!({
                "id": 456_239_000 + i,
                "owner_id": 371_745_461,
                "artist": "Adele",
                "title": format!("Hello {i}"),
                "duration": 295,
                "url": ""
            })
        })
        .collect();
    json!({ "response": { "count": n, "items": items } })
}

/// A VK error envelope.
#[must_use]
pub fn error_envelope(code: i64, message: &str) -> Value {
    json!({ "error": { "error_code": code, "error_msg": message } })
}

/// Create a mock catalog that answers every search with `envelope`.
#[must_use]
pub fn mock_catalog_returning(envelope: Value) -> MockCatalogClient {
    let mut mock = MockCatalogClient::new();
    mock.expect_audio_search()
        .returning(move |_| Ok(envelope.clone()));
    mock
}

/// Transport that records every delivered action.
#[derive(Default)]
pub struct RecordingTransport {
    delivered: Mutex<Vec<Outbound>>,
}

impl RecordingTransport {
    /// Actions delivered so far, in order.
    #[must_use]
    pub fn delivered(&self) -> Vec<Outbound> {
        self.delivered
            .lock()
            .map(|delivered| delivered.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn deliver(&self, action: Outbound) -> Result<()> {
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push(action);
        }
        Ok(())
    }
}
