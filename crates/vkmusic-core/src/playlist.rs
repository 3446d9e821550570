//! Per-user playlist store
//!
//! Playlists are append-only: no removal, reordering or deduplication.
//! Appending the same track twice keeps both entries.

use crate::catalog::TrackId;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Interface for playlist stores
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaylistStore: Send + Sync {
    /// Adds `track_id` to the end of the user's playlist, creating it if absent.
    async fn append(&self, user_id: i64, track_id: TrackId);
    /// The user's playlist in insertion order; empty for unknown users.
    async fn list(&self, user_id: i64) -> Vec<TrackId>;
}

/// Process-lifetime playlist store
#[derive(Debug, Default)]
pub struct InMemoryPlaylistStore {
    playlists: RwLock<HashMap<i64, Vec<TrackId>>>,
}

impl InMemoryPlaylistStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlaylistStore for InMemoryPlaylistStore {
    async fn append(&self, user_id: i64, track_id: TrackId) {
        let mut playlists = self.playlists.write().await;
        let playlist = playlists.entry(user_id).or_default();
        playlist.push(track_id);
        debug!(user_id, size = playlist.len(), "Track appended to playlist");
    }

    async fn list(&self, user_id: i64) -> Vec<TrackId> {
        self.playlists
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }
}
