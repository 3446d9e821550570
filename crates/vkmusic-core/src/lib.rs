#![deny(missing_docs)]
//! VK music bot core library.
//!
//! Search caching, playlists, the catalog and media collaborators, and the
//! transport-independent chat event model.

/// Lookup cache for catalog search results.
pub mod cache;
/// Music catalog client and track model.
pub mod catalog;
/// Chat events, outbound actions and dispatch.
pub mod chat;
/// Configuration management.
pub mod config;
/// Audio extraction from shared links.
pub mod media;
/// Per-user playlist store.
pub mod playlist;
/// Search orchestration over the cache and catalog.
pub mod search;
/// Utility functions.
pub mod utils;
/// User-facing texts.
pub mod views;

#[cfg(test)]
pub mod testing;
