//! Search orchestration
//!
//! Validates the query, consults the lookup cache and falls through to the
//! catalog on a miss. Only successful, fully decoded results are cached.

use crate::cache::LookupCache;
use crate::catalog::{
    decode_audio_search, normalize_query, CatalogClient, SearchParams, Track, UpstreamError,
};
use crate::config::SEARCH_RESULT_LIMIT;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors surfaced by [`SearchService::search`]
#[derive(Debug, Error)]
pub enum SearchError {
    /// The query was empty or whitespace only
    #[error("Search query is empty")]
    InvalidQuery,
    /// The catalog failed or answered with something unusable
    #[error("Catalog search failed: {0}")]
    Upstream(#[from] UpstreamError),
}

/// Cached track search over a music catalog
pub struct SearchService {
    catalog: Arc<dyn CatalogClient>,
    cache: Arc<dyn LookupCache>,
    api_version: String,
    timeout: Duration,
}

impl SearchService {
    /// Creates a search service.
    ///
    /// `timeout` bounds each catalog call, independently of any timeout the
    /// catalog client applies itself.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        cache: Arc<dyn LookupCache>,
        api_version: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            cache,
            api_version: api_version.into(),
            timeout,
        }
    }

    /// The cache backing this service.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn LookupCache> {
        &self.cache
    }

    /// Searches the catalog for up to five tracks matching `query`.
    ///
    /// Makes at most one catalog call, and none when the query is invalid or
    /// the normalized query is already cached.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::InvalidQuery` for blank input and
    /// `SearchError::Upstream` when the catalog call fails, times out or
    /// returns an unexpected envelope.
    pub async fn search(&self, query: &str) -> Result<Vec<Track>, SearchError> {
        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return Err(SearchError::InvalidQuery);
        }

        let params =
            SearchParams::new(normalized, SEARCH_RESULT_LIMIT, self.api_version.as_str());
        let key = params.cache_key();

        if let Some(tracks) = self.cache.get(&key).await {
            debug!(query = %params.query, "Search cache hit");
            return Ok(tracks);
        }
        debug!(query = %params.query, "Search cache miss, querying catalog");

        let call = self.catalog.audio_search(&params);
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.and_then(decode_audio_search),
            Err(_) => Err(UpstreamError::Timeout(self.timeout)),
        };

        let mut tracks = match result {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!(query = %params.query, error = %e, "Catalog search failed");
                return Err(e.into());
            }
        };
        tracks.truncate(SEARCH_RESULT_LIMIT as usize);

        self.cache.put(key, tracks.clone()).await;
        Ok(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{EvictionPolicy, InMemoryLookupCache, MockLookupCache};
    use crate::catalog::MockCatalogClient;
    use crate::testing::{error_envelope, mock_catalog_returning, search_envelope};
    use mockall::predicate::function;
    use serde_json::json;

    fn service(catalog: MockCatalogClient) -> SearchService {
        SearchService::new(
            Arc::new(catalog),
            Arc::new(InMemoryLookupCache::new(None, EvictionPolicy::Unbounded)),
            "5.131",
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_blank_query_makes_no_calls() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_audio_search().never();
        let service = service(catalog);

        assert!(matches!(service.search("").await, Err(SearchError::InvalidQuery)));
        assert!(matches!(service.search("   ").await, Err(SearchError::InvalidQuery)));
    }

    #[tokio::test]
    async fn test_miss_then_hit() -> Result<(), SearchError> {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_audio_search()
            .with(function(|p: &SearchParams| {
                p.query == "adele hello" && p.count == 5 && p.version == "5.131"
            }))
            .times(1)
            .returning(|_| Ok(search_envelope(3)));
        let service = service(catalog);

        let first = service.search("adele hello").await?;
        let second = service.search("  Adele   HELLO ").await?;

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn test_results_are_capped_at_limit() -> Result<(), SearchError> {
        let service = service(mock_catalog_returning(search_envelope(8)));
        let tracks = service.search("adele").await?;
        assert_eq!(tracks.len(), SEARCH_RESULT_LIMIT as usize);
        Ok(())
    }

    #[tokio::test]
    async fn test_error_envelope_is_not_cached() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_audio_search()
            .times(2)
            .returning(|_| Ok(error_envelope(6, "Too many requests per second")));
        let service = service(catalog);

        for _ in 0..2 {
            assert!(matches!(
                service.search("adele").await,
                Err(SearchError::Upstream(UpstreamError::Api { code: 6, .. }))
            ));
        }
        assert_eq!(service.cache().entry_count().await, 0);
    }

    #[tokio::test]
    async fn test_transport_error_is_not_cached() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_audio_search()
            .times(1)
            .returning(|_| Err(UpstreamError::Network("connection reset".to_string())));
        let mut cache = MockLookupCache::new();
        cache.expect_get().times(1).returning(|_| None);
        cache.expect_put().never();

        let service = SearchService::new(
            Arc::new(catalog),
            Arc::new(cache),
            "5.131",
            Duration::from_secs(5),
        );

        assert!(matches!(
            service.search("adele").await,
            Err(SearchError::Upstream(UpstreamError::Network(_)))
        ));
    }

    #[tokio::test]
    async fn test_malformed_envelope_is_upstream_error() {
        let service = service(mock_catalog_returning(json!({ "response": {} })));
        assert!(matches!(
            service.search("adele").await,
            Err(SearchError::Upstream(UpstreamError::Malformed(_)))
        ));
    }

    #[tokio::test]
    async fn test_empty_result_is_cached() -> Result<(), SearchError> {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_audio_search()
            .times(1)
            .returning(|_| Ok(json!({ "response": { "count": 0, "items": [] } })));
        let service = service(catalog);

        assert!(service.search("zzzz").await?.is_empty());
        assert!(service.search("zzzz").await?.is_empty());
        Ok(())
    }
}
