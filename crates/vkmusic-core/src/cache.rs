//! Lookup cache for catalog search results
//!
//! Entries expire lazily: an expired entry is dropped by the `get` that finds
//! it, there is no background sweep. An optional capacity bound evicts either
//! the oldest insertion (FIFO) or the least recently used key (LRU) before a
//! new key is inserted into a full cache.

use crate::catalog::Track;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by [`Utc::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Rule applied when a bounded cache is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Never evict; entries live until they expire or the process exits
    Unbounded,
    /// Evict the least recently inserted entry
    Fifo {
        /// Maximum number of entries
        capacity: usize,
    },
    /// Evict the least recently inserted or read entry
    Lru {
        /// Maximum number of entries
        capacity: usize,
    },
}

impl EvictionPolicy {
    const fn capacity(self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::Fifo { capacity } | Self::Lru { capacity } => Some(capacity),
        }
    }

    const fn refresh_on_read(self) -> bool {
        matches!(self, Self::Lru { .. })
    }
}

/// A cached search result
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Normalized request key
    pub key: String,
    /// Tracks returned by the catalog, in catalog order
    pub value: Vec<Track>,
    /// Time of insertion
    pub created_at: DateTime<Utc>,
    /// Expiry time, `None` when no TTL is configured
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Whether the entry is past its expiry time at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }
}

/// Interface for search result caches
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LookupCache: Send + Sync {
    /// Returns the cached tracks for `key`, evicting the entry if it expired.
    async fn get(&self, key: &str) -> Option<Vec<Track>>;
    /// Inserts or overwrites the entry for `key`.
    async fn put(&self, key: String, value: Vec<Track>);
    /// Number of entries currently held, expired ones included.
    async fn entry_count(&self) -> usize;
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// Keys from eviction candidate to most recent; only kept for bounded policies
    order: VecDeque<String>,
}

impl CacheState {
    fn forget(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }

    fn touch(&mut self, key: &str) {
        self.forget(key);
        self.order.push_back(key.to_string());
    }
}

/// In-process cache guarded by a single lock
pub struct InMemoryLookupCache {
    state: Mutex<CacheState>,
    ttl: Option<Duration>,
    policy: EvictionPolicy,
    clock: Arc<dyn Clock>,
}

impl InMemoryLookupCache {
    /// Creates a cache using the system clock.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use vkmusic_core::cache::{EvictionPolicy, InMemoryLookupCache};
    ///
    /// // One hour TTL, at most 100 queries, oldest insertion evicted first
    /// let cache = InMemoryLookupCache::new(
    ///     Some(Duration::from_secs(3600)),
    ///     EvictionPolicy::Fifo { capacity: 100 },
    /// );
    /// ```
    #[must_use]
    pub fn new(ttl: Option<Duration>, policy: EvictionPolicy) -> Self {
        Self::with_clock(ttl, policy, Arc::new(SystemClock))
    }

    /// Creates a cache reading time from `clock`.
    #[must_use]
    pub fn with_clock(ttl: Option<Duration>, policy: EvictionPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            ttl,
            policy,
            clock,
        }
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.ttl
            .and_then(|ttl| TimeDelta::from_std(ttl).ok())
            .and_then(|ttl| now.checked_add_signed(ttl))
    }
}

#[async_trait]
impl LookupCache for InMemoryLookupCache {
    async fn get(&self, key: &str) -> Option<Vec<Track>> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;

        let expired = state.entries.get(key)?.is_expired(now);
        if expired {
            state.entries.remove(key);
            state.forget(key);
            debug!(key = %key, "Evicted expired cache entry");
            return None;
        }

        if self.policy.refresh_on_read() {
            state.touch(key);
        }
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    async fn put(&self, key: String, value: Vec<Track>) {
        let now = self.clock.now();
        let entry = CacheEntry {
            key: key.clone(),
            value,
            created_at: now,
            expires_at: self.expiry_from(now),
        };

        let mut state = self.state.lock().await;
        if let Some(capacity) = self.policy.capacity() {
            if !state.entries.contains_key(&key) {
                while state.entries.len() >= capacity {
                    let Some(victim) = state.order.pop_front() else {
                        break;
                    };
                    state.entries.remove(&victim);
                    debug!(key = %victim, "Evicted cache entry to stay within capacity");
                }
            }
            state.touch(&key);
        }
        state.entries.insert(key, entry);
    }

    async fn entry_count(&self) -> usize {
        self.state.lock().await.entries.len()
    }
}
