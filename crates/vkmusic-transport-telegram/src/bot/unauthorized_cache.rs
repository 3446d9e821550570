//! Flood protection for "access denied" replies
//!
//! Users outside the allow-list get at most one denial per cooldown window;
//! further attempts are only counted.

use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Log one line per this many silenced attempts
const SILENCED_LOG_EVERY: u64 = 100;

/// Tracks which unauthorized users were recently told they have no access
#[derive(Clone)]
pub struct UnauthorizedCache {
    /// Users notified within the cooldown window
    notified: Cache<i64, ()>,
    cooldown: Duration,
    silenced: Arc<AtomicU64>,
}

impl UnauthorizedCache {
    /// Creates a cache.
    ///
    /// Entries expire after `cooldown_secs` or `ttl_secs`, whichever is
    /// shorter; at most `max_capacity` users are tracked.
    ///
    /// # Examples
    ///
    /// ```
    /// use vkmusic_transport_telegram::bot::UnauthorizedCache;
    ///
    /// let cache = UnauthorizedCache::new(1200, 7200, 10_000);
    /// assert_eq!(cache.cooldown().as_secs(), 1200);
    /// ```
    #[must_use]
    pub fn new(cooldown_secs: u64, ttl_secs: u64, max_capacity: u64) -> Self {
        let notified = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(cooldown_secs.min(ttl_secs)))
            .build();

        Self {
            notified,
            cooldown: Duration::from_secs(cooldown_secs),
            silenced: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether a denial should be sent to `user_id` now.
    pub async fn should_notify(&self, user_id: i64) -> bool {
        if !self.notified.contains_key(&user_id) {
            return true;
        }

        let silenced = self.silenced.fetch_add(1, Ordering::Relaxed) + 1;
        if silenced.is_multiple_of(SILENCED_LOG_EVERY) {
            debug!(silenced, user_id, "Silencing repeated unauthorized attempts");
        }
        false
    }

    /// Starts the cooldown for `user_id` after a denial was delivered.
    pub async fn mark_notified(&self, user_id: i64) {
        self.notified.insert(user_id, ()).await;
    }

    /// Attempts that were not answered.
    #[must_use]
    pub fn silenced_count(&self) -> u64 {
        self.silenced.load(Ordering::Relaxed)
    }

    /// Configured cooldown.
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }
}
