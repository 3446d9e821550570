//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! catalog and cache constants.

use crate::cache::EvictionPolicy;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Number of tracks requested per search and shown to the user.
pub const SEARCH_RESULT_LIMIT: u32 = 5;
/// Default VK API method endpoint.
pub const DEFAULT_VK_API_BASE_URL: &str = "https://api.vk.com/method";
/// Default VK API protocol version.
pub const DEFAULT_VK_API_VERSION: &str = "5.131";
/// Default timeout for a single catalog request.
pub const DEFAULT_VK_HTTP_TIMEOUT_SECS: u64 = 10;
/// Default lifetime of a cached search result (1 hour).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
/// Default maximum number of cached search results.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;
/// Default eviction rule for the bounded cache.
pub const DEFAULT_CACHE_EVICTION: &str = "fifo";
/// Default yt-dlp executable.
pub const DEFAULT_YTDLP_BINARY: &str = "yt-dlp";
/// Default timeout for a single audio download (5 minutes).
pub const DEFAULT_MEDIA_TIMEOUT_SECS: u64 = 300;

/// Errors raised while validating loaded settings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Neither `VK_SERVICE_TOKEN` nor `VK_SERVICE_KEY` is set
    #[error("VK_SERVICE_TOKEN is missing")]
    MissingVkToken,
    /// `CACHE_EVICTION` holds an unknown value
    #[error("Unknown cache eviction policy: {0}")]
    UnknownEviction(String),
    /// A bounded eviction policy was configured with zero capacity
    #[error("Cache capacity must be greater than zero for the {0} policy")]
    ZeroCapacity(String),
}

/// Build the layered configuration source shared by all settings structs.
///
/// Sources, later ones overriding earlier ones: `config/default`,
/// `config/{RUN_MODE}`, `config/local`, `APP__*` variables and plain
/// environment variables (empty values are ignored).
///
/// # Errors
///
/// Returns a `ConfigError` if a present source cannot be parsed.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        // Environment::default() maps UPPER_SNAKE_CASE to snake_case keys
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

/// Catalog, cache and media settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MusicSettings {
    /// VK service access token
    pub vk_service_token: Option<String>,
    /// Legacy name of the VK service token
    pub vk_service_key: Option<String>,

    /// Base URL of the VK method endpoint
    #[serde(default = "default_vk_api_base_url")]
    pub vk_api_base_url: String,
    /// VK API protocol version sent with every request
    #[serde(default = "default_vk_api_version")]
    pub vk_api_version: String,
    /// Timeout for one catalog request, in seconds
    #[serde(default = "default_vk_http_timeout_secs")]
    pub vk_http_timeout_secs: u64,

    /// Lifetime of cached search results in seconds, `0` disables expiry
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Maximum number of cached search results
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Eviction rule: `fifo`, `lru` or `unbounded`
    #[serde(default = "default_cache_eviction")]
    pub cache_eviction: String,

    /// yt-dlp executable name or path
    #[serde(default = "default_ytdlp_binary")]
    pub ytdlp_binary: String,
    /// Directory for downloaded audio, defaults to a temp subdirectory
    pub downloads_dir: Option<PathBuf>,
    /// Timeout for one audio download, in seconds
    #[serde(default = "default_media_timeout_secs")]
    pub media_timeout_secs: u64,
}

fn default_vk_api_base_url() -> String {
    DEFAULT_VK_API_BASE_URL.to_string()
}

fn default_vk_api_version() -> String {
    DEFAULT_VK_API_VERSION.to_string()
}

const fn default_vk_http_timeout_secs() -> u64 {
    DEFAULT_VK_HTTP_TIMEOUT_SECS
}

const fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

const fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_cache_eviction() -> String {
    DEFAULT_CACHE_EVICTION.to_string()
}

fn default_ytdlp_binary() -> String {
    DEFAULT_YTDLP_BINARY.to_string()
}

const fn default_media_timeout_secs() -> u64 {
    DEFAULT_MEDIA_TIMEOUT_SECS
}

impl Default for MusicSettings {
    fn default() -> Self {
        Self {
            vk_service_token: None,
            vk_service_key: None,
            vk_api_base_url: default_vk_api_base_url(),
            vk_api_version: default_vk_api_version(),
            vk_http_timeout_secs: default_vk_http_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            cache_eviction: default_cache_eviction(),
            ytdlp_binary: default_ytdlp_binary(),
            downloads_dir: None,
            media_timeout_secs: default_media_timeout_secs(),
        }
    }
}

impl MusicSettings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use vkmusic_core::config::MusicSettings;
    ///
    /// let settings = MusicSettings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        build_config()?.try_deserialize()
    }

    /// Returns the VK token, preferring `VK_SERVICE_TOKEN` over `VK_SERVICE_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::MissingVkToken` if neither is set to a non-empty value.
    pub fn vk_token(&self) -> Result<&str, SettingsError> {
        [&self.vk_service_token, &self.vk_service_key]
            .into_iter()
            .flatten()
            .map(|token| token.trim())
            .find(|token| !token.is_empty())
            .ok_or(SettingsError::MissingVkToken)
    }

    /// Timeout applied to each catalog request.
    #[must_use]
    pub const fn vk_http_timeout(&self) -> Duration {
        Duration::from_secs(self.vk_http_timeout_secs)
    }

    /// Lifetime of cached results, `None` when expiry is disabled.
    #[must_use]
    pub const fn cache_ttl(&self) -> Option<Duration> {
        if self.cache_ttl_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.cache_ttl_secs))
        }
    }

    /// Parses the configured eviction rule.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown policy names or a zero capacity on a
    /// bounded policy.
    pub fn eviction_policy(&self) -> Result<EvictionPolicy, SettingsError> {
        let name = self.cache_eviction.trim().to_lowercase();
        let policy = match name.as_str() {
            "unbounded" | "none" => return Ok(EvictionPolicy::Unbounded),
            "fifo" => EvictionPolicy::Fifo {
                capacity: self.cache_capacity,
            },
            "lru" => EvictionPolicy::Lru {
                capacity: self.cache_capacity,
            },
            _ => return Err(SettingsError::UnknownEviction(self.cache_eviction.clone())),
        };
        if self.cache_capacity == 0 {
            return Err(SettingsError::ZeroCapacity(name));
        }
        Ok(policy)
    }

    /// Directory where downloaded audio is staged before sending.
    #[must_use]
    pub fn downloads_dir(&self) -> PathBuf {
        self.downloads_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("vkmusic-downloads"))
    }

    /// Timeout applied to each audio download.
    #[must_use]
    pub const fn media_timeout(&self) -> Duration {
        Duration::from_secs(self.media_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    // Single test so env mutations never race
    #[test]
    fn test_config_env_loading() -> Result<(), Box<dyn std::error::Error>> {
        env::set_var("VK_SERVICE_TOKEN", "vk-token");
        env::set_var("CACHE_TTL_SECS", "60");
        env::set_var("CACHE_EVICTION", "lru");

        let settings = MusicSettings::new()?;
        assert_eq!(settings.vk_token()?, "vk-token");
        assert_eq!(settings.cache_ttl(), Some(Duration::from_secs(60)));
        assert_eq!(
            settings.eviction_policy()?,
            EvictionPolicy::Lru {
                capacity: DEFAULT_CACHE_CAPACITY
            }
        );

        env::remove_var("VK_SERVICE_TOKEN");
        env::remove_var("CACHE_TTL_SECS");
        env::remove_var("CACHE_EVICTION");

        // Empty values are treated as unset, legacy key is picked up
        env::set_var("VK_SERVICE_TOKEN", "");
        env::set_var("VK_SERVICE_KEY", "legacy-key");

        let settings = MusicSettings::new()?;
        assert_eq!(settings.vk_service_token, None);
        assert_eq!(settings.vk_token()?, "legacy-key");
        assert_eq!(settings.vk_api_version, DEFAULT_VK_API_VERSION);

        env::remove_var("VK_SERVICE_TOKEN");
        env::remove_var("VK_SERVICE_KEY");
        Ok(())
    }

    #[test]
    fn test_missing_token() {
        let settings = MusicSettings {
            vk_service_token: Some("   ".to_string()),
            ..MusicSettings::default()
        };
        assert!(matches!(
            settings.vk_token(),
            Err(SettingsError::MissingVkToken)
        ));
    }

    #[test]
    fn test_zero_ttl_disables_expiry() {
        let settings = MusicSettings {
            cache_ttl_secs: 0,
            ..MusicSettings::default()
        };
        assert_eq!(settings.cache_ttl(), None);
    }

    #[test]
    fn test_eviction_policy_parsing() {
        let mut settings = MusicSettings::default();
        assert_eq!(
            settings.eviction_policy().ok(),
            Some(EvictionPolicy::Fifo {
                capacity: DEFAULT_CACHE_CAPACITY
            })
        );

        settings.cache_eviction = "Unbounded".to_string();
        settings.cache_capacity = 0;
        assert_eq!(settings.eviction_policy().ok(), Some(EvictionPolicy::Unbounded));

        settings.cache_eviction = "fifo".to_string();
        assert!(matches!(
            settings.eviction_policy(),
            Err(SettingsError::ZeroCapacity(_))
        ));

        settings.cache_eviction = "random".to_string();
        assert!(matches!(
            settings.eviction_policy(),
            Err(SettingsError::UnknownEviction(_))
        ));
    }
}
