//! Configuration for sitemap generation.
//!
//! A [`SitemapConfig`] carries the public base URL and the numeric bounds the
//! generator works within. Configuration can be built in code, read from TOML,
//! and overridden from the environment:
//!
//! ```toml
//! base_url = "https://qbuyse.com"
//! max_urls_per_sitemap = 50000
//! cache_expiry_minutes = 60
//! generation_timeout_secs = 30
//! ```
//!
//! | variable                       | field                     |
//! |--------------------------------|---------------------------|
//! | `QBUYSE_SITEMAP_BASE_URL`      | `base_url`                |
//! | `QBUYSE_SITEMAP_MAX_URLS`      | `max_urls_per_sitemap`    |
//! | `QBUYSE_SITEMAP_CACHE_MINUTES` | `cache_expiry_minutes`    |
//! | `QBUYSE_SITEMAP_TIMEOUT_SECS`  | `generation_timeout_secs` |
//!
//! The running configuration lives in a [`ConfigService`] shared through an
//! `Arc` by every generator in the process:
//!
//! ```rust
//! use qbuyse_sitemap::{ConfigService, SitemapConfig, SitemapConfigUpdate};
//!
//! let service = ConfigService::new(SitemapConfig::default());
//! service.update_config(SitemapConfigUpdate {
//!     base_url: Some("https://x.com/".to_string()),
//!     ..SitemapConfigUpdate::default()
//! })?;
//!
//! assert_eq!(service.config().base_url, "https://x.com");
//! # Ok::<(), qbuyse_sitemap::Error>(())
//! ```

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::url::is_valid_url;
use crate::{Error, Result};

/// Production base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://qbuyse.com";

/// Protocol limit on URLs per sitemap file.
pub const DEFAULT_MAX_URLS_PER_SITEMAP: u32 = 50_000;

const DEFAULT_CACHE_EXPIRY_MINUTES: u64 = 60;
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 30;

const ENV_BASE_URL: &str = "QBUYSE_SITEMAP_BASE_URL";
const ENV_MAX_URLS: &str = "QBUYSE_SITEMAP_MAX_URLS";
const ENV_CACHE_MINUTES: &str = "QBUYSE_SITEMAP_CACHE_MINUTES";
const ENV_TIMEOUT_SECS: &str = "QBUYSE_SITEMAP_TIMEOUT_SECS";

/// Settings the generator reads on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitemapConfig {
    /// Absolute site URL without a trailing slash.
    pub base_url: String,

    /// Maximum number of `<url>` entries per sitemap file.
    pub max_urls_per_sitemap: u32,

    /// How long a generated document stays cached.
    pub cache_expiry_minutes: u64,

    /// Deadline for each data-source fetch during generation.
    pub generation_timeout_secs: u64,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_urls_per_sitemap: DEFAULT_MAX_URLS_PER_SITEMAP,
            cache_expiry_minutes: DEFAULT_CACHE_EXPIRY_MINUTES,
            generation_timeout_secs: DEFAULT_GENERATION_TIMEOUT_SECS,
        }
    }
}

/// Partial update merged into the running configuration.
///
/// `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SitemapConfigUpdate {
    /// New base URL (trailing slashes are stripped).
    pub base_url: Option<String>,
    /// New per-file URL cap.
    pub max_urls_per_sitemap: Option<u32>,
    /// New cache lifetime.
    pub cache_expiry_minutes: Option<u64>,
    /// New fetch deadline.
    pub generation_timeout_secs: Option<u64>,
}

/// Outcome of [`SitemapConfig::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigValidation {
    /// One message per violated rule; empty when valid.
    pub errors: Vec<String>,
}

impl ConfigValidation {
    /// Whether no rule was violated.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert into a result, joining all messages into one configuration error.
    pub fn into_result(self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::Configuration(self.errors.join("; ")))
        }
    }
}

impl SitemapConfig {
    /// Build a configuration with a normalized base URL and default timeout.
    pub fn new(base_url: &str, max_urls_per_sitemap: u32, cache_expiry_minutes: u64) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            max_urls_per_sitemap,
            cache_expiry_minutes,
            ..Self::default()
        }
    }

    /// Check every rule and collect all violations.
    pub fn validate(&self) -> ConfigValidation {
        let mut errors = Vec::new();

        if self.base_url.trim().is_empty() {
            errors.push("baseUrl is required".to_string());
        } else if !is_valid_url(&self.base_url) {
            errors.push(format!(
                "baseUrl must be an absolute http(s) URL, got '{}'",
                self.base_url
            ));
        }

        if self.max_urls_per_sitemap == 0 {
            errors.push("maxUrlsPerSitemap must be greater than 0".to_string());
        }

        if self.cache_expiry_minutes == 0 {
            errors.push("cacheExpiryMinutes must be greater than 0".to_string());
        }

        if self.generation_timeout_secs == 0 {
            errors.push("generationTimeoutSecs must be greater than 0".to_string());
        }

        ConfigValidation { errors }
    }

    /// Merge the `Some` fields of `update` and re-normalize the base URL.
    ///
    /// Does not validate; callers decide what to do with an invalid result.
    pub fn apply(&mut self, update: SitemapConfigUpdate) {
        if let Some(base_url) = update.base_url {
            self.base_url = base_url;
        }
        if let Some(max_urls) = update.max_urls_per_sitemap {
            self.max_urls_per_sitemap = max_urls;
        }
        if let Some(minutes) = update.cache_expiry_minutes {
            self.cache_expiry_minutes = minutes;
        }
        if let Some(secs) = update.generation_timeout_secs {
            self.generation_timeout_secs = secs;
        }
        self.base_url = normalize_base_url(&self.base_url);
    }

    /// Cache lifetime as a [`Duration`].
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_expiry_minutes.saturating_mul(60))
    }

    /// Fetch deadline as a [`Duration`].
    pub const fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    /// Parse a TOML document; missing fields take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.base_url = normalize_base_url(&config.base_url);
        Ok(config)
    }

    /// Read configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), base_url = %config.base_url, "Loaded sitemap config");
        Ok(config)
    }

    /// Defaults overlaid with `QBUYSE_SITEMAP_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides(std::env::vars())?;
        Ok(config)
    }

    /// Overlay values from `(name, value)` pairs such as [`std::env::vars`].
    ///
    /// Unrelated variables are ignored; a numeric variable that does not parse
    /// is a configuration error.
    pub fn apply_env_overrides<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut update = SitemapConfigUpdate::default();
        for (key, value) in vars {
            let value = value.as_ref().trim();
            match key.as_ref() {
                ENV_BASE_URL => update.base_url = Some(value.to_string()),
                ENV_MAX_URLS => {
                    update.max_urls_per_sitemap = Some(parse_env(ENV_MAX_URLS, value)?);
                },
                ENV_CACHE_MINUTES => {
                    update.cache_expiry_minutes = Some(parse_env(ENV_CACHE_MINUTES, value)?);
                },
                ENV_TIMEOUT_SECS => {
                    update.generation_timeout_secs = Some(parse_env(ENV_TIMEOUT_SECS, value)?);
                },
                _ => {},
            }
        }
        self.apply(update);
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        Error::Configuration(format!("{name} must be a positive integer, got '{value}'"))
    })
}

fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Process-wide holder of the running configuration.
///
/// Reads return snapshots; updates are last-write-wins and never leave an
/// invalid configuration in place. Every committed update bumps a revision
/// number that caches use to detect stale documents.
#[derive(Debug, Default)]
pub struct ConfigService {
    current: RwLock<SitemapConfig>,
    revision: AtomicU64,
}

impl ConfigService {
    /// Wrap an initial configuration (normalized, not yet validated).
    pub fn new(mut config: SitemapConfig) -> Self {
        config.base_url = normalize_base_url(&config.base_url);
        Self {
            current: RwLock::new(config),
            revision: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> SitemapConfig {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of the current configuration together with its revision.
    pub fn snapshot(&self) -> (SitemapConfig, u64) {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        (guard.clone(), self.revision.load(Ordering::Acquire))
    }

    /// Number of committed updates so far.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Validate the current configuration.
    pub fn validate_config(&self) -> ConfigValidation {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .validate()
    }

    /// Merge `update`, validate, and commit only if valid.
    ///
    /// Returns the committed configuration.
    pub fn update_config(&self, update: SitemapConfigUpdate) -> Result<SitemapConfig> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);

        let mut candidate = guard.clone();
        candidate.apply(update);

        if let Err(err) = candidate.validate().into_result() {
            warn!(error = %err, "Rejected sitemap config update");
            return Err(err);
        }

        info!(
            base_url = %candidate.base_url,
            max_urls = candidate.max_urls_per_sitemap,
            cache_minutes = candidate.cache_expiry_minutes,
            "Sitemap config updated"
        );
        (*guard).clone_from(&candidate);
        self.revision.fetch_add(1, Ordering::AcqRel);
        Ok(candidate)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_with(base_url: &str, max_urls: u32, minutes: u64) -> SitemapConfig {
        SitemapConfig {
            base_url: base_url.to_string(),
            max_urls_per_sitemap: max_urls,
            cache_expiry_minutes: minutes,
            ..SitemapConfig::default()
        }
    }

    #[test]
    fn test_default_is_valid() {
        let config = SitemapConfig::default();
        assert_eq!(config.base_url, "https://qbuyse.com");
        assert_eq!(config.max_urls_per_sitemap, 50_000);
        assert_eq!(config.cache_expiry_minutes, 60);
        assert!(config.validate().is_valid());
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let invalid = [
            config_with("", 50_000, 60),
            config_with("   ", 50_000, 60),
            config_with("not a url", 50_000, 60),
            config_with("qbuyse.com", 50_000, 60),
            config_with("https://qbuyse.com", 0, 60),
            config_with("https://qbuyse.com", 50_000, 0),
            SitemapConfig {
                generation_timeout_secs: 0,
                ..SitemapConfig::default()
            },
        ];

        for config in invalid {
            let validation = config.validate();
            assert!(!validation.is_valid(), "Expected {config:?} to be invalid");
            assert!(!validation.errors.is_empty());
            assert!(validation.into_result().is_err());
        }
    }

    #[test]
    fn test_every_violation_is_reported() {
        let validation = config_with("", 0, 0).validate();
        assert_eq!(validation.errors.len(), 3);

        let err = validation.into_result().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("baseUrl"));
        assert!(err.to_string().contains("maxUrlsPerSitemap"));
    }

    #[test]
    fn test_new_strips_trailing_slashes() {
        let config = SitemapConfig::new("https://qbuyse.com///", 10, 5);
        assert_eq!(config.base_url, "https://qbuyse.com");
        assert_eq!(config.generation_timeout_secs, 30);
    }

    #[test]
    fn test_update_strips_trailing_slash() {
        let service = ConfigService::new(SitemapConfig::default());
        service
            .update_config(SitemapConfigUpdate {
                base_url: Some("https://x.com/".to_string()),
                ..SitemapConfigUpdate::default()
            })
            .unwrap();

        assert_eq!(service.config().base_url, "https://x.com");
        assert_eq!(service.config().max_urls_per_sitemap, 50_000);
        assert_eq!(service.revision(), 1);
    }

    #[test]
    fn test_invalid_update_keeps_previous_config() {
        let service = ConfigService::new(SitemapConfig::default());

        let err = service
            .update_config(SitemapConfigUpdate {
                base_url: Some("https://x.com".to_string()),
                max_urls_per_sitemap: Some(0),
                ..SitemapConfigUpdate::default()
            })
            .unwrap_err();

        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(service.config(), SitemapConfig::default());
        assert_eq!(service.revision(), 0);
    }

    #[test]
    fn test_config_returns_snapshot() {
        let service = ConfigService::new(SitemapConfig::default());
        let mut snapshot = service.config();
        snapshot.base_url = "https://mutated.example".to_string();

        assert_eq!(service.config().base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_from_toml_uses_defaults_for_missing_fields() {
        let config = SitemapConfig::from_toml_str(
            r#"
            base_url = "https://staging.qbuyse.com/"
            max_urls_per_sitemap = 1000
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://staging.qbuyse.com");
        assert_eq!(config.max_urls_per_sitemap, 1000);
        assert_eq!(config.cache_expiry_minutes, 60);
    }

    #[test]
    fn test_from_toml_rejects_negative_numbers() {
        let err = SitemapConfig::from_toml_str("max_urls_per_sitemap = -1").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "cache_expiry_minutes = 15").unwrap();

        let config = SitemapConfig::load(file.path()).unwrap();
        assert_eq!(config.cache_expiry_minutes, 15);
        assert_eq!(config.cache_ttl(), Duration::from_secs(900));
    }

    #[test]
    fn test_load_missing_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SitemapConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SitemapConfig::default();
        config
            .apply_env_overrides([
                ("QBUYSE_SITEMAP_BASE_URL", "https://env.qbuyse.com/"),
                ("QBUYSE_SITEMAP_MAX_URLS", "200"),
                ("QBUYSE_SITEMAP_TIMEOUT_SECS", " 5 "),
                ("PATH", "/usr/bin"),
            ])
            .unwrap();

        assert_eq!(config.base_url, "https://env.qbuyse.com");
        assert_eq!(config.max_urls_per_sitemap, 200);
        assert_eq!(config.cache_expiry_minutes, 60);
        assert_eq!(config.generation_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = SitemapConfig::default();
        let err = config
            .apply_env_overrides([("QBUYSE_SITEMAP_CACHE_MINUTES", "soon")])
            .unwrap_err();

        assert!(err.to_string().contains("QBUYSE_SITEMAP_CACHE_MINUTES"));
        assert_eq!(config, SitemapConfig::default());
    }
}
