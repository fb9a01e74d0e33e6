//! Runtime settings
//!
//! Tunables for the catalog client, retry policy and sync phases. Settings
//! come from an optional YAML file; every field has a default so an empty
//! (or absent) file yields a working configuration. Credentials never live
//! here, they are read from the environment by the CLI.
//!
//! ```yaml
//! catalog:
//!   base_url: https://shop.example.com
//!   requests_per_second: 5
//! retry:
//!   max_rate_limit_retries: 20
//! sync:
//!   page_size: 100
//!   product_create: { workers: 1, batch_size: 10 }
//! ```

use crate::engine::{SyncConfig, WorkerPlan};
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Largest page size the catalog API accepts
pub const MAX_PAGE_SIZE: u32 = 100;

// ============================================================================
// Top-Level Settings
// ============================================================================

/// Complete settings document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Remote catalog connection
    pub catalog: CatalogSettings,
    /// Backoff and pacing
    pub retry: RetrySettings,
    /// Sync phase sizing
    pub sync: SyncSettings,
}

impl Settings {
    /// Load and validate settings from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::config(format!(
                    "Failed to read settings file '{}': {e}",
                    path.display()
                ))
            }
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate settings from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.catalog.timeout_secs == 0 {
            return Err(Error::invalid_value(
                "catalog.timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.catalog.burst == 0 && self.catalog.requests_per_second > 0 {
            return Err(Error::invalid_value(
                "catalog.burst",
                "must be greater than 0 when rate limiting is on",
            ));
        }
        if let Some(url) = &self.catalog.base_url {
            url::Url::parse(url)
                .map_err(|e| Error::invalid_value("catalog.base_url", e.to_string()))?;
        }
        if self.retry.rate_limit_jitter_factor == 0 {
            return Err(Error::invalid_value(
                "retry.rate_limit_jitter_factor",
                "must be at least 1",
            ));
        }
        if self.retry.max_backoff_ms < self.retry.base_delay_ms {
            return Err(Error::invalid_value(
                "retry.max_backoff_ms",
                "must not be below base_delay_ms",
            ));
        }

        let page_size = self.sync.page_size;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(Error::invalid_value(
                "sync.page_size",
                format!("must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"),
            ));
        }
        if self.sync.read_workers == 0 {
            return Err(Error::invalid_value(
                "sync.read_workers",
                "must be greater than 0",
            ));
        }
        let plans = [
            ("sync.delete", self.sync.delete),
            ("sync.category_create", self.sync.category_create),
            ("sync.product_create", self.sync.product_create),
        ];
        for (field, plan) in plans {
            if plan.workers == 0 || plan.batch_size == 0 {
                return Err(Error::invalid_value(
                    field,
                    "workers and batch_size must be greater than 0",
                ));
            }
        }
        Ok(())
    }

    /// HTTP client configuration; `base_url` overrides the configured one
    pub fn http_config(&self, base_url: Option<&str>) -> HttpClientConfig {
        let catalog = &self.catalog;
        let mut builder = HttpClientConfig::builder()
            .timeout(Duration::from_secs(catalog.timeout_secs))
            .user_agent(catalog.user_agent.clone());

        if let Some(url) = base_url.or(catalog.base_url.as_deref()) {
            builder = builder.base_url(url);
        }
        builder = if catalog.requests_per_second == 0 {
            builder.no_rate_limit()
        } else {
            builder.rate_limit(RateLimiterConfig::new(
                catalog.requests_per_second,
                catalog.burst,
            ))
        };
        builder.build()
    }

    /// Retry policy
    pub fn retry_policy(&self) -> RetryPolicy {
        let retry = &self.retry;
        RetryPolicy {
            base_delay: Duration::from_millis(retry.base_delay_ms),
            jitter: Duration::from_millis(retry.jitter_ms),
            rate_limit_jitter_factor: retry.rate_limit_jitter_factor,
            max_backoff: Duration::from_millis(retry.max_backoff_ms),
            network_retry_delay: Duration::from_millis(retry.network_retry_delay_ms),
            max_network_attempts: retry.max_network_attempts,
            max_rate_limit_retries: retry.max_rate_limit_retries,
            pace_between_requests: retry.pace_between_requests,
        }
    }

    /// Sync engine configuration
    pub fn sync_config(&self, dry_run: bool) -> SyncConfig {
        let sync = &self.sync;
        SyncConfig {
            page_size: sync.page_size,
            read_workers: sync.read_workers,
            delete: sync.delete,
            category_create: sync.category_create,
            product_create: sync.product_create,
            dry_run,
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Remote catalog connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogSettings {
    /// Store URL; the `APP_URL` environment variable takes precedence
    pub base_url: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// User agent sent with every request
    pub user_agent: String,
    /// Client-side request budget; 0 disables client-side limiting
    pub requests_per_second: u32,
    /// Token bucket size
    pub burst: u32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        let http = HttpClientConfig::default();
        Self {
            base_url: None,
            timeout_secs: http.timeout.as_secs(),
            user_agent: http.user_agent,
            requests_per_second: 5,
            burst: 10,
        }
    }
}

/// Backoff settings, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    /// Fixed part of every delay
    pub base_delay_ms: u64,
    /// Random part of every delay
    pub jitter_ms: u64,
    /// Jitter multiplier while rate limited
    pub rate_limit_jitter_factor: u32,
    /// Cap on the doubling base while rate limited
    pub max_backoff_ms: u64,
    /// Wait after a network error
    pub network_retry_delay_ms: u64,
    /// `null` retries network errors forever
    pub max_network_attempts: Option<u32>,
    /// `null` retries 429/504 forever
    pub max_rate_limit_retries: Option<u32>,
    /// Pause between sequential requests
    pub pace_between_requests: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            base_delay_ms: millis(policy.base_delay),
            jitter_ms: millis(policy.jitter),
            rate_limit_jitter_factor: policy.rate_limit_jitter_factor,
            max_backoff_ms: millis(policy.max_backoff),
            network_retry_delay_ms: millis(policy.network_retry_delay),
            max_network_attempts: policy.max_network_attempts,
            max_rate_limit_retries: policy.max_rate_limit_retries,
            pace_between_requests: policy.pace_between_requests,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Page size and worker plans per phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSettings {
    /// Items per listing page
    pub page_size: u32,
    /// Concurrent page readers
    pub read_workers: usize,
    /// Batch delete plan
    pub delete: WorkerPlan,
    /// Batch create plan for categories
    pub category_create: WorkerPlan,
    /// Batch create plan for products
    pub product_create: WorkerPlan,
}

impl Default for SyncSettings {
    fn default() -> Self {
        let config = SyncConfig::default();
        Self {
            page_size: config.page_size,
            read_workers: config.read_workers,
            delete: config.delete,
            category_create: config.category_create,
            product_create: config.product_create,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_document_gives_defaults() {
        let settings = Settings::from_yaml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.retry_policy(), RetryPolicy::default());
        assert_eq!(settings.sync_config(false), SyncConfig::default());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let settings = Settings::from_yaml(
            r"
catalog:
  base_url: https://shop.example.com
  requests_per_second: 0
retry:
  max_rate_limit_retries: 20
sync:
  page_size: 50
  product_create: { workers: 2, batch_size: 5 }
",
        )
        .unwrap();

        assert_eq!(settings.retry.max_rate_limit_retries, Some(20));
        assert_eq!(settings.retry.base_delay_ms, 1000);
        assert_eq!(settings.sync.read_workers, 10);

        let sync = settings.sync_config(true);
        assert_eq!(sync.page_size, 50);
        assert_eq!(sync.product_create, WorkerPlan::new(2, 5));
        assert!(sync.dry_run);

        let http = settings.http_config(None);
        assert_eq!(http.base_url.as_deref(), Some("https://shop.example.com"));
        assert!(http.rate_limit.is_none());
    }

    #[test]
    fn test_base_url_override() {
        let settings = Settings::default();
        let http = settings.http_config(Some("https://other.example.com"));
        assert_eq!(http.base_url.as_deref(), Some("https://other.example.com"));
        assert_eq!(http.rate_limit, Some(RateLimiterConfig::new(5, 10)));
    }

    #[test]
    fn test_invalid_page_size() {
        let err = Settings::from_yaml("sync:\n  page_size: 500\n").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfigValue { ref field, .. } if field == "sync.page_size"
        ));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = Settings::from_yaml("sync:\n  delete: { workers: 0, batch_size: 40 }\n")
            .unwrap_err();
        assert!(err.to_string().contains("sync.delete"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Settings::from_yaml("catalog:\n  base: x\n").unwrap_err();
        assert!(matches!(err, Error::YamlParse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "retry:\n  pace_between_requests: false").unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert!(!settings.retry_policy().pace_between_requests);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load("/nonexistent/settings.yaml").unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
