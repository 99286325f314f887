//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Public base URL used when building share and media links.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            base_url: default_base_url(),
        }
    }
}

/// Media storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for stored media.
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/media"),
        }
    }
}

/// Wish store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database (recommended for testing and small deployments).
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL.
        url: String,
        /// Maximum pool connections.
        #[serde(default = "default_pg_max_connections")]
        max_connections: u32,
        /// Optional statement timeout in milliseconds.
        statement_timeout_ms: Option<u64>,
    },
}

fn default_pg_max_connections() -> u32 {
    10
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/wisp.db"),
        }
    }
}

/// Reclamation sweep configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Minimum minutes a tombstoned wish stays in the database before the
    /// sweep may purge it.
    #[serde(default = "default_grace_period_minutes")]
    pub grace_period_minutes: u64,
    /// Minutes between scheduled sweep runs. 0 disables the scheduler
    /// entirely (manual sweeps via the admin endpoint still work).
    #[serde(default = "default_sweep_interval_minutes")]
    pub sweep_interval_minutes: u64,
    /// Candidates fetched per sweep batch.
    #[serde(default = "default_sweep_batch_size")]
    pub batch_size: u32,
    /// Upper bound on batches per sweep run.
    #[serde(default = "default_max_sweep_iterations")]
    pub max_sweep_iterations: u32,
}

fn default_grace_period_minutes() -> u64 {
    60
}

fn default_sweep_interval_minutes() -> u64 {
    15
}

fn default_sweep_batch_size() -> u32 {
    100
}

fn default_max_sweep_iterations() -> u32 {
    1000
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            grace_period_minutes: default_grace_period_minutes(),
            sweep_interval_minutes: default_sweep_interval_minutes(),
            batch_size: default_sweep_batch_size(),
            max_sweep_iterations: default_max_sweep_iterations(),
        }
    }
}

impl CleanupConfig {
    /// Get the grace period as a Duration.
    pub fn grace_period(&self) -> Duration {
        let mins = i64::try_from(self.grace_period_minutes).unwrap_or(i64::MAX);
        Duration::minutes(mins)
    }

    /// Get the sweep interval as a std Duration, or None when disabled.
    pub fn sweep_interval(&self) -> Option<std::time::Duration> {
        if self.sweep_interval_minutes == 0 {
            None
        } else {
            Some(std::time::Duration::from_secs(
                self.sweep_interval_minutes * 60,
            ))
        }
    }

    /// Validate sweep configuration invariants.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.batch_size == 0 {
            return Err("cleanup.batch_size must be at least 1".to_string());
        }
        if self.max_sweep_iterations == 0 {
            return Err("cleanup.max_sweep_iterations must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Per-IP creation rate limit configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether wish creation is rate limited at all.
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
    /// Wishes a single IP may create per UTC day.
    #[serde(default = "default_max_wishes_per_day")]
    pub max_wishes_per_day: u32,
    /// Seconds between eviction passes over expired windows.
    #[serde(default = "default_rate_limit_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Trust X-Forwarded-For from the connecting peer. Only enable behind a
    /// proxy you control; otherwise clients can spoof their way past the
    /// limit.
    #[serde(default)]
    pub trust_forwarded_headers: bool,
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_max_wishes_per_day() -> u32 {
    10
}

fn default_rate_limit_cleanup_interval_secs() -> u64 {
    3600
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            max_wishes_per_day: default_max_wishes_per_day(),
            cleanup_interval_secs: default_rate_limit_cleanup_interval_secs(),
            trust_forwarded_headers: false,
        }
    }
}

impl RateLimitConfig {
    /// Validate rate limit configuration invariants.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.enabled && self.max_wishes_per_day == 0 {
            return Err(
                "rate_limit.max_wishes_per_day must be at least 1 when enabled (set enabled = false to turn the limiter off)"
                    .to_string(),
            );
        }
        Ok(())
    }
}

/// Content and upload limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    #[serde(default = "default_max_title_chars")]
    pub max_title_chars: usize,
    #[serde(default = "default_max_theme_chars")]
    pub max_theme_chars: usize,
    /// Highest `max_views` a creator may request.
    #[serde(default = "default_max_views_cap")]
    pub max_views_cap: i64,
    #[serde(default = "default_max_images_per_wish")]
    pub max_images_per_wish: u32,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

fn default_max_message_chars() -> usize {
    5000
}

fn default_max_title_chars() -> usize {
    255
}

fn default_max_theme_chars() -> usize {
    50
}

fn default_max_views_cap() -> i64 {
    1000
}

fn default_max_images_per_wish() -> u32 {
    6
}

fn default_max_image_bytes() -> usize {
    5 * 1024 * 1024
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_chars: default_max_message_chars(),
            max_title_chars: default_max_title_chars(),
            max_theme_chars: default_max_theme_chars(),
            max_views_cap: default_max_views_cap(),
            max_images_per_wish: default_max_images_per_wish(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl AppConfig {
    /// Create a test configuration: rate limiting off, scheduler off.
    ///
    /// **For testing only.** Storage and database paths still need to be
    /// pointed at a temp directory by the caller.
    pub fn for_testing() -> Self {
        Self {
            cleanup: CleanupConfig {
                sweep_interval_minutes: 0,
                ..Default::default()
            },
            rate_limit: RateLimitConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
