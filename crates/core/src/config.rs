//! Configuration types shared across crates.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default prefix under which the registry keeps its repositories.
pub const DEFAULT_REPOSITORY_ROOT: &str = "docker/registry/v2/repositories/";

/// HTTP server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Registry data kept by the filesystem storage driver.
    Filesystem {
        /// Root directory of the registry storage.
        path: PathBuf,
    },
    /// S3-compatible bucket (AWS, MinIO, Ceph RGW...).
    S3 {
        /// Bucket name.
        #[serde(default = "default_bucket")]
        bucket: String,
        /// Optional endpoint (for MinIO, etc.). Bare `host:port` is accepted.
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// Optional key prefix applied to every object key.
        prefix: Option<String>,
        /// Access key ID. Falls back to the ambient AWS credential chain if not set.
        access_key_id: Option<String>,
        /// Secret access key. Falls back to the ambient AWS credential chain if not set.
        secret_access_key: Option<String>,
        /// Force path-style URLs. Required for MinIO.
        #[serde(default)]
        force_path_style: bool,
        /// Scheme used for an endpoint given without one: https when true, http otherwise.
        #[serde(default = "default_secure")]
        secure: bool,
    },
}

fn default_bucket() -> String {
    "registry".to_string()
}

fn default_secure() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("/var/lib/registry"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            StorageConfig::S3 {
                bucket,
                access_key_id,
                secret_access_key,
                ..
            } => {
                if bucket.is_empty() {
                    return Err("s3 config requires a non-empty bucket".to_string());
                }
                match (access_key_id.as_ref(), secret_access_key.as_ref()) {
                    (Some(_), Some(_)) | (None, None) => Ok(()),
                    _ => Err(
                        "s3 config requires both access_key_id and secret_access_key when either is set"
                            .to_string(),
                    ),
                }
            }
            StorageConfig::Filesystem { .. } => Ok(()),
        }
    }
}

/// Upstream registry API used to invalidate deleted manifests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the registry (e.g., "https://registry.example.com").
    pub url: String,
    /// Login for basic auth. When unset, `token` is sent as a bearer token.
    pub username: Option<String>,
    /// Password or token.
    /// WARNING: Prefer RGC_REGISTRY__TOKEN over storing it in the config file.
    pub token: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_registry_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_registry_timeout_secs() -> u64 {
    30
}

impl RegistryConfig {
    /// Create a test configuration pointing at `url`.
    ///
    /// **For testing only.**
    pub fn for_testing(url: &str) -> Self {
        Self {
            url: url.to_string(),
            username: None,
            token: None,
            timeout_secs: 5,
        }
    }

    /// Get the request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Tag garbage collection configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GcConfig {
    /// Key prefix holding all repositories. Must end with `/`.
    #[serde(default = "default_repository_root")]
    pub repository_root: String,
    /// Seconds between scan attempts.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    /// Seconds between cleanup attempts.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Maximum concurrently running scan attempts.
    #[serde(default = "default_max_instances")]
    pub scan_max_instances: usize,
    /// Maximum concurrently running cleanup attempts.
    #[serde(default = "default_max_instances")]
    pub cleanup_max_instances: usize,
    /// When to re-seed the repository root. Accepts 6/7-field cron expressions
    /// (with seconds, weekdays 1-7 from Sunday) or classic 5-field crontab
    /// (weekdays 0-7, Sunday = 0 or 7). Evaluated in UTC.
    #[serde(default = "default_reseed_cron")]
    pub reseed_cron: String,
    /// Report stale digests without deleting them or calling the registry.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_repository_root() -> String {
    DEFAULT_REPOSITORY_ROOT.to_string()
}

fn default_scan_interval_secs() -> u64 {
    1
}

fn default_cleanup_interval_secs() -> u64 {
    5
}

fn default_max_instances() -> usize {
    10
}

fn default_reseed_cron() -> String {
    // Weekly, Sunday at midnight
    "0 0 0 * * Sun".to_string()
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            repository_root: default_repository_root(),
            scan_interval_secs: default_scan_interval_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            scan_max_instances: default_max_instances(),
            cleanup_max_instances: default_max_instances(),
            reseed_cron: default_reseed_cron(),
            dry_run: false,
        }
    }
}

impl GcConfig {
    /// Get the scan interval as a Duration.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    /// Get the cleanup interval as a Duration.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Parse the reseed schedule.
    ///
    /// A 5-field crontab expression gets a leading seconds field of `0`, and its
    /// numeric weekdays (0-7, Sunday = 0 or 7) are rewritten as day names.
    pub fn reseed_schedule(&self) -> Result<cron::Schedule> {
        let invalid = |reason: String| Error::InvalidCron {
            expression: self.reseed_cron.clone(),
            reason,
        };
        let fields: Vec<&str> = self.reseed_cron.split_whitespace().collect();
        let normalized = match fields.as_slice() {
            [minute, hour, day, month, weekday] => {
                let weekday = crontab_weekdays(weekday).map_err(invalid)?;
                format!("0 {minute} {hour} {day} {month} {weekday}")
            }
            _ => self.reseed_cron.trim().to_string(),
        };
        cron::Schedule::from_str(&normalized).map_err(|e| invalid(e.to_string()))
    }

    /// Validate GC configuration.
    pub fn validate(&self) -> Result<()> {
        if self.repository_root.is_empty() || !self.repository_root.ends_with('/') {
            return Err(Error::Config(format!(
                "gc.repository_root must be non-empty and end with '/', got {:?}",
                self.repository_root
            )));
        }
        if self.scan_interval_secs == 0 || self.cleanup_interval_secs == 0 {
            return Err(Error::Config(
                "gc.scan_interval_secs and gc.cleanup_interval_secs cannot be 0".to_string(),
            ));
        }
        if self.scan_max_instances == 0 || self.cleanup_max_instances == 0 {
            return Err(Error::Config(
                "gc.scan_max_instances and gc.cleanup_max_instances cannot be 0".to_string(),
            ));
        }
        self.reseed_schedule()?;
        Ok(())
    }
}

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Rewrite a crontab day-of-week field with day names.
///
/// The `cron` crate numbers weekdays 1-7 from Sunday, crontab 0-7 with Sunday at
/// both ends. Names mean the same to both, so numbers, ranges and steps are
/// expanded into name lists. Items that already use names pass through.
fn crontab_weekdays(field: &str) -> std::result::Result<String, String> {
    if field == "*" || field == "?" {
        return Ok(field.to_string());
    }

    let mut names: Vec<String> = Vec::new();
    for item in field.split(',') {
        if item.chars().any(|c| c.is_ascii_alphabetic()) {
            names.push(item.to_string());
            continue;
        }

        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step: usize = step
                    .parse()
                    .map_err(|_| format!("invalid weekday step in {item:?}"))?;
                if step == 0 {
                    return Err(format!("weekday step cannot be 0 in {item:?}"));
                }
                (range, step)
            }
            None => (item, 1),
        };
        let (start, end) = match range {
            "*" => (0, 6),
            _ => match range.split_once('-') {
                Some((start, end)) => (crontab_weekday(start)?, crontab_weekday(end)?),
                None if step > 1 => (crontab_weekday(range)?, 6),
                None => {
                    let day = crontab_weekday(range)?;
                    (day, day)
                }
            },
        };
        if start > end {
            return Err(format!("weekday range {item:?} runs backwards"));
        }

        for day in (start..=end).step_by(step) {
            let name = WEEKDAY_NAMES[day % 7];
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    Ok(names.join(","))
}

fn crontab_weekday(value: &str) -> std::result::Result<usize, String> {
    match value.parse::<usize>() {
        Ok(day) if day <= 7 => Ok(day),
        _ => Err(format!("weekday {value:?} is not in 0-7")),
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Registry API configuration (required).
    pub registry: RegistryConfig,
    /// Tag garbage collection configuration.
    #[serde(default)]
    pub gc: GcConfig,
}

impl AppConfig {
    /// Create a test configuration with filesystem storage rooted at `storage_path`.
    ///
    /// **For testing only.**
    pub fn for_testing(storage_path: impl Into<PathBuf>, registry_url: &str) -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::Filesystem {
                path: storage_path.into(),
            },
            registry: RegistryConfig::for_testing(registry_url),
            gc: GcConfig::default(),
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.storage.validate().map_err(Error::Config)?;
        if self.registry.url.trim().is_empty() {
            return Err(Error::Config("registry.url cannot be empty".to_string()));
        }
        self.gc.validate()
    }
}
