//! Scanner configuration, loaded from a RON file.
//!
//! ```ron
//! (
//!     base_url: "https://docs.example.com/docs",
//!     link_prefix: "/docs",
//!     store: File(path: "state/hashes.ron"),
//!     notifier: Http(endpoint: "https://jobs.example.com/reindex"),
//!     retry: (attempts: 3, backoff_ms: 250),
//! )
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use docwatch_core::{StoreErrorPolicy, DEFAULT_CONTAINER_CLASS};
use docwatch_logging::watch_warn;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::fetch::FetchSettings;
use crate::retry::RetryPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Listing page; discovered links are resolved against it.
    pub base_url: String,
    /// Path prefix an anchor must start with to be checked.
    pub link_prefix: String,
    /// Class of the layout wrapper holding the page body.
    pub container_class: String,
    pub store: StoreConfig,
    pub notifier: NotifierConfig,
    pub fetch: FetchConfig,
    pub retry: RetryConfig,
    pub store_error_policy: StoreErrorPolicy,
    /// Store the new fingerprint after a successful dispatch. Ignored when the
    /// notifier is `DryRun`.
    pub write_back: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://fragment.dev/docs".to_string(),
            link_prefix: "/docs".to_string(),
            container_class: DEFAULT_CONTAINER_CLASS.to_string(),
            store: StoreConfig::default(),
            notifier: NotifierConfig::default(),
            fetch: FetchConfig::default(),
            retry: RetryConfig::default(),
            store_error_policy: StoreErrorPolicy::default(),
            write_back: true,
        }
    }
}

impl WatchConfig {
    pub fn from_ron(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        ron::from_str(text).map_err(|err| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: err.to_string(),
        })
    }

    pub fn listing_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url)
            .map_err(|err| ConfigError::Invalid(format!("base_url {:?}: {err}", self.base_url)))
    }

    /// Whether the scanner should store fingerprints. A dry-run notifier
    /// sends nothing, so storing would hide those changes from later runs.
    pub fn write_back_enabled(&self) -> bool {
        self.write_back && self.notifier != NotifierConfig::DryRun
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let listing = self.listing_url()?;
        if !matches!(listing.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "base_url must be http(s), got {}",
                listing.scheme()
            )));
        }
        if !self.link_prefix.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "link_prefix must start with '/', got {:?}",
                self.link_prefix
            )));
        }
        if self.container_class.trim().is_empty() {
            return Err(ConfigError::Invalid("container_class is empty".into()));
        }
        if self.retry.attempts == 0 {
            return Err(ConfigError::Invalid("retry.attempts must be at least 1".into()));
        }
        if let NotifierConfig::Http { endpoint, .. } = &self.notifier {
            Url::parse(endpoint).map_err(|err| {
                ConfigError::Invalid(format!("notifier endpoint {endpoint:?}: {err}"))
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreConfig {
    Memory,
    File { path: PathBuf },
    Dynamo { table: String },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            path: PathBuf::from("docwatch-hashes.ron"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NotifierConfig {
    #[default]
    DryRun,
    Http {
        endpoint: String,
        #[serde(default = "default_job_timeout_secs")]
        timeout_secs: u64,
    },
    Lambda {
        function: String,
    },
}

fn default_job_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let defaults = FetchSettings::default();
        Self {
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            request_timeout_secs: defaults.request_timeout.as_secs(),
            redirect_limit: defaults.redirect_limit,
            max_bytes: defaults.max_bytes,
            user_agent: None,
        }
    }
}

impl FetchConfig {
    pub fn to_settings(&self) -> FetchSettings {
        let defaults = FetchSettings::default();
        let user_agent = self
            .user_agent
            .clone()
            .unwrap_or_else(|| defaults.user_agent.clone());
        FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            redirect_limit: self.redirect_limit,
            max_bytes: self.max_bytes,
            user_agent,
            ..defaults
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let defaults = RetryPolicy::default();
        Self {
            attempts: defaults.attempts,
            backoff_ms: defaults.backoff.as_millis() as u64,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.attempts,
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

/// Load configuration from a RON file.
///
/// A missing file falls back to defaults; an unreadable or malformed one is
/// an error.
pub fn load_config(path: &Path) -> Result<WatchConfig, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            watch_warn!("Config file {:?} not found; using defaults", path);
            return Ok(WatchConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let config = WatchConfig::from_ron(&text, path)?;
    config.validate()?;
    Ok(config)
}
