//! Configuration for the session store.
//!
//! Loadable from TOML with the option names the store has always used:
//!
//! ```toml
//! baseUrl = "http://localhost:6000"
//! pruneSessionInterval = 60   # or false to disable pruning
//! ttl = 3600
//!
//! [headers]
//! Authorization = "Bearer ..."
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use postgrest_client::{DEFAULT_BASE_URL, PostgrestClient};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Table holding session rows.
pub const DEFAULT_TABLE: &str = "sessions";

/// Default time between prune passes.
pub const DEFAULT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How often expired rows are pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneInterval {
    /// Never prune automatically.
    Disabled,
    /// Prune at startup, then after each pass with this delay.
    Every(Duration),
}

impl PruneInterval {
    /// The delay between passes, if pruning is enabled.
    pub fn period(&self) -> Option<Duration> {
        match self {
            PruneInterval::Disabled => None,
            PruneInterval::Every(period) => Some(*period),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, PruneInterval::Every(_))
    }
}

impl Default for PruneInterval {
    fn default() -> Self {
        PruneInterval::Every(DEFAULT_PRUNE_INTERVAL)
    }
}

/// Accepts `false`, `true` (the default interval) or a number of seconds.
/// Zero seconds also means the default interval.
impl<'de> Deserialize<'de> for PruneInterval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Seconds(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => PruneInterval::Disabled,
            Raw::Flag(true) | Raw::Seconds(0) => PruneInterval::default(),
            Raw::Seconds(secs) => PruneInterval::Every(Duration::from_secs(secs)),
        })
    }
}

impl Serialize for PruneInterval {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            PruneInterval::Disabled => serializer.serialize_bool(false),
            PruneInterval::Every(period) => serializer.serialize_u64(period.as_secs()),
        }
    }
}

/// Configuration for [`crate::PostgrestSessionStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Endpoint root.
    #[serde(alias = "base_url")]
    pub base_url: String,

    /// Pruning schedule.
    #[serde(alias = "prune_session_interval")]
    pub prune_session_interval: PruneInterval,

    /// Fixed session lifetime in seconds, overriding per-call max-age.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,

    /// Table holding session rows.
    pub table: String,

    /// HTTP request timeout in seconds.
    #[serde(alias = "timeout_secs")]
    pub timeout_secs: u64,

    /// Extra headers sent with every request (e.g. `Authorization`).
    pub headers: BTreeMap<String, String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            prune_session_interval: PruneInterval::default(),
            ttl: None,
            table: DEFAULT_TABLE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            headers: BTreeMap::new(),
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))
    }

    /// Load a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Set the endpoint root.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Add a header sent with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Prune at startup and then every `interval`.
    pub fn with_prune_interval(mut self, interval: Duration) -> Self {
        self.prune_session_interval = PruneInterval::Every(interval);
        self
    }

    /// Disable automatic pruning.
    pub fn without_pruning(mut self) -> Self {
        self.prune_session_interval = PruneInterval::Disabled;
        self
    }

    /// Set a fixed session lifetime, rounded up to whole seconds.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
        self.ttl = Some(secs);
        self
    }

    /// Use a different table name.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Set the HTTP request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// The fixed lifetime, if any. A zero ttl counts as unset.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl.filter(|secs| *secs > 0).map(Duration::from_secs)
    }

    /// Build the HTTP client described by this configuration.
    pub fn build_client(&self) -> Result<PostgrestClient> {
        if self.table.trim().is_empty() {
            return Err(Error::Config("table name must not be empty".to_string()));
        }

        Ok(PostgrestClient::builder()
            .base_url(&self.base_url)
            .headers(self.headers.clone())
            .timeout(Duration::from_secs(self.timeout_secs.max(1)))
            .build()?)
    }
}
