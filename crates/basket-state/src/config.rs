//! # Cart Configuration
//!
//! Configuration for where the cart lives and how hard the writer tries.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BASKET_STORAGE_KEY=cartProducts                                    │
//! │     BASKET_MAX_WRITE_ATTEMPTS=5                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/basket/basket.toml (Linux)                               │
//! │     ~/Library/Application Support/dev.basket.basket/basket.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     "@GoMarketPlace:cartProducts", 3 attempts, fail on corruption      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # basket.toml
//! [storage]
//! namespace = "@GoMarketPlace"
//! key = "cartProducts"
//!
//! [persistence]
//! max_write_attempts = 3
//! initial_backoff_ms = 100
//! max_backoff_ms = 2000
//! on_corrupt_snapshot = "fail"  # fail | discard
//! ```

use std::path::PathBuf;
use std::time::Duration;

use basket_core::{snapshot, DEFAULT_CART_KEY, DEFAULT_NAMESPACE};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{StateError, StateResult};

// =============================================================================
// Corrupt Snapshot Policy
// =============================================================================

/// What bootstrap does when the stored snapshot cannot be decoded.
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  FAIL (Default)                    │  DISCARD                          │
/// │  ──────────────                    │  ───────                          │
/// │  • bootstrap returns Hydration     │  • corruption logged at error     │
/// │  • durable value left untouched    │  • cart starts empty              │
/// │  • caller decides what to do       │  • first mutation overwrites it   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptSnapshotPolicy {
    /// Propagate the decode failure to the bootstrap caller.
    #[default]
    Fail,

    /// Log the failure and start from an empty cart.
    Discard,
}

impl std::fmt::Display for CorruptSnapshotPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorruptSnapshotPolicy::Fail => write!(f, "fail"),
            CorruptSnapshotPolicy::Discard => write!(f, "discard"),
        }
    }
}

impl std::str::FromStr for CorruptSnapshotPolicy {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" | "error" => Ok(CorruptSnapshotPolicy::Fail),
            "discard" | "reset" => Ok(CorruptSnapshotPolicy::Discard),
            other => Err(StateError::InvalidConfig(format!(
                "Unknown corrupt snapshot policy: '{}'. Valid options: fail, discard",
                other
            ))),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Where the snapshot is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Key prefix shared by everything this app stores.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Key of the cart snapshot within the namespace.
    #[serde(default = "default_key")]
    pub key: String,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_key() -> String {
    DEFAULT_CART_KEY.to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            namespace: default_namespace(),
            key: default_key(),
        }
    }
}

// =============================================================================
// Persistence Settings
// =============================================================================

/// Snapshot writer behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceSettings {
    /// Attempts per snapshot before the writer gives up on it.
    #[serde(default = "default_max_write_attempts")]
    pub max_write_attempts: u32,

    /// Delay before the first retry (milliseconds). Doubles per attempt.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Upper bound for the retry delay (milliseconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Bootstrap behavior for undecodable snapshots.
    #[serde(default)]
    pub on_corrupt_snapshot: CorruptSnapshotPolicy,
}

fn default_max_write_attempts() -> u32 {
    3
}
fn default_initial_backoff() -> u64 {
    100
}
fn default_max_backoff() -> u64 {
    2000
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        PersistenceSettings {
            max_write_attempts: default_max_write_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            on_corrupt_snapshot: CorruptSnapshotPolicy::default(),
        }
    }
}

impl PersistenceSettings {
    /// Returns the initial retry delay.
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Returns the maximum retry delay.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

// =============================================================================
// Main Cart Configuration
// =============================================================================

/// Complete cart configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartConfig {
    /// Storage location.
    #[serde(default)]
    pub storage: StorageSettings,

    /// Writer settings.
    #[serde(default)]
    pub persistence: PersistenceSettings,
}

impl CartConfig {
    /// Creates a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (basket.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> StateResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading cart config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load cart config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a config from TOML text without touching the environment.
    pub fn from_toml_str(contents: &str) -> StateResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> StateResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| StateError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StateError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| StateError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Cart config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> StateResult<()> {
        if self.storage.namespace.trim().is_empty() {
            return Err(StateError::InvalidConfig(
                "storage.namespace must not be empty".into(),
            ));
        }

        if self.storage.key.trim().is_empty() {
            return Err(StateError::InvalidConfig(
                "storage.key must not be empty".into(),
            ));
        }

        if self.persistence.max_write_attempts == 0 {
            return Err(StateError::InvalidConfig(
                "max_write_attempts must be greater than 0".into(),
            ));
        }

        if self.persistence.max_backoff_ms < self.persistence.initial_backoff_ms {
            return Err(StateError::InvalidConfig(format!(
                "max_backoff_ms ({}) must not be below initial_backoff_ms ({})",
                self.persistence.max_backoff_ms, self.persistence.initial_backoff_ms
            )));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(namespace) = std::env::var("BASKET_STORAGE_NAMESPACE") {
            debug!(namespace = %namespace, "Overriding storage namespace from environment");
            self.storage.namespace = namespace;
        }

        if let Ok(key) = std::env::var("BASKET_STORAGE_KEY") {
            debug!(key = %key, "Overriding storage key from environment");
            self.storage.key = key;
        }

        if let Ok(attempts) = std::env::var("BASKET_MAX_WRITE_ATTEMPTS") {
            match attempts.parse::<u32>() {
                Ok(n) => self.persistence.max_write_attempts = n,
                Err(_) => warn!(value = %attempts, "Ignoring non-numeric BASKET_MAX_WRITE_ATTEMPTS"),
            }
        }

        if let Ok(backoff) = std::env::var("BASKET_INITIAL_BACKOFF_MS") {
            if let Ok(ms) = backoff.parse::<u64>() {
                self.persistence.initial_backoff_ms = ms;
            }
        }

        if let Ok(backoff) = std::env::var("BASKET_MAX_BACKOFF_MS") {
            if let Ok(ms) = backoff.parse::<u64>() {
                self.persistence.max_backoff_ms = ms;
            }
        }

        if let Ok(policy) = std::env::var("BASKET_ON_CORRUPT_SNAPSHOT") {
            match policy.parse() {
                Ok(parsed) => self.persistence.on_corrupt_snapshot = parsed,
                Err(_) => warn!(policy = %policy, "Unknown corrupt snapshot policy in environment"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "basket", "basket")
            .map(|dirs| dirs.config_dir().join("basket.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the full durable key of the cart snapshot.
    pub fn storage_key(&self) -> String {
        snapshot::storage_key(&self.storage.namespace, &self.storage.key)
    }

    /// Returns the corrupt snapshot policy.
    pub fn corrupt_snapshot_policy(&self) -> CorruptSnapshotPolicy {
        self.persistence.on_corrupt_snapshot
    }
}
