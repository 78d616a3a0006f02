//! # State Error Types
//!
//! Error types for the cart state container.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       State Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Wiring (fatal) │  │ Startup (fatal) │  │  Runtime (reported)     │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Configuration  │  │  Hydration      │  │  Persistence            │ │
//! │  │                 │  │  Store          │  │  Validation             │ │
//! │  │                 │  │  InvalidConfig  │  │  ChannelClosed          │ │
//! │  │                 │  │  ConfigLoad     │  │  ConfigSave             │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Persistence failures never roll back the in-memory cart.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use basket_core::{CoreError, ValidationError};
use basket_db::DbError;
use thiserror::Error;

/// Result type alias for state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Cart state error type.
#[derive(Debug, Error)]
pub enum StateError {
    // =========================================================================
    // Wiring Errors
    // =========================================================================
    /// The cart was accessed without an active provider.
    ///
    /// This is a programmer error: some consumer was built without the
    /// `CartContext` handed out by the `CartProvider`.
    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Startup Errors
    // =========================================================================
    /// The durable snapshot exists but is corrupt.
    #[error("Failed to hydrate cart from '{key}': {source}")]
    Hydration {
        key: String,
        #[source]
        source: CoreError,
    },

    /// The key-value store could not be read.
    #[error("Store error: {0}")]
    Store(#[from] DbError),

    /// Invalid configuration values.
    #[error("Invalid cart configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load the config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to write the config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Runtime Errors
    // =========================================================================
    /// A snapshot could not be written to the store.
    #[error("Failed to persist cart version {version}: {reason}")]
    Persistence { version: u64, reason: String },

    /// An add-to-cart descriptor was rejected.
    #[error("Invalid item: {0}")]
    Validation(#[from] ValidationError),

    /// The snapshot writer is no longer running.
    #[error("Channel error: {0}")]
    ChannelClosed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for StateError {
    fn from(err: std::io::Error) -> Self {
        StateError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for StateError {
    fn from(err: toml::de::Error) -> Self {
        StateError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for StateError {
    fn from(err: toml::ser::Error) -> Self {
        StateError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl StateError {
    /// Creates the error raised when the cart is used outside a provider.
    pub fn outside_provider() -> Self {
        StateError::Configuration("use_cart must be used within a CartProvider".to_string())
    }

    /// Returns true if the caller cannot continue (wiring bug or corrupt
    /// durable state).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StateError::Configuration(_)
                | StateError::Hydration { .. }
                | StateError::Store(_)
                | StateError::InvalidConfig(_)
                | StateError::ConfigLoadFailed(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            StateError::Configuration(_)
                | StateError::InvalidConfig(_)
                | StateError::ConfigLoadFailed(_)
                | StateError::ConfigSaveFailed(_)
        )
    }
}
