//! # Shell Error Type
//!
//! Unified error type for shell commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in basket-shell                           │
//! │                                                                         │
//! │  "inc p1"                                                               │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  parse ──── unknown verb / bad number ───► ShellError(USAGE)           │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  execute ── StateError::Validation ──────► ShellError(VALIDATION_ERROR)│
//! │     │       StateError::Persistence ─────► ShellError(PERSISTENCE_ERROR)│
//! │     │       StateError::Configuration ───► ShellError(CONFIGURATION)   │
//! │     ▼                                                                   │
//! │  output ─── {"code": "...", "message": "..."} in --json mode           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use basket_core::ValidationError;
use basket_db::DbError;
use basket_state::StateError;
use serde::Serialize;

/// Error returned from shell commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "VALIDATION_ERROR",
///   "message": "Invalid item: price must not be negative"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes for shell responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The command line could not be parsed
    Usage,

    /// Item descriptor rejected
    ValidationError,

    /// The cart was used without a provider, or config is invalid
    Configuration,

    /// The stored cart could not be read or decoded
    StorageError,

    /// A snapshot could not be written
    PersistenceError,

    /// Anything else
    Internal,
}

impl ShellError {
    /// Creates a new shell error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ShellError {
            code,
            message: message.into(),
        }
    }

    /// Creates a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        ShellError::new(ErrorCode::Usage, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ShellError::new(ErrorCode::Internal, message)
    }
}

/// Converts state errors to shell errors.
impl From<StateError> for ShellError {
    fn from(err: StateError) -> Self {
        let code = match &err {
            StateError::Validation(_) => ErrorCode::ValidationError,
            StateError::Configuration(_)
            | StateError::InvalidConfig(_)
            | StateError::ConfigLoadFailed(_)
            | StateError::ConfigSaveFailed(_) => ErrorCode::Configuration,
            StateError::Hydration { .. } | StateError::Store(_) => ErrorCode::StorageError,
            StateError::Persistence { .. } => ErrorCode::PersistenceError,
            StateError::ChannelClosed(e) => {
                tracing::error!("Snapshot writer unavailable: {}", e);
                ErrorCode::Internal
            }
        };
        ShellError::new(code, err.to_string())
    }
}

/// Converts database errors to shell errors.
impl From<DbError> for ShellError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConnectionFailed(_) => {
                ShellError::new(ErrorCode::StorageError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ShellError::new(ErrorCode::StorageError, "Database migration failed")
            }
            other => {
                // Log the actual error but return a generic message
                tracing::error!("Database error: {}", other);
                ShellError::new(ErrorCode::StorageError, "Database operation failed")
            }
        }
    }
}

impl From<ValidationError> for ShellError {
    fn from(err: ValidationError) -> Self {
        ShellError::new(ErrorCode::ValidationError, err.to_string())
    }
}

impl std::fmt::Display for ShellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ShellError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_error_codes() {
        assert_eq!(
            ShellError::from(StateError::outside_provider()).code,
            ErrorCode::Configuration
        );
        assert_eq!(
            ShellError::from(StateError::Persistence {
                version: 2,
                reason: "disk full".into()
            })
            .code,
            ErrorCode::PersistenceError
        );
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&ShellError::usage("unknown command 'x'")).unwrap();
        assert_eq!(json, r#"{"code":"USAGE","message":"unknown command 'x'"}"#);
    }
}
