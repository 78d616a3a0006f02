//! # Error Types
//!
//! Domain-specific error types for basket-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  basket-core errors (this file)                                        │
//! │  ├── CoreError        - Snapshot encode/decode failures                │
//! │  └── ValidationError  - Input and snapshot validation failures         │
//! │                                                                         │
//! │  basket-db errors (separate crate)                                     │
//! │  └── DbError          - Key-value store failures                       │
//! │                                                                         │
//! │  basket-state errors                                                   │
//! │  └── StateError       - Configuration / Hydration / Persistence        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → StateError::Hydration             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core cart logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A durable snapshot could not be parsed.
    ///
    /// ## When This Occurs
    /// - The stored value is not a JSON array
    /// - A line item has an unknown or missing field
    /// - A quantity is negative or not an integer
    #[error("Malformed cart snapshot: {0}")]
    MalformedSnapshot(String),

    /// A cart could not be serialized.
    #[error("Failed to encode cart snapshot: {0}")]
    EncodeFailed(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised for add-to-cart descriptors and for decoded snapshots.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Value must be a finite number.
    #[error("{field} must be a finite number")]
    NotFinite { field: String },

    /// Duplicate value (e.g., the same id twice in one snapshot).
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::MalformedSnapshot(err.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
