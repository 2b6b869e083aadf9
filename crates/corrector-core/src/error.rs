//! # Error Types
//!
//! Domain-specific error types for corrector-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  corrector-core errors (this file)                                     │
//! │  ├── CoreError        - Domain code lookups                            │
//! │  └── ValidationError  - Receipt checks before fiscalization            │
//! │                                                                         │
//! │  corrector-device errors (separate crate)                              │
//! │  └── DeviceError      - Classified fiscal register failures            │
//! │                                                                         │
//! │  corrector-sync errors (separate crate)                                │
//! │  └── SyncError        - Feed, report and config failures               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain lookup failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Tax rate code is not defined by the fiscal data format.
    #[error("Unknown tax rate code: {0}")]
    UnknownTaxRate(u8),

    /// Measure unit code is not defined by the fiscal data format.
    #[error("Unknown measure unit code: {0}")]
    UnknownMeasureUnit(u8),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Receipt validation errors.
///
/// These are raised by the caller of the device layer before a receipt is
/// handed over; the device layer itself never re-validates.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Line total does not match price × quantity.
    #[error("Line {index} total {actual} does not match price × quantity ({expected})")]
    TotalMismatch {
        index: usize,
        expected: i64,
        actual: i64,
    },

    /// Collection is larger than allowed.
    #[error("{field} must have at most {max} entries")]
    TooMany { field: String, max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "items".to_string(),
        };
        assert_eq!(err.to_string(), "items is required");

        let err = ValidationError::TotalMismatch {
            index: 2,
            expected: 300,
            actual: 299,
        };
        assert_eq!(
            err.to_string(),
            "Line 2 total 299 does not match price × quantity (300)"
        );
    }
}
