//! # Error Types
//!
//! Domain-specific error types for rxdesk-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  rxdesk-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  rxdesk-db errors (separate crate)                                     │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  REST errors (apps/api)                                                │
//! │  └── ApiError         - What the client sees (JSON + status)           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A cart line references a product that does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Not enough stock across all batches of a product.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 7)
    ///      │
    ///      ▼
    /// Sum batches: available=5
    ///      │
    ///      ▼
    /// InsufficientStock { product_id, requested: 7, available: 5 }
    ///      │
    ///      ▼
    /// Client shows: "Only 5 Paracetamol 500mg in stock (short by 2)"
    /// ```
    #[error("Insufficient stock for {product_name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        product_name: String,
        available: i64,
        requested: i64,
    },

    /// Payment does not cover the total, or is otherwise unusable.
    #[error("Invalid payment: {reason}")]
    InvalidPayment { reason: String },

    /// Sale cannot be found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Refund asks for more than is left to refund on a batch slice.
    #[error("Cannot refund {requested} of batch {batch_id}: only {refundable} refundable")]
    RefundExceedsSale {
        batch_id: String,
        requested: i64,
        refundable: i64,
    },

    /// The sale cannot be refunded (already a refund, or nothing left).
    #[error("Sale {sale_id} cannot be refunded: {reason}")]
    NotRefundable { sale_id: String, reason: String },

    /// A computed amount does not fit in the money range.
    #[error("{field} is too large")]
    AmountOverflow { field: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// How many units short an `InsufficientStock` error is.
    pub fn shortfall(&self) -> Option<i64> {
        match self {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => Some(requested - available),
            _ => None,
        }
    }

    pub fn amount_overflow(field: impl Into<String>) -> Self {
        CoreError::AmountOverflow { field: field.into() }
    }

    /// Builds an `InvalidPayment` error for cash that does not cover the total.
    pub fn cash_short(total: Money, received: Money) -> Self {
        CoreError::InvalidPayment {
            reason: format!("cash received {} is less than total {}", received, total),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised by the REST boundary before any business logic runs; the core
/// components only ever see already-validated inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn negative(field: impl Into<String>) -> Self {
        ValidationError::MustNotBeNegative {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            product_name: "Amoxicillin 250mg".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Amoxicillin 250mg: available 3, requested 5"
        );
        assert_eq!(err.shortfall(), Some(2));
    }

    #[test]
    fn test_cash_short_message() {
        let err = CoreError::cash_short(Money::from_cents(4250), Money::from_cents(4000));
        assert_eq!(
            err.to_string(),
            "Invalid payment: cash received 40.00 is less than total 42.50"
        );
        assert_eq!(err.shortfall(), None);
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("name").to_string(), "name is required");
        assert_eq!(
            ValidationError::negative("advances").to_string(),
            "advances must not be negative"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("items").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
