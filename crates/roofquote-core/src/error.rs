//! # Error Types
//!
//! Domain-specific error types for roofquote-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  roofquote-core errors (this file + expr)                               │
//! │  ├── CoreError        - Request-level pipeline failures                 │
//! │  ├── ValidationError  - Input validation failures                       │
//! │  └── ExprError        - Expression lexing/parsing/evaluation            │
//! │                                                                         │
//! │  Recovered locally (never a CoreError)                                  │
//! │  └── MalformedDimension - length string defaulted to 0                  │
//! │                                                                         │
//! │  roofquote-db errors (separate crate)                                   │
//! │  └── DbError          - Catalog store failures                          │
//! │                                                                         │
//! │  quote-api errors (in app)                                              │
//! │  └── ApiError         - What HTTP clients see (serialized)              │
//! │                                                                         │
//! │  Flow: ExprError → CoreError → ApiError → HTTP response                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant carries what an operator needs to fix the offending
//! catalog row: category, expression text, variable name.

use thiserror::Error;

use crate::expr::ExprError;

// =============================================================================
// Core Error
// =============================================================================

/// Request-level failures of the quote pipeline.
///
/// None of these are fatal to the process; each is scoped to the single
/// request that produced it.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A stored formula or wastage condition failed to evaluate.
    ///
    /// ## When This Occurs
    /// - A formula references a variable that is not in the environment
    /// - A formula divides by zero for this job's measurements
    /// - A formula yields a boolean, or a condition does not parse
    ///
    /// `subject` names the catalog row, e.g. `formula for Shingles` or
    /// `wastage rule 3 for Shingles`.
    #[error("{subject} failed: {source} (expression: `{expression}`)")]
    Expression {
        subject: String,
        expression: String,
        #[source]
        source: ExprError,
    },

    /// No catalog product matches the lookup key.
    #[error("No product for category '{category}' from supplier '{supplier}'{}", colour_suffix(.colour))]
    ProductNotFound {
        category: String,
        supplier: String,
        colour: Option<String>,
    },

    /// More than one catalog product matches the lookup key.
    ///
    /// ## When This Occurs
    /// The catalog must hold exactly one product per (category, supplier[, colour]).
    /// Two rows for the same key is a data-integrity problem; the resolver
    /// reports it instead of picking one.
    #[error("{matches} products match category '{category}' from supplier '{supplier}'{}", colour_suffix(.colour))]
    AmbiguousProduct {
        category: String,
        supplier: String,
        colour: Option<String>,
        matches: usize,
    },

    /// The categories with quantities and the categories with products differ.
    ///
    /// Signals drift between the formula catalog and the product catalog.
    #[error("Category sets differ: no product for {missing_products:?}, no quantity for {unexpected_products:?}")]
    CategorySetMismatch {
        missing_products: Vec<String>,
        unexpected_products: Vec<String>,
    },

    /// A money amount does not fit in `i64` cents.
    ///
    /// ## When This Occurs
    /// Absurd quantities (posted directly or produced by a formula over a
    /// huge roof area) times the unit price, or the sum of such lines.
    #[error("{subject} is outside the supported money range")]
    AmountOutOfRange { subject: String },

    /// Two categories bind their wastage factor under the same variable name.
    ///
    /// Each formula must see its own category's factor, so the catalog is
    /// rejected rather than letting one binding shadow the other.
    #[error("Categories '{first}' and '{second}' both bind wastage variable '{variable}'")]
    WastageVariableCollision {
        variable: String,
        first: String,
        second: String,
    },

    /// The formula catalog declares the same category twice.
    #[error("Formula catalog declares category '{0}' more than once")]
    DuplicateFormula(String),

    /// The catalog store could not be reached (timeout, connection, pool).
    ///
    /// Retryable: see [`CoreError::is_retryable`].
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns true if the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::CatalogUnavailable(_))
    }

    /// Builds an [`CoreError::Expression`] for a catalog row.
    pub fn expression(
        subject: impl Into<String>,
        expression: impl Into<String>,
        source: ExprError,
    ) -> Self {
        CoreError::Expression {
            subject: subject.into(),
            expression: expression.into(),
            source,
        }
    }
}

fn colour_suffix(colour: &Option<String>) -> String {
    match colour {
        Some(colour) => format!(" in colour '{}'", colour),
        None => String::new(),
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before the pipeline runs, so a bad request never reaches the
/// expression evaluator.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A numeric field is negative.
    #[error("{field} must not be negative (got {value})")]
    Negative { field: String, value: f64 },

    /// A numeric field is NaN or infinite.
    #[error("{field} must be a finite number")]
    NotFinite { field: String },

    /// Invalid format (e.g., malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is outside the allowed range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// The same category was given twice.
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
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
    fn test_product_not_found_message_includes_colour() {
        let err = CoreError::ProductNotFound {
            category: "Shingles".to_string(),
            supplier: "Roof Master".to_string(),
            colour: Some("Hickory".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "No product for category 'Shingles' from supplier 'Roof Master' in colour 'Hickory'"
        );

        let err = CoreError::ProductNotFound {
            category: "Drip Edge/Flashings".to_string(),
            supplier: "Roof Master".to_string(),
            colour: None,
        };
        assert_eq!(
            err.to_string(),
            "No product for category 'Drip Edge/Flashings' from supplier 'Roof Master'"
        );
    }

    #[test]
    fn test_expression_error_names_row_and_text() {
        let err = CoreError::expression(
            "formula for Shingles",
            "TotalRoofArea_sqft / Pitch",
            ExprError::UnknownVariable {
                name: "Pitch".to_string(),
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("formula for Shingles"));
        assert!(msg.contains("Pitch"));
        assert!(msg.contains("TotalRoofArea_sqft / Pitch"));
    }

    #[test]
    fn test_only_catalog_unavailable_is_retryable() {
        assert!(CoreError::CatalogUnavailable("timed out".into()).is_retryable());
        assert!(!CoreError::DuplicateFormula("Shingles".into()).is_retryable());
        assert!(!CoreError::CategorySetMismatch {
            missing_products: vec!["Shingles".into()],
            unexpected_products: vec![],
        }
        .is_retryable());
    }

    #[test]
    fn test_amount_out_of_range_message() {
        let err = CoreError::AmountOutOfRange {
            subject: "line total for Shingles".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "line total for Shingles is outside the supported money range"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "supplier".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
