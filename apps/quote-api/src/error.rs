//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Quote API                          │
//! │                                                                         │
//! │  Handler → Result<Json<T>, ApiError>                                    │
//! │                                                                         │
//! │  CoreError::Validation          ──► 400 VALIDATION_ERROR                │
//! │  CoreError::AmountOutOfRange    ──► 400 VALIDATION_ERROR                │
//! │  CoreError::Expression          ──► 422 FORMULA_ERROR                   │
//! │  CoreError::ProductNotFound  ┐                                          │
//! │  CoreError::AmbiguousProduct ├──► 422 CATALOG_ERROR                     │
//! │  CoreError::CategorySet…     │                                          │
//! │  CoreError::WastageVariable… ┘                                          │
//! │  CoreError::CatalogUnavailable  ──► 503 CATALOG_UNAVAILABLE             │
//! │  ExtractionError                ──► 422 EXTRACTION_ERROR                │
//! │  SupplierError::NotConfigured   ──► 503 SUPPLIER_NOT_CONFIGURED         │
//! │  SupplierError (other)          ──► 502 SUPPLIER_ERROR                  │
//! │  DbError                        ──► 500 DATABASE_ERROR (logged)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Response Body
//! ```json
//! {
//!   "code": "CATALOG_ERROR",
//!   "message": "No product for category 'Shingles' from supplier 'XYZ Materials' in colour 'Hickory'"
//! }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::extraction::ExtractionError;
use crate::supplier::SupplierError;
use roofquote_core::CoreError;
use roofquote_db::DbError;

/// API error returned from handlers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// A stored formula or wastage condition failed for this job (422)
    FormulaError,

    /// Catalog has no single product for a category (422)
    CatalogError,

    /// Extraction reply could not be read (422)
    ExtractionError,

    /// Catalog store unreachable; retry later (503)
    CatalogUnavailable,

    /// Supplier credentials missing (503)
    SupplierNotConfigured,

    /// Supplier API failed or rejected the request (502)
    SupplierError,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::FormulaError
            | ErrorCode::CatalogError
            | ErrorCode::ExtractionError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::CatalogUnavailable | ErrorCode::SupplierNotConfigured => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ErrorCode::SupplierError => StatusCode::BAD_GATEWAY,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
            e @ CoreError::AmountOutOfRange { .. } => ApiError::validation(e.to_string()),
            e @ CoreError::Expression { .. } => ApiError::new(ErrorCode::FormulaError, e.to_string()),
            e @ (CoreError::ProductNotFound { .. }
            | CoreError::AmbiguousProduct { .. }
            | CoreError::CategorySetMismatch { .. }
            | CoreError::WastageVariableCollision { .. }
            | CoreError::DuplicateFormula(_)) => {
                ApiError::new(ErrorCode::CatalogError, e.to_string())
            }
            CoreError::CatalogUnavailable(reason) => {
                tracing::error!("Catalog unavailable: {}", reason);
                ApiError::new(
                    ErrorCode::CatalogUnavailable,
                    "Catalog is temporarily unavailable, please retry",
                )
            }
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ConnectionFailed(_) | DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database unavailable")
            }
            other => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", other);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        ApiError::new(ErrorCode::ExtractionError, err.to_string())
    }
}

impl From<SupplierError> for ApiError {
    fn from(err: SupplierError) -> Self {
        match err {
            SupplierError::NotConfigured => {
                ApiError::new(ErrorCode::SupplierNotConfigured, err.to_string())
            }
            SupplierError::InvalidLine { .. } => ApiError::validation(err.to_string()),
            SupplierError::Http(e) => {
                tracing::error!("Supplier request failed: {}", e);
                ApiError::new(ErrorCode::SupplierError, "Supplier API unreachable")
            }
            other => {
                tracing::warn!("Supplier call failed: {}", other);
                ApiError::new(ErrorCode::SupplierError, other.to_string())
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use roofquote_core::ValidationError;

    #[test]
    fn test_core_errors_map_to_codes() {
        let err: ApiError = CoreError::ProductNotFound {
            category: "Shingles".to_string(),
            supplier: "XYZ Materials".to_string(),
            colour: Some("Hickory".to_string()),
        }
        .into();
        assert_eq!(err.code, ErrorCode::CatalogError);
        assert!(err.message.contains("Hickory"));

        let err: ApiError = CoreError::CatalogUnavailable("pool timed out".to_string()).into();
        assert_eq!(err.code.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.message.contains("pool"));

        let err: ApiError = CoreError::Validation(ValidationError::Required {
            field: "homeowner_email".to_string(),
        })
        .into();
        assert_eq!(err.code.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = CoreError::AmountOutOfRange {
            subject: "invoice total".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_db_internals_not_leaked() {
        let err: ApiError = DbError::QueryFailed("near \"SELEC\": syntax error".to_string()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");
    }

    #[test]
    fn test_supplier_errors() {
        let err: ApiError = SupplierError::NotConfigured.into();
        assert_eq!(err.code.status(), StatusCode::SERVICE_UNAVAILABLE);

        let err: ApiError = SupplierError::Rejected {
            endpoint: "/submitOrder".to_string(),
            status: 400,
            body: "bad item".to_string(),
        }
        .into();
        assert_eq!(err.code.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(ApiError::validation("bad date")).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["message"], "bad date");
    }
}
