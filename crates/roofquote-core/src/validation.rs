//! # Validation Module
//!
//! Request validation for Roof Quote.
//!
//! ## Where Validation Sits
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                       │
//! │  ├── Enum values (StructureType, ShingleColour)                         │
//! │  └── ISO dates, numeric types                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Measurements finite and non-negative                               │
//! │  ├── Order metadata (supplier, email, dates)                            │
//! │  └── Caller-supplied quantity maps                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Catalog store (SQLite CHECK / PRIMARY KEY constraints)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Quantities themselves are NOT range-checked: a formula may legitimately
//! produce zero or a negative value and that line is still priced.

use crate::error::ValidationError;
use crate::types::{Measurement, OrderMetadata};
use crate::quantity::QuantityMap;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted category name.
const MAX_CATEGORY_LEN: usize = 100;

// =============================================================================
// Measurement Validators
// =============================================================================

/// Validates that every numeric measurement field is finite and non-negative.
///
/// ## Example
/// ```rust
/// use roofquote_core::types::Measurement;
/// use roofquote_core::validation::validate_measurement;
///
/// let mut m = Measurement::default();
/// m.total_roof_area_sqft = 2200.0;
/// assert!(validate_measurement(&m).is_ok());
///
/// m.hips_length_ft = -3.0;
/// assert!(validate_measurement(&m).is_err());
/// ```
pub fn validate_measurement(measurement: &Measurement) -> ValidationResult<()> {
    for (field, value) in measurement.numeric_fields() {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite {
                field: field.to_string(),
            });
        }
        if value < 0.0 {
            return Err(ValidationError::Negative {
                field: field.to_string(),
                value,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Order Validators
// =============================================================================

/// Validates a homeowner email address.
///
/// ## Rules
/// - Must not be empty
/// - Exactly one `@`, with text on both sides
/// - The domain part contains a `.`
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "homeowner_email".to_string(),
        });
    }

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "homeowner_email".to_string(),
        reason: reason.to_string(),
    };

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(invalid("must contain exactly one '@'")),
    };

    if local.is_empty() || domain.is_empty() {
        return Err(invalid("must have text before and after '@'"));
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid("domain must contain a '.'"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    Ok(())
}

/// Validates order metadata before pricing.
///
/// ## Rules
/// - `supplier` is required
/// - `homeowner_email` passes [`validate_email`]
/// - Installation does not happen before materials are delivered
pub fn validate_order_metadata(order: &OrderMetadata) -> ValidationResult<()> {
    if order.supplier.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "supplier".to_string(),
        });
    }

    validate_email(&order.homeowner_email)?;

    if order.installation_date < order.material_delivery_date {
        return Err(ValidationError::InvalidFormat {
            field: "installation_date".to_string(),
            reason: format!(
                "must not be before material_delivery_date ({})",
                order.material_delivery_date
            ),
        });
    }

    Ok(())
}

// =============================================================================
// Quantity Validators
// =============================================================================

/// Validates a caller-supplied quantity map (the price-only flow).
///
/// ## Rules
/// - At least one category
/// - Category names are non-empty and at most 100 characters
/// - No category repeated once trimmed
pub fn validate_quantity_map(quantities: &QuantityMap) -> ValidationResult<()> {
    if quantities.is_empty() {
        return Err(ValidationError::Required {
            field: "quantities".to_string(),
        });
    }

    let mut seen = std::collections::HashSet::new();
    for category in quantities.keys() {
        let trimmed = category.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Required {
                field: "category".to_string(),
            });
        }
        if trimmed.len() > MAX_CATEGORY_LEN {
            return Err(ValidationError::InvalidFormat {
                field: "category".to_string(),
                reason: format!("must be at most {} characters", MAX_CATEGORY_LEN),
            });
        }
        if !seen.insert(trimmed) {
            return Err(ValidationError::Duplicate {
                field: "category".to_string(),
                value: trimmed.to_string(),
            });
        }
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
