//! # roofquote-core: Pure Estimation Logic for Roof Quote
//!
//! This crate turns roof measurements into material quantities and priced
//! invoices. Everything here is a pure function over its inputs; the only
//! outside data it touches is the catalog, and that arrives through the
//! [`CatalogReader`] trait.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Quote Pipeline                                   │
//! │                                                                         │
//! │  RawMeasurement ("10ft 3in", "2,200", null)                             │
//! │       │                                                                 │
//! │       ▼  dimension::normalize_measurement                               │
//! │  Measurement (feet / sqft)                                              │
//! │       │                                                                 │
//! │       ├──► wastage::resolve_wastage_factors ──► category → factor       │
//! │       │                                            │                    │
//! │       ▼                                            ▼                    │
//! │  quantity::compute_quantities ◄───────────── shingles_wastage_factor    │
//! │       │                                                                 │
//! │       ▼  QuantityMap (category → ceil(formula))                         │
//! │  catalog::resolve_product (one per category)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  invoice::assemble ──► Invoice { Invoice_Details, Summary }             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`dimension`] - Free-form length strings to feet
//! - [`expr`] - Restricted arithmetic/boolean expression language
//! - [`wastage`] - First-matching wastage rule per category
//! - [`quantity`] - Formula evaluation with ceiling rounding
//! - [`catalog`] - Catalog reads and unique product resolution
//! - [`invoice`] - Invoice assembly and order review totals
//! - [`pipeline`] - The end-to-end flows used by the service layer
//! - [`money`] - Integer-cent money type
//! - [`types`] - Domain types (Measurement, FormulaRule, ProductRecord, ...)
//! - [`validation`] - Request validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use roofquote_core::expr::{evaluate, Environment, Value};
//!
//! let env = Environment::new()
//!     .with("shingles_wastage_factor", 1.16)
//!     .with("TotalRoofArea_sqft", 2200.0);
//!
//! let bundles = evaluate("shingles_wastage_factor * TotalRoofArea_sqft / 100 * 3", &env).unwrap();
//! assert!(matches!(bundles, Value::Number(n) if (n - 76.56).abs() < 1e-9));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod dimension;
pub mod error;
pub mod expr;
pub mod invoice;
pub mod money;
pub mod pipeline;
pub mod quantity;
pub mod types;
pub mod validation;
pub mod wastage;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::{resolve_product, CatalogReader, CatalogSnapshot, ProductQuery};
pub use dimension::{dimension_to_feet, normalize_measurement, MalformedDimension};
pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::{assemble, Invoice, InvoiceLine, OrderReview, Summary};
pub use money::Money;
pub use pipeline::{build_invoice, estimate_quantities, price_quantities, QuantityEstimate};
pub use quantity::{compute_quantities, QuantityMap, QuantityReport};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Environment name bound to the number of roof vents on the job.
pub const VENTS_VARIABLE: &str = "Number_of_Vents";

/// Environment name bound to the number of pipe boots on the job.
pub const PIPE_BOOTS_VARIABLE: &str = "Number_of_Pipe_Boots";

/// Factor used when no wastage rule matches a category.
pub const DEFAULT_WASTAGE_FACTOR: f64 = 1.0;
