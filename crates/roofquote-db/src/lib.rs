//! # roofquote-db: Catalog Store for Roof Quote
//!
//! SQLite storage for everything the quote pipeline reads: formulas,
//! wastage conditions, derived variables, suppliers and priced products.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Roof Quote Data Flow                             │
//! │                                                                         │
//! │  quote-api handler (POST /api/invoices)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                   roofquote-db (THIS CRATE)                     │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌────────────────┐  │    │
//! │  │   │   Database    │    │  Repositories  │   │   Migrations   │  │    │
//! │  │   │   (pool.rs)   │    │                │   │   (embedded)   │  │    │
//! │  │   │               │    │ FormulaRepo    │   │                │  │    │
//! │  │   │ SqlitePool    │◄───│ WastageRepo    │   │ 001_catalog_   │  │    │
//! │  │   │               │    │ ProductRepo    │   │   schema.sql   │  │    │
//! │  │   │               │    │ CatalogRepo    │   │                │  │    │
//! │  │   └───────────────┘    └────────────────┘   └────────────────┘  │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CatalogSnapshot ──► roofquote_core::build_invoice                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Per-table repositories and the snapshot loader
//! - [`seed`] - The standard catalog
//!
//! ## Usage
//!
//! ```rust,ignore
//! use roofquote_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("catalog.db")).await?;
//! let snapshot = db.catalog().snapshot(Some("BEACON BUILDING PRODUCTS")).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod seed;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use seed::{seed_standard_catalog, SeedReport};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::formula::FormulaRepository;
pub use repository::product::ProductRepository;
pub use repository::supplier::SupplierRepository;
pub use repository::wastage::WastageRepository;
