//! # Repository Module
//!
//! Catalog table access, one repository per table plus the snapshot loader.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  db.formulas()   FormulaRepository   formulae, derived_variables        │
//! │  db.wastage()    WastageRepository   wastage_conditions                 │
//! │  db.products()   ProductRepository   products                           │
//! │  db.suppliers()  SupplierRepository  suppliers                          │
//! │  db.catalog()    CatalogRepository   all of the above → CatalogSnapshot │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Queries use the runtime-checked `sqlx::query_as::<_, T>` form with column
//! aliases matching the core row types, so the crate builds without a live
//! database.

pub mod catalog;
pub mod formula;
pub mod product;
pub mod supplier;
pub mod wastage;
