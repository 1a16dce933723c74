//! # Roof Quote API
//!
//! HTTP service over the quote pipeline and the supplier ordering API.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Quote API Server                                 │
//! │                                                                         │
//! │  Client ──► axum (8080) ──► QuoteService ──► CatalogSource ──► SQLite   │
//! │                  │            (core pipeline)    (timeout + retry)      │
//! │                  │                                                      │
//! │                  └────────► SupplierClient ──► supplier REST API        │
//! │                              (shared session)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - TOML + environment configuration
//! - [`catalog_source`] - Snapshot reads with timeout and backoff
//! - [`service`] - Quote operations
//! - [`extraction`] - Model reply → raw measurements
//! - [`supplier`] - Order payloads, session, HTTP client
//! - [`routes`] - axum router and handlers
//! - [`error`] - `ApiError` and status mapping

pub mod catalog_source;
pub mod config;
pub mod error;
pub mod extraction;
pub mod routes;
pub mod service;
pub mod supplier;

pub use catalog_source::CatalogSource;
pub use config::{ConfigError, QuoteConfig};
pub use error::{ApiError, ErrorCode};
pub use routes::router;
pub use service::QuoteService;
pub use supplier::{SupplierClient, SupplierError};

use roofquote_db::Database;

/// Shared application state.
pub struct AppState {
    pub service: QuoteService,
    pub supplier: SupplierClient,
}

impl AppState {
    /// Wires the service and supplier client from configuration.
    pub fn new(db: Database, config: &QuoteConfig) -> Result<Self, SupplierError> {
        let catalog = CatalogSource::new(db, config.catalog.clone());
        Ok(AppState {
            service: QuoteService::new(catalog, config.supplier.clone()),
            supplier: SupplierClient::new(config.supplier.clone())?,
        })
    }
}
