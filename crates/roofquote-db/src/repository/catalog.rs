//! # Catalog Snapshot Loader
//!
//! Reads formulas, wastage rules, derived variables and products into a
//! [`CatalogSnapshot`] the quote pipeline can run against without touching
//! the database again.
//!
//! ```text
//! formulae ─────────┐
//! wastage_conditions┤
//! derived_variables ├──► CatalogSnapshot::new ──► build_invoice(&snapshot, …)
//! products ─────────┘        (validates, groups, sorts)
//! ```
//!
//! All four reads share one transaction so a concurrent price-list import
//! can't produce a half-updated snapshot.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::formula::FORMULA_COLUMNS;
use crate::repository::product::PRODUCT_COLUMNS;
use crate::repository::wastage::WASTAGE_COLUMNS;
use roofquote_core::{CatalogSnapshot, DerivedVariable, FormulaRule, ProductRecord, WastageRule};

/// Loads catalog snapshots.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Loads a snapshot.
    ///
    /// ## Arguments
    /// * `supplier` - Restrict products to one supplier's price list, or
    ///   `None` for every supplier
    ///
    /// ## Errors
    /// Any query failure. An empty catalog is not an error; the quote
    /// pipeline reports the missing pieces.
    pub async fn snapshot(&self, supplier: Option<&str>) -> DbResult<CatalogSnapshot> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("{FORMULA_COLUMNS} ORDER BY sort_order, category");
        let formulas = sqlx::query_as::<_, FormulaRule>(&sql)
            .fetch_all(&mut *tx)
            .await?;

        let sql = format!("{WASTAGE_COLUMNS} ORDER BY wastage_factor_id");
        let wastage = sqlx::query_as::<_, WastageRule>(&sql)
            .fetch_all(&mut *tx)
            .await?;

        let derived = sqlx::query_as::<_, DerivedVariable>(
            "SELECT name, expression FROM derived_variables ORDER BY sort_order, name",
        )
        .fetch_all(&mut *tx)
        .await?;

        let products = match supplier {
            Some(supplier) => {
                let sql = format!("{PRODUCT_COLUMNS} WHERE supplier = ? ORDER BY category, product_id");
                sqlx::query_as::<_, ProductRecord>(&sql)
                    .bind(supplier)
                    .fetch_all(&mut *tx)
                    .await?
            }
            None => {
                let sql = format!("{PRODUCT_COLUMNS} ORDER BY supplier, category, product_id");
                sqlx::query_as::<_, ProductRecord>(&sql)
                    .fetch_all(&mut *tx)
                    .await?
            }
        };

        tx.commit().await?;

        debug!(
            formulas = formulas.len(),
            wastage_rules = wastage.len(),
            products = products.len(),
            supplier = ?supplier,
            "Catalog snapshot loaded"
        );

        // formulae.category is the primary key, so a duplicate here means
        // the schema was bypassed.
        CatalogSnapshot::new(formulas, wastage, products, derived)
            .map_err(|e| DbError::Internal(e.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
