//! # Product Repository
//!
//! Priced products keyed by `(category, supplier, colour)`.
//!
//! ## Lookup Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  find_by_key("Shingles", "BEACON…", Some("Charcoal"))                   │
//! │       → WHERE category = ? AND supplier = ? AND colour = ?              │
//! │                                                                         │
//! │  find_by_key("Back Roof Vent", "BEACON…", None)                         │
//! │       → WHERE category = ? AND supplier = ?   (colour ignored)          │
//! │                                                                         │
//! │  Zero rows  → caller reports ProductNotFound                            │
//! │  Two+ rows  → caller reports AmbiguousProduct                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use roofquote_core::ProductRecord;

pub(crate) const PRODUCT_COLUMNS: &str = r#"
    SELECT
        product_id,
        description,
        unit,
        category,
        unit_price,
        supplier,
        colour
    FROM products
"#;

/// Repository for product operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Finds every product matching a lookup key.
    ///
    /// Returns all matches so the caller can tell "none" from "ambiguous".
    pub async fn find_by_key(
        &self,
        category: &str,
        supplier: &str,
        colour: Option<&str>,
    ) -> DbResult<Vec<ProductRecord>> {
        debug!(category = %category, supplier = %supplier, colour = ?colour, "Finding product");

        let products = match colour {
            Some(colour) => {
                let sql = format!(
                    "{PRODUCT_COLUMNS} WHERE category = ? AND supplier = ? AND colour = ? ORDER BY product_id"
                );
                sqlx::query_as::<_, ProductRecord>(&sql)
                    .bind(category)
                    .bind(supplier)
                    .bind(colour)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "{PRODUCT_COLUMNS} WHERE category = ? AND supplier = ? ORDER BY product_id"
                );
                sqlx::query_as::<_, ProductRecord>(&sql)
                    .bind(category)
                    .bind(supplier)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(products)
    }

    /// Lists one supplier's price list.
    pub async fn list_for_supplier(&self, supplier: &str) -> DbResult<Vec<ProductRecord>> {
        let sql = format!("{PRODUCT_COLUMNS} WHERE supplier = ? ORDER BY category, product_id");
        let products = sqlx::query_as::<_, ProductRecord>(&sql)
            .bind(supplier)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Lists every product.
    pub async fn list_all(&self) -> DbResult<Vec<ProductRecord>> {
        let sql = format!("{PRODUCT_COLUMNS} ORDER BY supplier, category, product_id");
        let products = sqlx::query_as::<_, ProductRecord>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Inserts or replaces a product by id.
    pub async fn upsert(&self, product: &ProductRecord) -> DbResult<()> {
        debug!(product_id = %product.product_id, "Upserting product");

        sqlx::query(
            r#"
            INSERT INTO products (product_id, description, unit, category, unit_price, supplier, colour)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(product_id) DO UPDATE SET
                description = excluded.description,
                unit = excluded.unit,
                category = excluded.category,
                unit_price = excluded.unit_price,
                supplier = excluded.supplier,
                colour = excluded.colour
            "#,
        )
        .bind(&product.product_id)
        .bind(&product.description)
        .bind(&product.unit)
        .bind(&product.category)
        .bind(product.unit_price)
        .bind(&product.supplier)
        .bind(&product.colour)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts stored products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
