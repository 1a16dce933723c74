//! # Supplier Repository
//!
//! Supplier contact and warehouse details. Products reference suppliers
//! by name, so the name is unique.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use roofquote_core::Supplier;

const SUPPLIER_COLUMNS: &str = r#"
    SELECT supplier_id, name, warehouse, contact_number, po_box, vendor_address
    FROM suppliers
"#;

/// Repository for supplier operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    /// Creates a new SupplierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Gets a supplier by id.
    pub async fn get_by_id(&self, supplier_id: &str) -> DbResult<Supplier> {
        let sql = format!("{SUPPLIER_COLUMNS} WHERE supplier_id = ?");
        sqlx::query_as::<_, Supplier>(&sql)
            .bind(supplier_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", supplier_id))
    }

    /// Gets a supplier by its exact name.
    pub async fn get_by_name(&self, name: &str) -> DbResult<Supplier> {
        debug!(name = %name, "Getting supplier by name");

        let sql = format!("{SUPPLIER_COLUMNS} WHERE name = ?");
        sqlx::query_as::<_, Supplier>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", name))
    }

    /// Lists suppliers by name.
    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let sql = format!("{SUPPLIER_COLUMNS} ORDER BY name");
        let suppliers = sqlx::query_as::<_, Supplier>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(suppliers)
    }

    /// Inserts or updates a supplier by id.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - Another supplier already has this name
    pub async fn upsert(&self, supplier: &Supplier) -> DbResult<()> {
        debug!(supplier_id = %supplier.supplier_id, "Upserting supplier");

        sqlx::query(
            r#"
            INSERT INTO suppliers (supplier_id, name, warehouse, contact_number, po_box, vendor_address)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(supplier_id) DO UPDATE SET
                name = excluded.name,
                warehouse = excluded.warehouse,
                contact_number = excluded.contact_number,
                po_box = excluded.po_box,
                vendor_address = excluded.vendor_address
            "#,
        )
        .bind(&supplier.supplier_id)
        .bind(&supplier.name)
        .bind(&supplier.warehouse)
        .bind(&supplier.contact_number)
        .bind(&supplier.po_box)
        .bind(&supplier.vendor_address)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: supplier.name.clone(),
            },
            other => other,
        })?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
