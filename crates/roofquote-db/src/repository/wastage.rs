//! # Wastage Repository
//!
//! Conditional wastage multipliers, stored per category and evaluated in
//! ascending id order. The first condition that holds wins.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use roofquote_core::WastageRule;

pub(crate) const WASTAGE_COLUMNS: &str = r#"
    SELECT
        wastage_factor_id AS id,
        category,
        wastage_condition AS condition,
        wastage_factor AS factor
    FROM wastage_conditions
"#;

/// Repository for wastage condition operations.
#[derive(Debug, Clone)]
pub struct WastageRepository {
    pool: SqlitePool,
}

impl WastageRepository {
    /// Creates a new WastageRepository.
    pub fn new(pool: SqlitePool) -> Self {
        WastageRepository { pool }
    }

    /// Lists the rules for one category in evaluation order.
    pub async fn list_for_category(&self, category: &str) -> DbResult<Vec<WastageRule>> {
        debug!(category = %category, "Listing wastage rules");

        let sql = format!("{WASTAGE_COLUMNS} WHERE category = ? ORDER BY wastage_factor_id");
        let rules = sqlx::query_as::<_, WastageRule>(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;

        Ok(rules)
    }

    /// Lists every rule ordered by id.
    pub async fn list_all(&self) -> DbResult<Vec<WastageRule>> {
        let sql = format!("{WASTAGE_COLUMNS} ORDER BY wastage_factor_id");
        let rules = sqlx::query_as::<_, WastageRule>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rules)
    }

    /// Appends a rule after the existing ones for its category.
    ///
    /// ## Returns
    /// The assigned id.
    ///
    /// ## Errors
    /// * `DbError::ForeignKeyViolation` - No formula for the category
    /// * `DbError::CheckViolation` - Factor is not positive
    pub async fn insert(&self, category: &str, condition: &str, factor: f64) -> DbResult<i64> {
        debug!(category = %category, factor = factor, "Inserting wastage rule");

        let result = sqlx::query(
            r#"
            INSERT INTO wastage_conditions (category, wastage_condition, wastage_factor)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(category)
        .bind(condition)
        .bind(factor)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Removes every rule for a category. Returns how many were removed.
    pub async fn clear_category(&self, category: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM wastage_conditions WHERE category = ?")
            .bind(category)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::{Database, DbConfig};
    use roofquote_core::FormulaRule;

    use super::*;

    async fn db_with_caps() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.formulas()
            .upsert(
                &FormulaRule {
                    category: "Caps".to_string(),
                    equation: "caps_wastage_factor * RidgesHipsLength_ft / 25".to_string(),
                    default_wastage_factor: 1.0,
                    is_colour_variant: true,
                },
                0,
            )
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_rules_come_back_in_insert_order() {
        let db = db_with_caps().await;
        let repo = db.wastage();

        let first = repo.insert("Caps", "HipsLength_ft > 0", 1.2).await.unwrap();
        let second = repo.insert("Caps", "HipsLength_ft == 0", 1.1).await.unwrap();
        assert!(first < second);

        let rules = repo.list_for_category("Caps").await.unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].id, first);
        assert_eq!(rules[0].condition, "HipsLength_ft > 0");
        assert_eq!(rules[1].factor, 1.1);
    }

    #[tokio::test]
    async fn test_unknown_category_rejected() {
        let db = db_with_caps().await;
        let err = db.wastage().insert("Gutters", "1", 1.1).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_non_positive_factor_rejected() {
        let db = db_with_caps().await;
        let err = db.wastage().insert("Caps", "1", 0.0).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[tokio::test]
    async fn test_deleting_formula_cascades() {
        let db = db_with_caps().await;
        db.wastage().insert("Caps", "1", 1.1).await.unwrap();

        db.formulas().delete("Caps").await.unwrap();
        assert!(db.wastage().list_all().await.unwrap().is_empty());
    }
}
