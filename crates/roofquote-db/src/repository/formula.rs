//! # Formula Repository
//!
//! Per-category quantity formulas and the derived variables they share.
//!
//! Formulas come back in `sort_order`, which is also the order lines
//! appear on the invoice.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use roofquote_core::{DerivedVariable, FormulaRule};

pub(crate) const FORMULA_COLUMNS: &str = r#"
    SELECT
        category,
        equation,
        wastage_factor AS default_wastage_factor,
        is_colour AS is_colour_variant
    FROM formulae
"#;

/// Repository for formula and derived-variable operations.
#[derive(Debug, Clone)]
pub struct FormulaRepository {
    pool: SqlitePool,
}

impl FormulaRepository {
    /// Creates a new FormulaRepository.
    pub fn new(pool: SqlitePool) -> Self {
        FormulaRepository { pool }
    }

    /// Lists every formula in invoice order.
    pub async fn list(&self) -> DbResult<Vec<FormulaRule>> {
        debug!("Listing formulas");

        let sql = format!("{FORMULA_COLUMNS} ORDER BY sort_order, category");
        let formulas = sqlx::query_as::<_, FormulaRule>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(formulas)
    }

    /// Gets the formula for one category.
    ///
    /// ## Returns
    /// * `Ok(FormulaRule)` - Formula found
    /// * `Err(DbError::NotFound)` - No formula for the category
    pub async fn get(&self, category: &str) -> DbResult<FormulaRule> {
        debug!(category = %category, "Getting formula");

        let sql = format!("{FORMULA_COLUMNS} WHERE category = ?");
        sqlx::query_as::<_, FormulaRule>(&sql)
            .bind(category)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Formula", category))
    }

    /// Inserts or replaces a formula.
    ///
    /// ## Arguments
    /// * `rule` - Formula to store
    /// * `sort_order` - Position on the invoice (ascending)
    pub async fn upsert(&self, rule: &FormulaRule, sort_order: i64) -> DbResult<()> {
        debug!(category = %rule.category, "Upserting formula");

        // ON CONFLICT keeps existing wastage conditions; INSERT OR REPLACE
        // would delete the row and cascade.
        sqlx::query(
            r#"
            INSERT INTO formulae (category, equation, wastage_factor, is_colour, sort_order)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(category) DO UPDATE SET
                equation = excluded.equation,
                wastage_factor = excluded.wastage_factor,
                is_colour = excluded.is_colour,
                sort_order = excluded.sort_order
            "#,
        )
        .bind(&rule.category)
        .bind(&rule.equation)
        .bind(rule.default_wastage_factor)
        .bind(rule.is_colour_variant)
        .bind(sort_order)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes a formula and, by cascade, its wastage conditions.
    pub async fn delete(&self, category: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM formulae WHERE category = ?")
            .bind(category)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Formula", category));
        }
        Ok(())
    }

    /// Counts stored formulas.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM formulae")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Derived variables
    // =========================================================================

    /// Lists derived variables in evaluation order.
    pub async fn derived_variables(&self) -> DbResult<Vec<DerivedVariable>> {
        let vars = sqlx::query_as::<_, DerivedVariable>(
            "SELECT name, expression FROM derived_variables ORDER BY sort_order, name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(vars)
    }

    /// Inserts or replaces a derived variable.
    pub async fn upsert_derived(&self, var: &DerivedVariable, sort_order: i64) -> DbResult<()> {
        debug!(name = %var.name, "Upserting derived variable");

        sqlx::query(
            r#"
            INSERT INTO derived_variables (name, expression, sort_order)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                expression = excluded.expression,
                sort_order = excluded.sort_order
            "#,
        )
        .bind(&var.name)
        .bind(&var.expression)
        .bind(sort_order)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};

    use super::*;

    fn rule(category: &str, equation: &str, colour: bool) -> FormulaRule {
        FormulaRule {
            category: category.to_string(),
            equation: equation.to_string(),
            default_wastage_factor: 1.0,
            is_colour_variant: colour,
        }
    }

    #[tokio::test]
    async fn test_list_follows_sort_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.formulas();

        repo.upsert(&rule("Caps", "RidgesHipsLength_ft / 25", true), 2)
            .await
            .unwrap();
        repo.upsert(&rule("Shingles", "TotalRoofArea_sqft / 100 * 3", true), 1)
            .await
            .unwrap();
        repo.upsert(&rule("Back Roof Vent", "Number_of_Vents", false), 3)
            .await
            .unwrap();

        let categories: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.category)
            .collect();
        assert_eq!(categories, ["Shingles", "Caps", "Back Roof Vent"]);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_upsert_replaces_equation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.formulas();

        repo.upsert(&rule("Caps", "1", true), 0).await.unwrap();
        repo.upsert(&rule("Caps", "2", true), 0).await.unwrap();

        let caps = repo.get("Caps").await.unwrap();
        assert_eq!(caps.equation, "2");
        assert!(caps.is_colour_variant);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.formulas().get("Gutters").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_migration_seeds_builtin_derived_variable() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let vars = db.formulas().derived_variables().await.unwrap();
        assert_eq!(vars, DerivedVariable::builtin());
    }
}
