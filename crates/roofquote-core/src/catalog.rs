//! # Catalog
//!
//! Read access to formulas, wastage rules, derived variables and products,
//! plus unique product resolution.
//!
//! ## Snapshot Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  SQLite catalog ──(async load, timeout, retry)──► CatalogSnapshot       │
//! │                    roofquote-db / quote-api          │                  │
//! │                                                      │ Arc, read-only   │
//! │                                 ┌────────────────────┼────────────┐     │
//! │                                 ▼                    ▼            ▼     │
//! │                             request 1            request 2   request N  │
//! │                                                                         │
//! │  The pipeline only reads; concurrent requests share one snapshot        │
//! │  without locks.                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Products are keyed by (category, supplier) and additionally by colour for
//! colour-variant categories. The store does not enforce uniqueness of that
//! key; [`resolve_product`] does, and reports duplicates instead of picking
//! one.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::{CoreError, CoreResult};
use crate::expr::Expression;
use crate::types::{fields, DerivedVariable, FormulaRule, ProductRecord, WastageRule};
use crate::wastage::{check_wastage_variables, wastage_variable_name};
use crate::{PIPE_BOOTS_VARIABLE, VENTS_VARIABLE};

// =============================================================================
// Catalog Reader
// =============================================================================

/// Lookup key for a catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    pub category: String,
    pub supplier: String,
    /// `Some` only for colour-variant categories.
    pub colour: Option<String>,
}

impl ProductQuery {
    pub fn new(category: impl Into<String>, supplier: impl Into<String>) -> Self {
        ProductQuery {
            category: category.into(),
            supplier: supplier.into(),
            colour: None,
        }
    }

    pub fn with_colour(mut self, colour: impl Into<String>) -> Self {
        self.colour = Some(colour.into());
        self
    }

    /// Whether `product` satisfies this key.
    pub fn matches(&self, product: &ProductRecord) -> bool {
        product.category == self.category
            && product.supplier == self.supplier
            && match &self.colour {
                Some(colour) => product.colour.as_deref() == Some(colour.as_str()),
                None => true,
            }
    }
}

/// Read-only access to the catalog.
///
/// Implemented by [`CatalogSnapshot`]; tests implement it directly when
/// they need a catalog that fails.
pub trait CatalogReader {
    /// All formula rules, in catalog order.
    fn formula_rules(&self) -> CoreResult<Vec<FormulaRule>>;

    /// Wastage rules for `category`, ascending id.
    fn wastage_rules(&self, category: &str) -> CoreResult<Vec<WastageRule>>;

    /// Every product matching `query`. Uniqueness is checked by the caller.
    fn products(&self, query: &ProductQuery) -> CoreResult<Vec<ProductRecord>>;

    /// Derived totals, evaluated in order before any rule runs.
    fn derived_variables(&self) -> CoreResult<Vec<DerivedVariable>> {
        Ok(DerivedVariable::builtin())
    }
}

/// Resolves exactly one product for `query`.
///
/// ## Errors
/// - [`CoreError::ProductNotFound`] when nothing matches
/// - [`CoreError::AmbiguousProduct`] when more than one row matches
pub fn resolve_product<C>(catalog: &C, query: &ProductQuery) -> CoreResult<ProductRecord>
where
    C: CatalogReader + ?Sized,
{
    let mut matches = catalog.products(query)?;

    match matches.len() {
        0 => Err(CoreError::ProductNotFound {
            category: query.category.clone(),
            supplier: query.supplier.clone(),
            colour: query.colour.clone(),
        }),
        1 => Ok(matches.remove(0)),
        n => Err(CoreError::AmbiguousProduct {
            category: query.category.clone(),
            supplier: query.supplier.clone(),
            colour: query.colour.clone(),
            matches: n,
        }),
    }
}

// =============================================================================
// Catalog Snapshot
// =============================================================================

/// An immutable in-memory copy of the catalog for one supplier (or all).
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    formulas: Vec<FormulaRule>,
    wastage: IndexMap<String, Vec<WastageRule>>,
    products: Vec<ProductRecord>,
    derived: Vec<DerivedVariable>,
}

impl CatalogSnapshot {
    /// Builds a snapshot.
    ///
    /// Wastage rules are grouped per category and sorted by id. An empty
    /// `derived` list falls back to [`DerivedVariable::builtin`].
    ///
    /// ## Errors
    /// - [`CoreError::DuplicateFormula`] if two formulas share a category
    /// - [`CoreError::WastageVariableCollision`] if two categories would bind
    ///   the same wastage variable
    pub fn new(
        formulas: Vec<FormulaRule>,
        wastage_rules: Vec<WastageRule>,
        products: Vec<ProductRecord>,
        derived: Vec<DerivedVariable>,
    ) -> CoreResult<Self> {
        let mut seen = HashSet::new();
        for formula in &formulas {
            if !seen.insert(formula.category.as_str()) {
                return Err(CoreError::DuplicateFormula(formula.category.clone()));
            }
        }
        check_wastage_variables(&formulas)?;

        let mut wastage: IndexMap<String, Vec<WastageRule>> = IndexMap::new();
        for rule in wastage_rules {
            wastage.entry(rule.category.clone()).or_default().push(rule);
        }
        for rules in wastage.values_mut() {
            rules.sort_by_key(|r| r.id);
        }

        let derived = if derived.is_empty() {
            DerivedVariable::builtin()
        } else {
            derived
        };

        Ok(CatalogSnapshot {
            formulas,
            wastage,
            products,
            derived,
        })
    }

    pub fn formula_count(&self) -> usize {
        self.formulas.len()
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    /// Looks up the formula for `category`.
    pub fn formula(&self, category: &str) -> Option<&FormulaRule> {
        self.formulas.iter().find(|f| f.category == category)
    }
}

impl CatalogReader for CatalogSnapshot {
    fn formula_rules(&self) -> CoreResult<Vec<FormulaRule>> {
        Ok(self.formulas.clone())
    }

    fn wastage_rules(&self, category: &str) -> CoreResult<Vec<WastageRule>> {
        Ok(self.wastage.get(category).cloned().unwrap_or_default())
    }

    fn products(&self, query: &ProductQuery) -> CoreResult<Vec<ProductRecord>> {
        Ok(self
            .products
            .iter()
            .filter(|p| query.matches(p))
            .cloned()
            .collect())
    }

    fn derived_variables(&self) -> CoreResult<Vec<DerivedVariable>> {
        Ok(self.derived.clone())
    }
}

// =============================================================================
// Catalog Lint
// =============================================================================

/// A problem found in stored expressions before any request runs.
#[derive(Debug, Clone, PartialEq)]
pub struct LintIssue {
    /// Which row (`formula for Shingles`, `wastage rule 3 for Shingles`).
    pub subject: String,
    pub expression: String,
    pub problem: String,
}

/// Checks that every stored expression parses and only names variables the
/// pipeline binds: measurement fields, counts, derived variables (earlier
/// ones only, for derived variables) and wastage variables.
pub fn lint<C>(catalog: &C) -> CoreResult<Vec<LintIssue>>
where
    C: CatalogReader + ?Sized,
{
    let formulas = catalog.formula_rules()?;
    let derived = catalog.derived_variables()?;
    let mut issues = Vec::new();

    let mut known: HashSet<String> = fields::LENGTHS
        .iter()
        .chain(std::iter::once(&fields::TOTAL_ROOF_AREA))
        .map(|s| s.to_string())
        .collect();

    for variable in &derived {
        check(
            &format!("derived variable {}", variable.name),
            &variable.expression,
            &known,
            &mut issues,
        );
        known.insert(variable.name.clone());
    }

    let condition_scope = known.clone();
    for formula in &formulas {
        for rule in catalog.wastage_rules(&formula.category)? {
            check(
                &format!("wastage rule {} for {}", rule.id, formula.category),
                &rule.condition,
                &condition_scope,
                &mut issues,
            );
        }
    }

    if let Err(CoreError::WastageVariableCollision {
        variable,
        first,
        second,
    }) = check_wastage_variables(&formulas)
    {
        issues.push(LintIssue {
            subject: format!("formula for {}", second),
            expression: variable.clone(),
            problem: format!("wastage variable '{}' is also bound by '{}'", variable, first),
        });
    }

    known.insert(VENTS_VARIABLE.to_string());
    known.insert(PIPE_BOOTS_VARIABLE.to_string());
    for formula in &formulas {
        known.insert(wastage_variable_name(&formula.category));
    }
    for formula in &formulas {
        check(
            &format!("formula for {}", formula.category),
            &formula.equation,
            &known,
            &mut issues,
        );
    }

    Ok(issues)
}

fn check(subject: &str, source: &str, known: &HashSet<String>, issues: &mut Vec<LintIssue>) {
    let issue = |problem: String| LintIssue {
        subject: subject.to_string(),
        expression: source.to_string(),
        problem,
    };

    match Expression::parse(source) {
        Err(e) => issues.push(issue(e.to_string())),
        Ok(expr) => {
            for name in expr.variables() {
                if !known.contains(name) {
                    issues.push(issue(format!("unknown variable '{}'", name)));
                }
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, category: &str, supplier: &str, colour: Option<&str>) -> ProductRecord {
        ProductRecord {
            product_id: id.to_string(),
            description: format!("{} product", category),
            unit: "EA".to_string(),
            category: category.to_string(),
            unit_price: 10.0,
            supplier: supplier.to_string(),
            colour: colour.map(str::to_string),
        }
    }

    fn formula(category: &str, equation: &str) -> FormulaRule {
        FormulaRule {
            category: category.to_string(),
            equation: equation.to_string(),
            default_wastage_factor: 1.0,
            is_colour_variant: false,
        }
    }

    fn snapshot(products: Vec<ProductRecord>) -> CatalogSnapshot {
        CatalogSnapshot::new(vec![], vec![], products, vec![]).unwrap()
    }

    #[test]
    fn test_resolve_unique_product() {
        let catalog = snapshot(vec![
            product("SH-CH", "Shingles", "Roof Master", Some("Charcoal")),
            product("SH-HI", "Shingles", "Roof Master", Some("Hickory")),
            product("NL-1", "Nails", "Roof Master", None),
        ]);

        let q = ProductQuery::new("Shingles", "Roof Master").with_colour("Hickory");
        assert_eq!(resolve_product(&catalog, &q).unwrap().product_id, "SH-HI");

        let q = ProductQuery::new("Nails", "Roof Master");
        assert_eq!(resolve_product(&catalog, &q).unwrap().product_id, "NL-1");
    }

    #[test]
    fn test_unregistered_colour_is_not_found() {
        let catalog = snapshot(vec![product("SH-CH", "Shingles", "Roof Master", Some("Charcoal"))]);
        let q = ProductQuery::new("Shingles", "Roof Master").with_colour("Shakewood");
        assert!(matches!(
            resolve_product(&catalog, &q),
            Err(CoreError::ProductNotFound { colour: Some(c), .. }) if c == "Shakewood"
        ));
    }

    #[test]
    fn test_other_supplier_is_not_found() {
        let catalog = snapshot(vec![product("NL-1", "Nails", "Roof Master", None)]);
        let q = ProductQuery::new("Nails", "XYZ Materials");
        assert!(matches!(
            resolve_product(&catalog, &q),
            Err(CoreError::ProductNotFound { .. })
        ));
    }

    #[test]
    fn test_duplicate_rows_are_ambiguous() {
        let catalog = snapshot(vec![
            product("NL-1", "Nails", "Roof Master", None),
            product("NL-2", "Nails", "Roof Master", None),
        ]);
        let q = ProductQuery::new("Nails", "Roof Master");
        assert!(matches!(
            resolve_product(&catalog, &q),
            Err(CoreError::AmbiguousProduct { matches: 2, .. })
        ));
    }

    #[test]
    fn test_duplicate_formula_rejected() {
        let result = CatalogSnapshot::new(
            vec![formula("Nails", "1"), formula("Nails", "2")],
            vec![],
            vec![],
            vec![],
        );
        assert!(matches!(result, Err(CoreError::DuplicateFormula(c)) if c == "Nails"));
    }

    #[test]
    fn test_wastage_rules_sorted_by_id() {
        let rule = |id: i64| WastageRule {
            id,
            category: "Caps".to_string(),
            condition: "1".to_string(),
            factor: id as f64,
        };
        let catalog = CatalogSnapshot::new(vec![], vec![rule(6), rule(5)], vec![], vec![]).unwrap();
        let ids: Vec<i64> = catalog.wastage_rules("Caps").unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![5, 6]);
        assert!(catalog.wastage_rules("Nails").unwrap().is_empty());
    }

    #[test]
    fn test_empty_derived_falls_back_to_builtin() {
        let catalog = snapshot(vec![]);
        let derived = catalog.derived_variables().unwrap();
        assert_eq!(derived[0].name, "Total_Valleys_Hips_Length_ft");
    }

    #[test]
    fn test_lint_reports_unknown_variables() {
        let catalog = CatalogSnapshot::new(
            vec![
                formula("Shingles", "shingles_wastage_factor * TotalRoofArea_sqft / 100 * 3"),
                formula("Sealant", "(Number_of_Vents + Number_of_Pipe_Boots) / 2"),
                formula("Ridge Vent", "RidgeLength_ft / 4"),
                formula("Broken", "1 +"),
            ],
            vec![WastageRule {
                id: 1,
                category: "Shingles".to_string(),
                condition: "Total_Valleys_Hips_Length_ft <= 40".to_string(),
                factor: 1.16,
            }],
            vec![],
            vec![],
        )
        .unwrap();

        let issues = lint(&catalog).unwrap();
        assert_eq!(issues.len(), 2, "{:?}", issues);
        assert_eq!(issues[0].subject, "formula for Ridge Vent");
        assert!(issues[0].problem.contains("RidgeLength_ft"));
        assert_eq!(issues[1].subject, "formula for Broken");
    }

    /// A store-backed reader that hands formulas over unvalidated.
    struct RawFormulas(Vec<FormulaRule>);

    impl CatalogReader for RawFormulas {
        fn formula_rules(&self) -> CoreResult<Vec<FormulaRule>> {
            Ok(self.0.clone())
        }

        fn wastage_rules(&self, _category: &str) -> CoreResult<Vec<WastageRule>> {
            Ok(vec![])
        }

        fn products(&self, _query: &ProductQuery) -> CoreResult<Vec<ProductRecord>> {
            Ok(vec![])
        }
    }

    fn colliding_formulas() -> Vec<FormulaRule> {
        vec![
            formula("Caps", "caps_wastage_factor * 100"),
            formula("Caps/Hip and Ridge Shingles", "caps_wastage_factor * 100"),
        ]
    }

    #[test]
    fn test_colliding_wastage_variables_rejected() {
        let result = CatalogSnapshot::new(colliding_formulas(), vec![], vec![], vec![]);
        match result {
            Err(CoreError::WastageVariableCollision {
                variable,
                first,
                second,
            }) => {
                assert_eq!(variable, "caps_wastage_factor");
                assert_eq!(first, "Caps");
                assert_eq!(second, "Caps/Hip and Ridge Shingles");
            }
            other => panic!("expected collision, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_lint_reports_wastage_variable_collision() {
        let issues = lint(&RawFormulas(colliding_formulas())).unwrap();
        assert_eq!(issues.len(), 1, "{:?}", issues);
        assert_eq!(issues[0].subject, "formula for Caps/Hip and Ridge Shingles");
        assert_eq!(issues[0].expression, "caps_wastage_factor");
        assert!(issues[0].problem.contains("'Caps'"));
    }
}
