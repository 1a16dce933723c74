//! # Wastage Resolver
//!
//! Picks the wastage multiplier for each material category.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  rules for "Shingles" (ascending id)                                    │
//! │                                                                         │
//! │   id 1  Valleys > 0 and Hips > 0 and Total <= 40   → 1.16  ◄── first    │
//! │   id 2  Valleys > 0 and Hips > 0 and Total > 40    → 1.18      truthy   │
//! │   id 3  Valleys > 0 or Hips > 0                    → 1.13      wins     │
//! │   id 4  Valleys == 0 and Hips == 0                 → 1.10               │
//! │                                                                         │
//! │   no rule true, or no rules at all                 → 1.0                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rules are evaluated against the measurement fields plus derived variables.
//! A condition that fails to parse or evaluate fails the request; it is never
//! skipped, since skipping would silently pick a later rule.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::catalog::CatalogReader;
use crate::error::{CoreError, CoreResult};
use crate::expr::{Environment, Expression};
use crate::types::{FormulaRule, WastageRule};
use crate::DEFAULT_WASTAGE_FACTOR;

/// Suffix of every wastage variable name.
const WASTAGE_SUFFIX: &str = "_wastage_factor";

/// Environment name a category's wastage factor is bound under.
///
/// ## Example
/// ```rust
/// use roofquote_core::wastage::wastage_variable_name;
///
/// assert_eq!(wastage_variable_name("Shingles"), "shingles_wastage_factor");
/// assert_eq!(wastage_variable_name("Caps/Hip and Ridge Shingles"), "caps_wastage_factor");
/// assert_eq!(wastage_variable_name("Ice & Water"), "ice_water_wastage_factor");
/// ```
pub fn wastage_variable_name(category: &str) -> String {
    let head = category.split('/').next().unwrap_or(category).to_lowercase();

    let mut name = String::with_capacity(head.len() + WASTAGE_SUFFIX.len());
    let mut pending_separator = false;
    for c in head.chars() {
        if c.is_alphanumeric() {
            if pending_separator && !name.is_empty() {
                name.push('_');
            }
            pending_separator = false;
            name.push(c);
        } else {
            pending_separator = true;
        }
    }

    name.push_str(WASTAGE_SUFFIX);
    name
}

/// Variable names claimed by more than one category, with the categories
/// that claim them (first binder, later binder), in formula order.
fn collisions(formulas: &[FormulaRule]) -> Vec<(String, &str, &str)> {
    let mut owners: HashMap<String, &str> = HashMap::new();
    let mut found = Vec::new();
    for formula in formulas {
        let variable = wastage_variable_name(&formula.category);
        match owners.get(&variable) {
            Some(owner) if *owner != formula.category => {
                found.push((variable, *owner, formula.category.as_str()));
            }
            Some(_) => {}
            None => {
                owners.insert(variable, &formula.category);
            }
        }
    }
    found
}

/// Rejects a formula set in which two categories share a wastage variable
/// (`Caps` and `Caps/Hip and Ridge Shingles` both bind `caps_wastage_factor`).
///
/// ## Errors
/// [`CoreError::WastageVariableCollision`] for the first clash found.
pub fn check_wastage_variables(formulas: &[FormulaRule]) -> CoreResult<()> {
    match collisions(formulas).into_iter().next() {
        Some((variable, first, second)) => Err(CoreError::WastageVariableCollision {
            variable,
            first: first.to_string(),
            second: second.to_string(),
        }),
        None => Ok(()),
    }
}

/// Every wastage variable more than one category would bind.
pub fn ambiguous_wastage_variables(formulas: &[FormulaRule]) -> HashSet<String> {
    collisions(formulas)
        .into_iter()
        .map(|(variable, _, _)| variable)
        .collect()
}

/// Returns the factor of the first rule whose condition is truthy.
///
/// `rules` must already be in persisted (ascending id) order, as
/// [`CatalogReader::wastage_rules`] returns them.
///
/// ## Errors
/// [`CoreError::Expression`] naming the rule id and category if a condition
/// does not parse or evaluate.
pub fn resolve_wastage(
    category: &str,
    rules: &[WastageRule],
    env: &Environment,
) -> CoreResult<f64> {
    for rule in rules {
        let subject = || format!("wastage rule {} for {}", rule.id, category);

        let condition = Expression::parse(&rule.condition)
            .map_err(|e| CoreError::expression(subject(), &rule.condition, e))?;
        let value = condition
            .evaluate(env)
            .map_err(|e| CoreError::expression(subject(), &rule.condition, e))?;

        if value.is_truthy() {
            return Ok(rule.factor);
        }
    }

    Ok(DEFAULT_WASTAGE_FACTOR)
}

/// Resolves one factor per distinct formula category, in formula order.
pub fn resolve_wastage_factors<C>(
    catalog: &C,
    formula_rules: &[FormulaRule],
    env: &Environment,
) -> CoreResult<IndexMap<String, f64>>
where
    C: CatalogReader + ?Sized,
{
    let mut factors = IndexMap::with_capacity(formula_rules.len());

    for rule in formula_rules {
        if factors.contains_key(&rule.category) {
            continue;
        }
        let rules = catalog.wastage_rules(&rule.category)?;
        let factor = resolve_wastage(&rule.category, &rules, env)?;
        factors.insert(rule.category.clone(), factor);
    }

    Ok(factors)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprError;

    fn rule(id: i64, condition: &str, factor: f64) -> WastageRule {
        WastageRule {
            id,
            category: "Shingles".to_string(),
            condition: condition.to_string(),
            factor,
        }
    }

    fn shingle_rules() -> Vec<WastageRule> {
        vec![
            rule(
                1,
                "ValleysLength_ft > 0 and HipsLength_ft > 0 and Total_Valleys_Hips_Length_ft <= 40",
                1.16,
            ),
            rule(
                2,
                "ValleysLength_ft > 0 and HipsLength_ft > 0 and Total_Valleys_Hips_Length_ft > 40",
                1.18,
            ),
            rule(3, "ValleysLength_ft > 0 or HipsLength_ft > 0", 1.13),
            rule(4, "ValleysLength_ft == 0 and HipsLength_ft == 0", 1.10),
        ]
    }

    fn env(valleys: f64, hips: f64) -> Environment {
        Environment::new()
            .with("ValleysLength_ft", valleys)
            .with("HipsLength_ft", hips)
            .with("Total_Valleys_Hips_Length_ft", valleys + hips)
    }

    #[test]
    fn test_variable_names() {
        assert_eq!(wastage_variable_name("Caps"), "caps_wastage_factor");
        assert_eq!(
            wastage_variable_name("Drip Edge/Flashings"),
            "drip_edge_wastage_factor"
        );
        assert_eq!(
            wastage_variable_name("  Ridge -- Vent "),
            "ridge_vent_wastage_factor"
        );
    }

    #[test]
    fn test_shingle_rule_table() {
        let rules = shingle_rules();
        assert_eq!(resolve_wastage("Shingles", &rules, &env(22.0, 14.0)).unwrap(), 1.16);
        assert_eq!(resolve_wastage("Shingles", &rules, &env(30.0, 14.0)).unwrap(), 1.18);
        assert_eq!(resolve_wastage("Shingles", &rules, &env(0.0, 14.0)).unwrap(), 1.13);
        assert_eq!(resolve_wastage("Shingles", &rules, &env(0.0, 0.0)).unwrap(), 1.10);
    }

    #[test]
    fn test_no_rules_is_default() {
        assert_eq!(resolve_wastage("Nails", &[], &env(1.0, 1.0)).unwrap(), 1.0);
    }

    #[test]
    fn test_no_match_is_default() {
        let rules = vec![rule(1, "HipsLength_ft > 100", 1.5)];
        assert_eq!(resolve_wastage("Shingles", &rules, &env(1.0, 1.0)).unwrap(), 1.0);
    }

    #[test]
    fn test_first_true_rule_wins() {
        let rules = vec![rule(1, "HipsLength_ft > 0", 1.2), rule(2, "HipsLength_ft > 1", 1.3)];
        assert_eq!(resolve_wastage("Caps", &rules, &env(0.0, 5.0)).unwrap(), 1.2);

        let reversed = vec![rule(2, "HipsLength_ft > 1", 1.3), rule(1, "HipsLength_ft > 0", 1.2)];
        assert_eq!(resolve_wastage("Caps", &reversed, &env(0.0, 5.0)).unwrap(), 1.3);
    }

    #[test]
    fn test_bad_condition_names_rule() {
        let rules = vec![rule(7, "Pitch > 6", 1.4)];
        let err = resolve_wastage("Shingles", &rules, &env(1.0, 1.0)).unwrap_err();
        match err {
            CoreError::Expression {
                subject,
                expression,
                source,
            } => {
                assert_eq!(subject, "wastage rule 7 for Shingles");
                assert_eq!(expression, "Pitch > 6");
                assert_eq!(
                    source,
                    ExprError::UnknownVariable {
                        name: "Pitch".to_string()
                    }
                );
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_unparsable_condition_fails() {
        let rules = vec![rule(1, "HipsLength_ft = 0", 1.1)];
        assert!(matches!(
            resolve_wastage("Shingles", &rules, &env(0.0, 0.0)),
            Err(CoreError::Expression { .. })
        ));
    }

    fn formula(category: &str) -> FormulaRule {
        FormulaRule {
            category: category.to_string(),
            equation: "1".to_string(),
            default_wastage_factor: 1.0,
            is_colour_variant: false,
        }
    }

    #[test]
    fn test_colliding_wastage_variables_rejected() {
        let formulas = vec![
            formula("Caps"),
            formula("Shingles"),
            formula("Caps/Hip and Ridge Shingles"),
        ];

        match check_wastage_variables(&formulas) {
            Err(CoreError::WastageVariableCollision {
                variable,
                first,
                second,
            }) => {
                assert_eq!(variable, "caps_wastage_factor");
                assert_eq!(first, "Caps");
                assert_eq!(second, "Caps/Hip and Ridge Shingles");
            }
            other => panic!("expected collision, got {:?}", other),
        }

        let ambiguous = ambiguous_wastage_variables(&formulas);
        assert_eq!(ambiguous.len(), 1);
        assert!(ambiguous.contains("caps_wastage_factor"));
    }

    #[test]
    fn test_distinct_wastage_variables_accepted() {
        let formulas = vec![formula("Shingles"), formula("Caps/Hip and Ridge Shingles")];
        assert!(check_wastage_variables(&formulas).is_ok());
        assert!(ambiguous_wastage_variables(&formulas).is_empty());
    }
}
