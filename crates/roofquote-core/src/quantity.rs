//! # Quantity Calculator
//!
//! Evaluates every category formula and rounds the result up to a whole
//! number of units.
//!
//! ## Environment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  measurement fields   TotalRoofArea_sqft, HipsLength_ft, ...            │
//! │  derived variables    Total_Valleys_Hips_Length_ft, ...                 │
//! │  counts               Number_of_Vents, Number_of_Pipe_Boots             │
//! │  wastage factors      shingles_wastage_factor, caps_wastage_factor, ... │
//! │                       (1.0 for categories without a resolved factor)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every category gets its own tagged outcome. A failure in one category does
//! not stop the others from being evaluated, which lets operators see every
//! broken formula at once; [`QuantityReport::into_quantities`] then refuses
//! to hand out a partial map.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{CoreError, CoreResult};
use crate::expr::{Environment, ExprError, Expression, Value};
use crate::types::{Counts, DerivedVariable, FormulaRule, Measurement};
use crate::wastage::{ambiguous_wastage_variables, wastage_variable_name};
use crate::{DEFAULT_WASTAGE_FACTOR, PIPE_BOOTS_VARIABLE, VENTS_VARIABLE};

/// Category → whole-unit quantity, in formula order. Quantities may be zero
/// or negative; they are carried through to the invoice unchanged.
pub type QuantityMap = IndexMap<String, i64>;

// =============================================================================
// Report Types
// =============================================================================

/// Why a category has no quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaFailure {
    pub category: String,
    pub expression: String,
    pub error: ExprError,
}

impl fmt::Display for FormulaFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "formula for {} failed: {} (expression: `{}`)",
            self.category, self.error, self.expression
        )
    }
}

/// Per-category outcome of a quantity run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuantityReport {
    pub outcomes: IndexMap<String, Result<i64, FormulaFailure>>,
}

impl QuantityReport {
    /// True when every category produced a quantity.
    pub fn is_complete(&self) -> bool {
        self.outcomes.values().all(Result::is_ok)
    }

    /// Failed categories, in formula order.
    pub fn failures(&self) -> impl Iterator<Item = &FormulaFailure> {
        self.outcomes.values().filter_map(|o| o.as_ref().err())
    }

    pub fn get(&self, category: &str) -> Option<&Result<i64, FormulaFailure>> {
        self.outcomes.get(category)
    }

    /// Converts to a [`QuantityMap`], escalating the first failure.
    pub fn into_quantities(self) -> CoreResult<QuantityMap> {
        let mut quantities = QuantityMap::with_capacity(self.outcomes.len());
        for (category, outcome) in self.outcomes {
            match outcome {
                Ok(quantity) => {
                    quantities.insert(category, quantity);
                }
                Err(failure) => {
                    return Err(CoreError::expression(
                        format!("formula for {}", failure.category),
                        failure.expression,
                        failure.error,
                    ))
                }
            }
        }
        Ok(quantities)
    }
}

// =============================================================================
// Environment Construction
// =============================================================================

/// Binds the measurement fields, then each derived variable in order.
///
/// A derived variable may reference the measurement and earlier derived
/// variables.
///
/// ## Errors
/// [`CoreError::Expression`] when a derived variable fails to evaluate or is
/// not numeric.
pub fn measurement_environment(
    measurement: &Measurement,
    derived: &[DerivedVariable],
) -> CoreResult<Environment> {
    let mut env = Environment::new();
    for (name, value) in measurement.numeric_fields() {
        env.insert(name, value);
    }

    for variable in derived {
        let subject = || format!("derived variable {}", variable.name);
        let value = Expression::parse(&variable.expression)
            .and_then(|expr| expr.evaluate_number(&env))
            .map_err(|e| CoreError::expression(subject(), &variable.expression, e))?;
        env.insert(variable.name.clone(), value);
    }

    Ok(env)
}

/// Adds counts and per-category wastage factors to a measurement environment.
///
/// A wastage variable claimed by two categories is left unbound, so any
/// formula naming it fails with `UnknownVariable` instead of reading the
/// other category's factor.
pub fn quantity_environment(
    formula_rules: &[FormulaRule],
    measurement_env: &Environment,
    counts: Counts,
    wastage_factors: &IndexMap<String, f64>,
) -> Environment {
    let mut env = measurement_env.clone();
    env.insert(VENTS_VARIABLE, f64::from(counts.number_of_vents));
    env.insert(PIPE_BOOTS_VARIABLE, f64::from(counts.number_of_pipe_boots));

    let ambiguous = ambiguous_wastage_variables(formula_rules);
    for rule in formula_rules {
        let variable = wastage_variable_name(&rule.category);
        if ambiguous.contains(&variable) {
            continue;
        }
        let factor = wastage_factors
            .get(&rule.category)
            .copied()
            .unwrap_or(DEFAULT_WASTAGE_FACTOR);
        env.insert(variable, factor);
    }

    env
}

// =============================================================================
// Calculation
// =============================================================================

/// Evaluates every formula over the measurement environment, counts and
/// wastage factors.
///
/// `measurement_env` is the result of [`measurement_environment`]; it is
/// built once per request and shared with the wastage resolver.
///
/// ## Rounding
/// `ceil`: `3.0` → 3, `3.01` → 4, `-0.5` → 0.
pub fn compute_quantities(
    formula_rules: &[FormulaRule],
    measurement_env: &Environment,
    counts: Counts,
    wastage_factors: &IndexMap<String, f64>,
) -> QuantityReport {
    let env = quantity_environment(formula_rules, measurement_env, counts, wastage_factors);

    let outcomes = formula_rules
        .iter()
        .map(|rule| {
            let outcome = evaluate_quantity(&rule.equation, &env).map_err(|error| FormulaFailure {
                category: rule.category.clone(),
                expression: rule.equation.clone(),
                error,
            });
            (rule.category.clone(), outcome)
        })
        .collect();

    QuantityReport { outcomes }
}

fn evaluate_quantity(equation: &str, env: &Environment) -> Result<i64, ExprError> {
    let value = match Expression::parse(equation)?.evaluate(env)? {
        Value::Number(n) => n,
        Value::Bool(b) => {
            return Err(ExprError::invalid(format!(
                "formula must produce a number, got boolean {}",
                b
            )))
        }
    };

    let rounded = value.ceil();
    // i64::MAX as f64 is 2^63, which is itself out of range
    if !rounded.is_finite() || rounded.abs() >= i64::MAX as f64 {
        return Err(ExprError::invalid(format!(
            "quantity {} is out of range",
            value
        )));
    }

    Ok(rounded as i64)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(category: &str, equation: &str) -> FormulaRule {
        FormulaRule {
            category: category.to_string(),
            equation: equation.to_string(),
            default_wastage_factor: 1.0,
            is_colour_variant: false,
        }
    }

    fn measurement() -> Measurement {
        Measurement {
            address: "24 Lakeside Drive".to_string(),
            total_roof_area_sqft: 2200.0,
            ridges_hips_length_ft: 46.0,
            valleys_length_ft: 22.0,
            ridges_length_ft: 32.0,
            hips_length_ft: 14.0,
            rakes_length_ft: 15.0,
            eaves_length_ft: 16.0,
            eaves_rakes_length_ft: 31.0,
            step_flashing_length_ft: 9.0,
            wall_flashing_length_ft: 10.0,
        }
    }

    fn base_env() -> Environment {
        measurement_environment(&measurement(), &DerivedVariable::builtin()).unwrap()
    }

    const COUNTS: Counts = Counts {
        number_of_vents: 2,
        number_of_pipe_boots: 3,
    };

    #[test]
    fn test_measurement_environment_binds_derived() {
        let env = base_env();
        assert_eq!(env.get("Total_Valleys_Hips_Length_ft"), Some(36.0));
        assert_eq!(env.get("TotalRoofArea_sqft"), Some(2200.0));
        assert!(!env.contains("Address"));
    }

    #[test]
    fn test_derived_may_reference_earlier_derived() {
        let derived = vec![
            DerivedVariable::new("A", "ValleysLength_ft + HipsLength_ft"),
            DerivedVariable::new("B", "A * 2"),
        ];
        let env = measurement_environment(&measurement(), &derived).unwrap();
        assert_eq!(env.get("B"), Some(72.0));

        let out_of_order = vec![DerivedVariable::new("B", "A * 2")];
        assert!(matches!(
            measurement_environment(&measurement(), &out_of_order),
            Err(CoreError::Expression { .. })
        ));
    }

    #[test]
    fn test_shingles_and_caps_quantities() {
        let rules = vec![
            rule("Shingles", "shingles_wastage_factor * TotalRoofArea_sqft / 100 * 3"),
            rule(
                "Caps/Hip and Ridge Shingles",
                "caps_wastage_factor * RidgesHipsLength_ft / 25",
            ),
        ];
        let mut factors = IndexMap::new();
        factors.insert("Shingles".to_string(), 1.16);
        factors.insert("Caps/Hip and Ridge Shingles".to_string(), 1.2);

        let quantities = compute_quantities(&rules, &base_env(), COUNTS, &factors)
            .into_quantities()
            .unwrap();
        assert_eq!(quantities["Shingles"], 77);
        assert_eq!(quantities["Caps/Hip and Ridge Shingles"], 3);
    }

    #[test]
    fn test_ceiling_rounding() {
        let rules = vec![
            rule("Exact", "3"),
            rule("Just Over", "3.01"),
            rule("Negative", "0 - 0.5"),
            rule("Counts", "(Number_of_Vents + Number_of_Pipe_Boots) / 2"),
        ];
        let q = compute_quantities(&rules, &base_env(), COUNTS, &IndexMap::new())
            .into_quantities()
            .unwrap();
        assert_eq!(q["Exact"], 3);
        assert_eq!(q["Just Over"], 4);
        assert_eq!(q["Negative"], 0);
        assert_eq!(q["Counts"], 3);
    }

    #[test]
    fn test_missing_factor_binds_default() {
        let rules = vec![rule("Nails", "nails_wastage_factor * TotalRoofArea_sqft / 1500")];
        let q = compute_quantities(&rules, &base_env(), COUNTS, &IndexMap::new())
            .into_quantities()
            .unwrap();
        assert_eq!(q["Nails"], 2);
    }

    #[test]
    fn test_order_follows_formulas() {
        let rules = vec![rule("Zeta", "1"), rule("Alpha", "2"), rule("Mid", "3")];
        let q = compute_quantities(&rules, &base_env(), COUNTS, &IndexMap::new())
            .into_quantities()
            .unwrap();
        let order: Vec<&str> = q.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_deterministic() {
        let rules = vec![
            rule("Starters", "EavesRakesLength_ft / 100"),
            rule("Ice & Water", "(ValleysLength_ft + EavesLength_ft) / 65"),
        ];
        let first = compute_quantities(&rules, &base_env(), COUNTS, &IndexMap::new());
        let second = compute_quantities(&rules, &base_env(), COUNTS, &IndexMap::new());
        assert_eq!(first, second);
    }

    #[test]
    fn test_failures_are_tagged_per_category() {
        let rules = vec![
            rule("Good", "TotalRoofArea_sqft / 1000"),
            rule("Divides", "TotalRoofArea_sqft / (HipsLength_ft - 14)"),
            rule("Boolean", "HipsLength_ft > 0"),
            rule("Unknown", "Pitch * 2"),
        ];
        let report = compute_quantities(&rules, &base_env(), COUNTS, &IndexMap::new());

        assert!(!report.is_complete());
        assert_eq!(report.get("Good"), Some(&Ok(3)));
        assert_eq!(report.failures().count(), 3);
        assert_eq!(
            report.get("Divides").unwrap().as_ref().unwrap_err().error,
            ExprError::DivisionByZero
        );
        assert!(matches!(
            report.get("Boolean").unwrap().as_ref().unwrap_err().error,
            ExprError::InvalidExpression { .. }
        ));

        match report.into_quantities() {
            Err(CoreError::Expression { subject, .. }) => {
                assert_eq!(subject, "formula for Divides")
            }
            other => panic!("expected expression error, got {:?}", other),
        }
    }

    #[test]
    fn test_colliding_wastage_variable_is_unbound() {
        let rules = vec![
            rule("Caps", "caps_wastage_factor * 100"),
            rule("Caps/Hip and Ridge Shingles", "caps_wastage_factor * 100"),
            rule("Shingles", "shingles_wastage_factor * 100"),
        ];
        let mut factors = IndexMap::new();
        factors.insert("Caps".to_string(), 1.2);
        factors.insert("Caps/Hip and Ridge Shingles".to_string(), 1.5);
        factors.insert("Shingles".to_string(), 1.25);

        let report = compute_quantities(&rules, &base_env(), COUNTS, &factors);
        let unbound = ExprError::UnknownVariable {
            name: "caps_wastage_factor".to_string(),
        };
        assert_eq!(report.get("Caps").unwrap().as_ref().unwrap_err().error, unbound);
        assert_eq!(
            report
                .get("Caps/Hip and Ridge Shingles")
                .unwrap()
                .as_ref()
                .unwrap_err()
                .error,
            unbound
        );
        assert_eq!(report.get("Shingles"), Some(&Ok(125)));
    }

    #[test]
    fn test_quantity_of_two_pow_63_is_out_of_range() {
        let rules = vec![
            rule("Edge", "4611686018427387904 * 2"),
            rule("Fits", "4611686018427387904"),
        ];
        let report = compute_quantities(&rules, &base_env(), COUNTS, &IndexMap::new());

        assert!(matches!(
            report.get("Edge").unwrap().as_ref().unwrap_err().error,
            ExprError::InvalidExpression { .. }
        ));
        assert_eq!(report.get("Fits"), Some(&Ok(4_611_686_018_427_387_904)));
    }
}
