//! # Expression Language
//!
//! The restricted language that catalog formulas and wastage conditions are
//! written in. Stored strings are parsed into a small typed AST and walked by
//! an interpreter with a fixed operator set: nothing else can run.
//!
//! ## Grammar (lowest precedence first)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  or_expr     := and_expr ( "or" and_expr )*                             │
//! │  and_expr    := comparison ( "and" comparison )*                        │
//! │  comparison  := additive ( ("<"|"<="|">"|">="|"=="|"!=") additive )*    │
//! │  additive    := term ( ("+"|"-") term )*                                │
//! │  term        := unary ( ("*"|"/") unary )*                              │
//! │  unary       := "-" unary | primary                                     │
//! │  primary     := NUMBER | IDENT | "(" or_expr ")"                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Comparisons chain the way they read: `0 < x <= 40` means
//! `0 < x and x <= 40`, with `x` evaluated once.
//!
//! ## Values
//! Numbers (`f64`) and booleans. `and`/`or` short-circuit, treat a non-zero
//! number as true, and always yield a boolean.
//!
//! ## Example
//! ```rust
//! use roofquote_core::expr::{Environment, Expression, Value};
//!
//! let condition = Expression::parse(
//!     "ValleysLength_ft > 0 and HipsLength_ft > 0 and Total_Valleys_Hips_Length_ft <= 40",
//! ).unwrap();
//!
//! let env = Environment::new()
//!     .with("ValleysLength_ft", 22.0)
//!     .with("HipsLength_ft", 14.0)
//!     .with("Total_Valleys_Hips_Length_ft", 36.0);
//!
//! assert_eq!(condition.evaluate(&env).unwrap(), Value::Bool(true));
//! ```

mod eval;
mod lexer;
mod parser;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub use parser::{BinaryOp, CompareOp, Expr, LogicalOp};

/// Longest expression source accepted, in bytes.
pub const MAX_SOURCE_LEN: usize = 4096;

/// Deepest nesting of parentheses / unary operators accepted.
pub const MAX_DEPTH: usize = 64;

// =============================================================================
// Errors
// =============================================================================

/// Expression lexing, parsing and evaluation failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// The expression names a variable the environment does not bind.
    #[error("unknown variable '{name}'")]
    UnknownVariable { name: String },

    /// A division whose right-hand side evaluated to zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Anything else: syntax errors (with byte offsets), type mismatches,
    /// non-finite results, nesting or length limits.
    #[error("invalid expression: {reason}")]
    InvalidExpression { reason: String },
}

impl ExprError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        ExprError::InvalidExpression {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Values & Environment
// =============================================================================

/// Result of evaluating an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
}

impl Value {
    /// Boolean view: a bool as-is, a number when non-zero.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
        }
    }

    /// The number, if this is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(_) => None,
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Named numeric variables an expression is evaluated against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    vars: HashMap<String, f64>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style bind.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    /// Binds `name`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.vars.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.vars.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

// =============================================================================
// Expression
// =============================================================================

/// A parsed expression together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    /// Parses `source`.
    ///
    /// ## Errors
    /// [`ExprError::InvalidExpression`] for empty or oversized input, unknown
    /// characters, a lone `=`, unbalanced parentheses, trailing tokens, or
    /// nesting deeper than [`MAX_DEPTH`].
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        if source.len() > MAX_SOURCE_LEN {
            return Err(ExprError::invalid(format!(
                "expression is {} bytes, limit is {}",
                source.len(),
                MAX_SOURCE_LEN
            )));
        }

        let tokens = lexer::tokenize(source)?;
        let ast = parser::parse(&tokens, source.len())?;

        Ok(Expression {
            source: source.to_string(),
            ast,
        })
    }

    /// Evaluates against `env`.
    pub fn evaluate(&self, env: &Environment) -> Result<Value, ExprError> {
        eval::evaluate(&self.ast, env)
    }

    /// Evaluates and requires a number.
    pub fn evaluate_number(&self, env: &Environment) -> Result<f64, ExprError> {
        match self.evaluate(env)? {
            Value::Number(n) => Ok(n),
            Value::Bool(b) => Err(ExprError::invalid(format!(
                "expected a number, got boolean {}",
                b
            ))),
        }
    }

    /// Variable names referenced, in order of first appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.ast.collect_variables(&mut names);
        names
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }
}

impl FromStr for Expression {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::parse(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parses and evaluates in one step.
pub fn evaluate(source: &str, env: &Environment) -> Result<Value, ExprError> {
    Expression::parse(source)?.evaluate(env)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn num(source: &str, env: &Environment) -> f64 {
        match evaluate(source, env).unwrap() {
            Value::Number(n) => n,
            other => panic!("expected number, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let env = Environment::new();
        assert_eq!(num("1 + 2 * 3", &env), 7.0);
        assert_eq!(num("(1 + 2) * 3", &env), 9.0);
        assert_eq!(num("10 - 4 - 3", &env), 3.0);
        assert_eq!(num("12 / 3 / 2", &env), 2.0);
        assert_eq!(num("-2 * -3", &env), 6.0);
        assert_eq!(num("--4", &env), 4.0);
    }

    #[test]
    fn test_shingles_formula() {
        let env = Environment::new()
            .with("shingles_wastage_factor", 1.16)
            .with("TotalRoofArea_sqft", 2200.0);
        let n = num("shingles_wastage_factor * TotalRoofArea_sqft / 100 * 3", &env);
        assert!((n - 76.56).abs() < 1e-9);
        assert_eq!(n.ceil(), 77.0);
    }

    #[test]
    fn test_comparison_chaining() {
        let env = Environment::new().with("x", 36.0);
        assert_eq!(evaluate("0 < x <= 40", &env).unwrap(), Value::Bool(true));
        assert_eq!(evaluate("0 < x <= 30", &env).unwrap(), Value::Bool(false));
        assert_eq!(evaluate("40 < x <= 50", &env).unwrap(), Value::Bool(false));
        assert_eq!(evaluate("x == 36 != 0", &env).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_logical_short_circuit() {
        let env = Environment::new().with("x", 0.0);
        // Right side would be an unknown variable, never evaluated
        assert_eq!(evaluate("x > 0 and missing > 1", &env).unwrap(), Value::Bool(false));
        assert_eq!(evaluate("x == 0 or missing > 1", &env).unwrap(), Value::Bool(true));
        assert_eq!(
            evaluate("x > 0 or missing > 1", &env),
            Err(ExprError::UnknownVariable {
                name: "missing".to_string()
            })
        );
    }

    #[test]
    fn test_truthiness_of_numbers() {
        let env = Environment::new().with("a", 2.0).with("b", 0.0);
        assert_eq!(evaluate("a and 1", &env).unwrap(), Value::Bool(true));
        assert_eq!(evaluate("a and b", &env).unwrap(), Value::Bool(false));
        assert_eq!(evaluate("b or 0", &env).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_bool_equality() {
        let env = Environment::new().with("a", 1.0);
        assert_eq!(evaluate("(a > 0) == (a < 2)", &env).unwrap(), Value::Bool(true));
        assert_eq!(evaluate("(a > 0) != (a > 5)", &env).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_type_errors() {
        let env = Environment::new().with("a", 1.0);
        assert!(matches!(
            evaluate("(a > 0) + 1", &env),
            Err(ExprError::InvalidExpression { .. })
        ));
        assert!(matches!(
            evaluate("(a > 0) < 1", &env),
            Err(ExprError::InvalidExpression { .. })
        ));
        assert!(matches!(
            evaluate("(a > 0) == 1", &env),
            Err(ExprError::InvalidExpression { .. })
        ));
        assert!(matches!(
            evaluate("-(a > 0)", &env),
            Err(ExprError::InvalidExpression { .. })
        ));
    }

    #[test]
    fn test_division_by_zero() {
        let env = Environment::new().with("zero", 0.0);
        assert_eq!(evaluate("1 / zero", &env), Err(ExprError::DivisionByZero));
        assert_eq!(evaluate("0 / 0", &env), Err(ExprError::DivisionByZero));
    }

    #[test]
    fn test_unknown_variable() {
        assert_eq!(
            evaluate("TotalRoofArea_sqft / 100", &Environment::new()),
            Err(ExprError::UnknownVariable {
                name: "TotalRoofArea_sqft".to_string()
            })
        );
    }

    #[test]
    fn test_non_finite_result() {
        let env = Environment::new().with("big", f64::MAX);
        assert!(matches!(
            evaluate("big * 10", &env),
            Err(ExprError::InvalidExpression { .. })
        ));
    }

    #[test]
    fn test_syntax_errors() {
        let env = Environment::new().with("x", 1.0);
        for source in ["", "   ", "x +", "(x + 1", "x + 1)", "x = 1", "x ** 2", "1 2", "x $ 2", "and x"] {
            assert!(
                matches!(evaluate(source, &env), Err(ExprError::InvalidExpression { .. })),
                "{:?} should not parse",
                source
            );
        }
    }

    #[test]
    fn test_syntax_error_reports_offset() {
        let err = Expression::parse("x = 1").unwrap_err();
        assert!(err.to_string().contains("offset 2"), "{}", err);
    }

    #[test]
    fn test_nesting_limit() {
        let ok = format!("{}1{}", "(".repeat(MAX_DEPTH - 1), ")".repeat(MAX_DEPTH - 1));
        assert!(Expression::parse(&ok).is_ok());

        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(matches!(
            Expression::parse(&deep),
            Err(ExprError::InvalidExpression { .. })
        ));

        let negations = format!("{}1", "-".repeat(MAX_DEPTH + 1));
        assert!(Expression::parse(&negations).is_err());
    }

    #[test]
    fn test_length_limit() {
        let long = format!("1{}", " + 1".repeat(MAX_SOURCE_LEN / 4));
        assert!(matches!(
            Expression::parse(&long),
            Err(ExprError::InvalidExpression { .. })
        ));
    }

    #[test]
    fn test_variables_in_first_appearance_order() {
        let expr =
            Expression::parse("(ValleysLength_ft + EavesLength_ft) / 65 + ValleysLength_ft").unwrap();
        assert_eq!(expr.variables(), vec!["ValleysLength_ft", "EavesLength_ft"]);
    }

    #[test]
    fn test_display_keeps_source() {
        let expr: Expression = "HipsLength_ft == 0".parse().unwrap();
        assert_eq!(expr.to_string(), "HipsLength_ft == 0");
    }
}
