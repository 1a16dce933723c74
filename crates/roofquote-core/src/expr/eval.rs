//! Tree-walking evaluator.

use super::parser::{BinaryOp, CompareOp, Expr, LogicalOp};
use super::{Environment, ExprError, Value};

pub(crate) fn evaluate(expr: &Expr, env: &Environment) -> Result<Value, ExprError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),

        Expr::Variable(name) => env
            .get(name)
            .map(Value::Number)
            .ok_or_else(|| ExprError::UnknownVariable { name: name.clone() }),

        Expr::Negate(inner) => {
            let value = number(evaluate(inner, env)?, "-")?;
            Ok(Value::Number(-value))
        }

        Expr::Binary { op, left, right } => {
            let symbol = binary_symbol(*op);
            let l = number(evaluate(left, env)?, symbol)?;
            let r = number(evaluate(right, env)?, symbol)?;
            let result = match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => {
                    if r == 0.0 {
                        return Err(ExprError::DivisionByZero);
                    }
                    l / r
                }
            };
            if !result.is_finite() {
                return Err(ExprError::invalid(format!(
                    "{} {} {} is not a finite number",
                    l, symbol, r
                )));
            }
            Ok(Value::Number(result))
        }

        Expr::Compare { first, rest } => {
            let mut left = evaluate(first, env)?;
            for (op, operand) in rest {
                let right = evaluate(operand, env)?;
                if !compare(*op, left, right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }

        Expr::Logical { op, left, right } => {
            let l = evaluate(left, env)?.is_truthy();
            let result = match op {
                LogicalOp::And => l && evaluate(right, env)?.is_truthy(),
                LogicalOp::Or => l || evaluate(right, env)?.is_truthy(),
            };
            Ok(Value::Bool(result))
        }
    }
}

fn number(value: Value, operator: &str) -> Result<f64, ExprError> {
    match value {
        Value::Number(n) => Ok(n),
        other => Err(ExprError::invalid(format!(
            "operator '{}' needs a number, got {}",
            operator,
            other.type_name()
        ))),
    }
}

fn compare(op: CompareOp, left: Value, right: Value) -> Result<bool, ExprError> {
    match (op, left, right) {
        (CompareOp::Eq, Value::Bool(a), Value::Bool(b)) => Ok(a == b),
        (CompareOp::Ne, Value::Bool(a), Value::Bool(b)) => Ok(a != b),
        (op, Value::Number(a), Value::Number(b)) => Ok(match op {
            CompareOp::Lt => a < b,
            CompareOp::Le => a <= b,
            CompareOp::Gt => a > b,
            CompareOp::Ge => a >= b,
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
        }),
        (op, l, r) => Err(ExprError::invalid(format!(
            "cannot compare {} {} {}",
            l.type_name(),
            compare_symbol(op),
            r.type_name()
        ))),
    }
}

fn binary_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
    }
}

fn compare_symbol(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
        CompareOp::Eq => "==",
        CompareOp::Ne => "!=",
    }
}
