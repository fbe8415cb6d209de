use crate::error::RuntimeError;
use crate::expr::Token;
use crate::value::Value;

pub fn check_number_operand(operator: &Token, operand: &Value) -> Result<f64, RuntimeError> {
    match operand {
        Value::Number(n) => Ok(*n),
        _ => Err(RuntimeError::type_error(operator, "Operand must be a number.")),
    }
}

pub fn check_number_operands(
    operator: &Token,
    left: &Value,
    right: &Value,
) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => Ok((*l, *r)),
        _ => Err(RuntimeError::type_error(operator, "Operand must be a number.")),
    }
}

/// Integral numbers print without a fractional part. Infinities print as
/// `Infinity` and `-Infinity`.
pub fn format_number(n: f64) -> String {
    if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        return text.to_string();
    }
    format!("{}", n)
}
