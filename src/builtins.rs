use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::value::Value;

/*
Arity checking is done in the interpreter prior to calling a builtin function.
*/

/// Wall-clock seconds since the Unix epoch.
pub fn clock(_interp: &mut Interpreter, _args: &[Value]) -> Result<Value, RuntimeError> {
    let since_the_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| RuntimeError::Native {
            name: "clock".to_string(),
            message: err.to_string(),
        })?;

    Ok(Value::Number(since_the_epoch.as_secs_f64()))
}
