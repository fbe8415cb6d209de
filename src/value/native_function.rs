use std::fmt;

use super::values::Value;
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;

pub type NativeFn = fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub callable: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

// Identity is the host function itself; re-registering a name with a
// different function yields a distinct value.
impl PartialEq for NativeFunction {
    fn eq(&self, other: &NativeFunction) -> bool {
        self.name == other.name
            && self.arity == other.arity
            && std::ptr::fn_addr_eq(self.callable, other.callable)
    }
}

impl Call for NativeFunction {
    fn arity(&self, _interpreter: &Interpreter) -> usize {
        self.arity
    }
    fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
        (self.callable)(interpreter, args)
    }
}

/// Shared contract of everything a call expression can invoke.
///
/// `call` is only reached after the interpreter has checked that
/// `args.len() == arity()`.
pub trait Call {
    fn arity(&self, interpreter: &Interpreter) -> usize;
    fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError>;
}
