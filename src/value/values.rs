use super::native_function::NativeFunction;
use crate::expr::Literal;
use crate::gc::HeapId;

/// Runtime values. Heap-resident objects are referred to by handle, so the
/// derived `PartialEq` compares functions, classes and instances by identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
    Callable(Callable),
    Instance(HeapId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Callable {
    Native(NativeFunction),
    Function(HeapId),
    Class(HeapId),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

impl From<&Literal> for Value {
    fn from(lit: &Literal) -> Value {
        match lit {
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s.clone()),
            Literal::True => Value::Bool(true),
            Literal::False => Value::Bool(false),
            Literal::Nil => Value::Nil,
        }
    }
}
