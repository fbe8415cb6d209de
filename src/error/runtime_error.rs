use thiserror::Error;

use crate::expr::Token;

/// Faults raised while evaluating a program. Any of them aborts the current
/// `interpret` call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Undefined variable '{}'.", .name.lexeme)]
    UndefinedVariable { name: Token },

    #[error("Undefined property '{}'.", .name.lexeme)]
    UndefinedProperty { name: Token },

    #[error("{message}")]
    TypeError { token: Token, message: String },

    #[error("Expected {expected} arguments but got {found}.")]
    Arity {
        token: Token,
        expected: usize,
        found: usize,
    },

    #[error("Stack overflow.")]
    StackOverflow { token: Token },

    #[error("{name}: {message}")]
    Native { name: String, message: String },
}

impl RuntimeError {
    pub fn type_error(token: &Token, message: impl Into<String>) -> RuntimeError {
        RuntimeError::TypeError {
            token: token.clone(),
            message: message.into(),
        }
    }

    /// The token the fault is attributed to. Native failures have none.
    pub fn token(&self) -> Option<&Token> {
        match self {
            RuntimeError::UndefinedVariable { name } => Some(name),
            RuntimeError::UndefinedProperty { name } => Some(name),
            RuntimeError::TypeError { token, .. } => Some(token),
            RuntimeError::Arity { token, .. } => Some(token),
            RuntimeError::StackOverflow { token } => Some(token),
            RuntimeError::Native { .. } => None,
        }
    }

    pub fn line(&self) -> Option<usize> {
        self.token().map(|token| token.line)
    }
}
