//! Tree-walking execution core for a small dynamically-typed, lexically
//! scoped language in the Lox family.
//!
//! The crate consumes syntax trees built elsewhere (see [`expr`]) together
//! with the lexical distances a resolver computed for variable uses, and runs
//! them against heap-allocated environments.

pub mod builtins;
pub mod config;
pub mod error;
pub mod expr;
pub mod gc;
pub mod interpreter;
mod stack;
pub mod value;

pub use config::Config;
pub use error::RuntimeError;
pub use interpreter::{Flow, Interpreter};
pub use value::Value;
