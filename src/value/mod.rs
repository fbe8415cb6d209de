pub mod environment;
pub mod functions;
pub mod native_function;
pub mod values;

pub use environment::Environment;
pub use functions::{Class, Function, Instance};
pub use native_function::{Call, NativeFn, NativeFunction};
pub use values::{Callable, Value};
