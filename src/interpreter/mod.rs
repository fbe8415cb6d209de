mod treewalk_interpreter;
mod util;

pub use treewalk_interpreter::{Flow, Interpreter};
