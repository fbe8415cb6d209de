pub mod error_formatting;
pub mod runtime_error;

pub use error_formatting::{format_runtime_error, report_runtime_error, Input, Source};
pub use runtime_error::RuntimeError;
