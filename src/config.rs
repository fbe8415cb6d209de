use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_CALL_DEPTH: usize = 255;
pub const DEFAULT_GC_TRIGGER: usize = 1 << 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Calls deeper than this fail with a stack overflow fault.
    pub max_call_depth: usize,
    /// Collect printed lines instead of writing them to stdout.
    pub capture_output: bool,
    /// Heap allocations between two collections.
    pub gc_trigger: usize,
}

impl Default for Config {
    fn default() -> Config {
        let gc_trigger = std::env::var("TREELOX_GC_TRIGGER")
            .ok()
            .and_then(|env_str| env_str.parse::<usize>().ok())
            .unwrap_or(DEFAULT_GC_TRIGGER);
        Config {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            capture_output: false,
            gc_trigger,
        }
    }
}
