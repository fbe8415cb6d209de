//! Stack growth for the recursive evaluator.
//!
//! Every Lox call nests several host frames (`execute`, `execute_block`,
//! `interpret_expr`, `call_value`), and unoptimized builds make those frames
//! large. Without growth a recursion well under `max_call_depth` can exhaust a
//! 2 MiB thread stack before the depth check ever fires.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
