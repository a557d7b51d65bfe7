//! Stack growth guard for deep recursion.
//!
//! The lowering visitor, the codec scheduler and the evaluator all recurse
//! over trees whose depth is controlled by user code: a method with a few
//! thousand nested conditionals is legal input. Each recursive entry point
//! wraps its body in [`ensure_sufficient_stack`] so that the host stack is
//! extended on demand instead of overflowing.
//!
//! - **Native targets**: delegates to `stacker::maybe_grow`.
//! - **WASM targets**: calls the closure directly.

/// Remaining stack below which a new segment is allocated (128KB).
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment (2MB).
const SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Run `f`, first growing the stack if less than the red zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

/// WASM manages its own stack; run `f` directly.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests;
