//! Stack growth for recursive walks over syntax.
//!
//! Expression trees and class hierarchies come straight from user input, so
//! nothing bounds their depth. Every recursive walk in the linker enters
//! through [`ensure_sufficient_stack`], which moves onto a freshly allocated
//! segment when the current one runs low.

/// Remaining stack below which a new segment is allocated.
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated segment.
const SEGMENT_SIZE: usize = 1024 * 1024;

/// Run `f`, first growing the stack if less than the red zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

/// The wasm runtime owns its stack; run `f` in place.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
