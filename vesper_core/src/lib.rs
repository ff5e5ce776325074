//! Vesper Core Primitives
//!
//! Small, dependency-free building blocks shared by the runtime crates:
//! machine-word constants, alignment arithmetic, and the identifier
//! newtypes that cross crate boundaries (thread ids, class ids).
//!
//! Everything here is `const`-evaluable and allocation-free so it can be
//! used from GC critical sections and lock fast paths.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ids;
pub mod mem;

// Re-exports for convenient access
pub use ids::{ClassId, VmThreadId};
pub use mem::{align_down, align_up, is_aligned, is_word_aligned, WORD_BITS, WORD_SIZE};
