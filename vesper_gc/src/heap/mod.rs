//! Managed heap memory.
//!
//! A space is one contiguous region plus a free-space manager tracking its
//! dead memory. Dead memory is self-describing: free chunks and dark
//! matter carry headers in the memory itself, so walkers parse the region
//! linearly without side tables.

pub mod free_chunk;

mod free_space;
mod region;

pub use free_space::{FreeSpaceManager, RetireKind};
pub use region::{HeapRegion, REGION_ALIGNMENT};
