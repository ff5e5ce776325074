//! Vesper Dead-Space Management
//!
//! Free-list heap management for a mark-sweep VM space: self-describing
//! dead memory, an address-ordered first-fit free list, and the card
//! tables that let collectors walk and scan the region while allocators
//! carve it up.
//!
//! # Architecture
//!
//! Dead memory describes itself in place. A *free chunk* is a three-word
//! header (tag, size, next) threaded onto the space's free list; *dark
//! matter* is a two-word header (tag, size) marking dead memory too small
//! to allocate from but still parseable. Between the two, a linear walk of
//! the region never needs a side table: every address is either a live
//! cell or the start of a tagged dead unit.
//!
//! [`FreeSpaceManager`] owns one [`HeapRegion`] and mutates dead space
//! through five operations (release, allocate, split, refill, retire).
//! Each boundary change fires a [`DeadSpaceListener`] event, and
//! [`CardTableRemSet`] implements the listener to keep a [`CardTable`] and
//! a [`CardFirstObjectTable`] exact: after any event, the cell overlapping
//! any card's first word can still be found, which is what lets minor
//! collections scan only dirty cards.
//!
//! # Usage
//!
//! ```ignore
//! use vesper_gc::{FreeSpaceManager, HeapRegion, CardTableRemSet};
//!
//! let region = HeapRegion::new(16 * 1024 * 1024).expect("region");
//! let rset = CardTableRemSet::new(region.start(), region.size());
//! let mut space = FreeSpaceManager::new(region, rset);
//!
//! // A sweep releases dead ranges; allocators carve them back up.
//! space.release_dead(start, size);
//! let cell = space.allocate(64);
//! ```
//!
//! # Thread Safety
//!
//! The free-space manager is single-owner; the embedding space serializes
//! collector and allocator access to it. The card tables it notifies are
//! atomic and safely shared with running mutators.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod deadspace;
pub mod heap;
pub mod rset;

mod stats;

// Re-exports for convenient access
pub use config::{ConfigError, HeapConfig};
pub use deadspace::{DeadSpaceListener, NullDeadSpaceListener};
pub use heap::free_chunk::{
    DARK_MATTER_HEADER_BYTES, FREE_CHUNK_HEADER_BYTES, MIN_FREE_CHUNK_BYTES,
};
pub use heap::{FreeSpaceManager, HeapRegion, RetireKind, REGION_ALIGNMENT};
pub use rset::{CardFirstObjectTable, CardTable, CardTableRemSet, CARD_SIZE, LOG2_CARD_SIZE};
pub use stats::HeapSpaceStats;
