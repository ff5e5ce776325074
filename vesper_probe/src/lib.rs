//! Vesper Target-Memory Plumbing
//!
//! The two transport pieces a debugger session stands on: a raw
//! shared-memory byte channel to the in-target agent, and a paged read
//! cache over the target's address space.
//!
//! # Architecture
//!
//! [`RingBufferPipe`] is one half of a duplex link. A fixed memory region
//! holds two cursor words and a circular byte buffer; the agent maps the
//! same region and each side writes one pipe and reads the other. Cursor
//! stores are the only synchronization, so a pipe is strictly
//! single-producer, single-consumer.
//!
//! [`PagedReadCache`] sits above a [`RemoteMemory`] implementation (a
//! ptrace handle, a mapped core file, a test image) and turns scattered
//! small reads into whole-page fetches. Pages stale out by epoch: resume
//! the target, bump the epoch, and every cached byte quietly expires
//! without a single page being touched until it is next read. Page
//! buffers come out of a shared [`BufferPool`] until its budget runs out.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use vesper_probe::{BufferPool, PagedReadCache};
//!
//! let pool = Arc::new(BufferPool::new(64, 4096));
//! let mut cache = PagedReadCache::new(ptrace_handle, pool);
//!
//! let header = cache.read_u64(object_base)?;
//! // ... target resumes, stops again ...
//! cache.bump_epoch();
//! let header = cache.read_u64(object_base)?; // re-fetched
//! ```
//!
//! # Thread Safety
//!
//! A cache takes `&mut self` for every read: one session thread owns it.
//! A pipe may move between threads but never be shared; the two ends of a
//! cross-process link each hold their own view of the region.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod page;
pub mod pipe;
pub mod pool;
pub mod remote;

// Re-exports for convenient access
pub use cache::{CacheStats, PagedReadCache};
pub use page::Page;
pub use pipe::{PipeError, RingBufferPipe, HEADER_BYTES};
pub use pool::BufferPool;
pub use remote::{RemoteMemory, RemoteReadError};
