//! Budgeted pool of page buffers.
//!
//! The probe caps how much memory page caching may pin by pre-allocating
//! a fixed budget of page-sized buffers up front. Caches draw from the
//! pool first and fall back to independent heap buffers once the budget
//! is spent; the fallback is observable in cache statistics but behaves
//! identically. Buffers never return mid-flight: a page keeps its buffer
//! until its cache is torn down.

use parking_lot::Mutex;

/// Pre-allocated supply of page buffers, shared between caches.
pub struct BufferPool {
    /// Buffers awaiting hand-out.
    free: Mutex<Vec<Vec<u8>>>,
    /// Size of every buffer, in bytes.
    buffer_size: usize,
    /// Number of buffers allocated up front.
    budget: usize,
}

impl BufferPool {
    /// Allocate `budget` zeroed buffers of `buffer_size` bytes each.
    ///
    /// A zero budget is valid and makes every acquisition miss, which is
    /// the pool-less configuration for out-of-process targets.
    pub fn new(budget: usize, buffer_size: usize) -> Self {
        assert!(buffer_size > 0, "page buffers cannot be empty");
        let free = (0..budget).map(|_| vec![0u8; buffer_size]).collect();
        Self {
            free: Mutex::new(free),
            buffer_size,
            budget,
        }
    }

    /// Take a buffer, or `None` once the budget is exhausted.
    pub fn acquire(&self) -> Option<Vec<u8>> {
        self.free.lock().pop()
    }

    /// Buffers still available.
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }

    /// The fixed size of every buffer this pool hands out.
    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// The number of buffers allocated at construction.
    #[inline]
    pub fn budget(&self) -> usize {
        self.budget
    }
}
