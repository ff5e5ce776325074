//! Heap-space statistics.
//!
//! Tracks where every managed byte currently sits (free list, handed out,
//! dark matter) plus event counts for tuning. The byte tallies always sum
//! to at most the region size; the difference is space not yet released
//! to the manager.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics about one managed heap space.
#[derive(Debug)]
pub struct HeapSpaceStats {
    // =========================================================================
    // Byte Tallies
    // =========================================================================
    /// Bytes currently sitting on the free list.
    pub free_bytes: AtomicU64,
    /// Bytes handed out to allocators (allocations plus refills, minus
    /// retired tails).
    pub live_bytes: AtomicU64,
    /// Bytes formatted as dark matter (dead, walkable, not allocatable).
    pub dark_bytes: AtomicU64,

    // =========================================================================
    // Event Counts
    // =========================================================================
    /// Coalescing notifications fired (releases and dark split tails).
    pub coalesce_events: AtomicU64,
    /// Allocations satisfied from the free list.
    pub allocations: AtomicU64,
    /// Dead-chunk splits performed.
    pub dead_splits: AtomicU64,
    /// Refills handed to allocators.
    pub refills: AtomicU64,
    /// Tails retired as dark matter.
    pub dark_retires: AtomicU64,
    /// Tails retired back onto the free list.
    pub free_retires: AtomicU64,
}

impl HeapSpaceStats {
    /// Create new empty statistics.
    pub const fn new() -> Self {
        Self {
            free_bytes: AtomicU64::new(0),
            live_bytes: AtomicU64::new(0),
            dark_bytes: AtomicU64::new(0),
            coalesce_events: AtomicU64::new(0),
            allocations: AtomicU64::new(0),
            dead_splits: AtomicU64::new(0),
            refills: AtomicU64::new(0),
            dark_retires: AtomicU64::new(0),
            free_retires: AtomicU64::new(0),
        }
    }

    /// Record dead space released onto the free list.
    #[inline]
    pub fn record_release(&self, size: usize) {
        self.free_bytes.fetch_add(size as u64, Ordering::Relaxed);
        self.coalesce_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an allocation carved from the free list.
    #[inline]
    pub fn record_allocation(&self, granted: usize) {
        self.free_bytes.fetch_sub(granted as u64, Ordering::Relaxed);
        self.live_bytes.fetch_add(granted as u64, Ordering::Relaxed);
        self.allocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a split remainder formatted as dark matter.
    #[inline]
    pub fn record_dark_tail(&self, size: usize) {
        self.free_bytes.fetch_sub(size as u64, Ordering::Relaxed);
        self.dark_bytes.fetch_add(size as u64, Ordering::Relaxed);
        self.coalesce_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dead chunk carved in two.
    #[inline]
    pub fn record_dead_split(&self) {
        self.dead_splits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a chunk handed to an allocator wholesale.
    #[inline]
    pub fn record_refill(&self, size: usize) {
        self.free_bytes.fetch_sub(size as u64, Ordering::Relaxed);
        self.live_bytes.fetch_add(size as u64, Ordering::Relaxed);
        self.refills.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an allocator tail retired as dark matter.
    #[inline]
    pub fn record_dark_retire(&self, size: usize) {
        self.live_bytes.fetch_sub(size as u64, Ordering::Relaxed);
        self.dark_bytes.fetch_add(size as u64, Ordering::Relaxed);
        self.dark_retires.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an allocator tail retired onto the free list.
    #[inline]
    pub fn record_free_retire(&self, size: usize) {
        self.live_bytes.fetch_sub(size as u64, Ordering::Relaxed);
        self.free_bytes.fetch_add(size as u64, Ordering::Relaxed);
        self.free_retires.fetch_add(1, Ordering::Relaxed);
    }

    /// Bytes accounted for by the three tallies.
    pub fn tracked_bytes(&self) -> u64 {
        self.free_bytes.load(Ordering::Relaxed)
            + self.live_bytes.load(Ordering::Relaxed)
            + self.dark_bytes.load(Ordering::Relaxed)
    }

    /// Zero the byte tallies at the start of a sweep.
    ///
    /// Event counts are cumulative and survive sweeps.
    pub fn reset_occupancy(&self) {
        self.free_bytes.store(0, Ordering::Relaxed);
        self.live_bytes.store(0, Ordering::Relaxed);
        self.dark_bytes.store(0, Ordering::Relaxed);
    }

    /// Reset all statistics.
    pub fn reset(&self) {
        self.reset_occupancy();
        self.coalesce_events.store(0, Ordering::Relaxed);
        self.allocations.store(0, Ordering::Relaxed);
        self.dead_splits.store(0, Ordering::Relaxed);
        self.refills.store(0, Ordering::Relaxed);
        self.dark_retires.store(0, Ordering::Relaxed);
        self.free_retires.store(0, Ordering::Relaxed);
    }
}

impl Default for HeapSpaceStats {
    fn default() -> Self {
        Self::new()
    }
}
