//! First-fit free-space management.
//!
//! # Design
//!
//! The free list threads through the dead memory itself: every free chunk
//! carries its size and successor in its own header (see
//! [`crate::heap::free_chunk`]), so the manager holds nothing but the head
//! address. The list stays in address order, which lets a release coalesce
//! with both neighbors in the same pass that finds its slot.
//!
//! Every boundary change fires exactly one listener notification (plus a
//! coalescing event when a split leaves a dark-matter tail), so derived
//! tables (remembered sets, first-object tables) track dead space exactly.
//!
//! # Thread Safety
//!
//! The manager is single-owner; the embedding space serializes GC and
//! allocator access. Statistics are atomic and readable concurrently.

use std::ptr::NonNull;
use std::sync::atomic::Ordering;

use vesper_core::{align_up, is_word_aligned, WORD_SIZE};

use crate::config::{ConfigError, HeapConfig};
use crate::deadspace::DeadSpaceListener;
use crate::heap::free_chunk::{self, DARK_MATTER_HEADER_BYTES, MIN_FREE_CHUNK_BYTES};
use crate::heap::region::HeapRegion;
use crate::stats::HeapSpaceStats;

/// What an allocator's retired tail becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireKind {
    /// Dark matter: walkable immediately, allocatable again only after the
    /// space re-coalesces it.
    Dead,
    /// Free chunk: may be handed to another allocator as-is.
    Free,
}

/// Address-ordered first-fit free-space manager over one region.
pub struct FreeSpaceManager<L: DeadSpaceListener> {
    /// The managed memory.
    region: HeapRegion,
    /// Receiver for dead-space boundary changes.
    listener: L,
    /// Address of the first free chunk (0 = empty list).
    head: usize,
    /// Split remainders below this size become dark matter.
    min_reclaimable: usize,
    /// Verify free-list integrity after every mutation.
    verify: bool,
    /// Byte and event accounting.
    stats: HeapSpaceStats,
}

impl<L: DeadSpaceListener> FreeSpaceManager<L> {
    /// Create a manager with default tuning.
    ///
    /// The region starts untracked; a sweep (or setup code) hands dead
    /// space to the manager through [`Self::release_dead`].
    pub fn new(region: HeapRegion, listener: L) -> Self {
        Self::from_parts(region, listener, &HeapConfig::default())
    }

    /// Create a manager with validated tuning.
    ///
    /// Only the tuning knobs are consulted here; `config.region_size` is
    /// for whoever allocates the region.
    pub fn with_config(
        region: HeapRegion,
        listener: L,
        config: &HeapConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(region, listener, config))
    }

    fn from_parts(region: HeapRegion, listener: L, config: &HeapConfig) -> Self {
        Self {
            region,
            listener,
            head: 0,
            min_reclaimable: config.min_reclaimable,
            verify: config.verify_heap,
            stats: HeapSpaceStats::new(),
        }
    }

    /// The managed region.
    #[inline]
    pub fn region(&self) -> &HeapRegion {
        &self.region
    }

    /// The registered listener.
    #[inline]
    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// Byte and event accounting for this space.
    #[inline]
    pub fn stats(&self) -> &HeapSpaceStats {
        &self.stats
    }

    /// Register `[start, start + size)` as dead space.
    ///
    /// The range enters the address-ordered free list, merging with
    /// adjacent free chunks; the listener sees one coalescing event over
    /// the merged extent, also for a lone chunk (the event means "this
    /// range now scans as a single dead unit").
    pub fn release_dead(&mut self, start: usize, size: usize) {
        self.assert_managed_range(start, size);
        assert!(
            size >= MIN_FREE_CHUNK_BYTES,
            "released range cannot hold a chunk header"
        );

        let (prev, next) = self.find_position(start);
        debug_assert_ne!(next, start, "range released twice");

        let mut merged_start = start;
        let mut merged_size = size;

        unsafe {
            let mut merged_next = next;

            if prev != 0 {
                let prev_end = prev + free_chunk::free_chunk_size(prev);
                debug_assert!(prev_end <= start, "release overlaps an earlier chunk");
                if prev_end == start {
                    merged_start = prev;
                    merged_size += free_chunk::free_chunk_size(prev);
                }
            }
            if next != 0 {
                debug_assert!(start + size <= next, "release overlaps a later chunk");
                if start + size == next {
                    merged_size += free_chunk::free_chunk_size(next);
                    merged_next = free_chunk::free_chunk_next(next);
                }
            }

            free_chunk::format_free_chunk(merged_start, merged_size, merged_next);
            if merged_start != prev {
                self.link_after(prev, merged_start);
            }
        }

        self.stats.record_release(size);
        self.listener.notify_coalescing(merged_start, merged_size);
        self.maybe_verify();
    }

    /// Allocate `size` bytes (rounded up to a word multiple) first-fit.
    ///
    /// An exact fit unlinks its chunk; a larger chunk splits, with the
    /// remainder reformatted as a free chunk. Remainders too small to
    /// track become dark matter after the allocation, and remainders too
    /// small to format at all are absorbed into it. The returned memory is
    /// not zeroed.
    pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        assert!(size > 0, "zero-size allocation");
        let request = align_up(size, WORD_SIZE);

        let mut prev = 0;
        let mut cur = self.head;
        unsafe {
            while cur != 0 {
                let chunk_size = free_chunk::free_chunk_size(cur);
                let next = free_chunk::free_chunk_next(cur);
                if chunk_size >= request {
                    return Some(self.carve(prev, cur, chunk_size, next, request));
                }
                prev = cur;
                cur = next;
            }
        }
        None
    }

    /// Split the found chunk, firing the matching events.
    unsafe fn carve(
        &mut self,
        prev: usize,
        chunk: usize,
        chunk_size: usize,
        next: usize,
        request: usize,
    ) -> NonNull<u8> {
        let end = chunk + chunk_size;
        let leftover = chunk_size - request;

        if leftover < DARK_MATTER_HEADER_BYTES {
            // Unformattable sliver; the allocation absorbs it.
            self.unlink(prev, next);
            self.listener.notify_split_live(chunk, chunk_size, end);
            self.stats.record_allocation(chunk_size);
        } else if leftover < self.min_reclaimable {
            self.unlink(prev, next);
            free_chunk::format_dark_matter(chunk + request, leftover);
            self.listener.notify_split_live(chunk, request, end);
            self.listener.notify_coalescing(chunk + request, leftover);
            self.stats.record_allocation(request);
            self.stats.record_dark_tail(leftover);
        } else {
            let remainder = chunk + request;
            free_chunk::format_free_chunk(remainder, leftover, next);
            self.link_after(prev, remainder);
            self.listener.notify_split_live(chunk, request, end);
            self.stats.record_allocation(request);
        }

        self.maybe_verify();
        NonNull::new_unchecked(chunk as *mut u8)
    }

    /// Carve the registered chunk at `start` in two; both halves stay on
    /// the free list.
    pub fn split_dead(&mut self, start: usize, left_size: usize) {
        assert!(is_word_aligned(left_size));

        unsafe {
            assert!(
                free_chunk::is_free_chunk(start),
                "split target is not a registered chunk"
            );
            debug_assert!(self.contains_chunk(start));

            let total = free_chunk::free_chunk_size(start);
            let next = free_chunk::free_chunk_next(start);
            assert!(
                left_size >= MIN_FREE_CHUNK_BYTES && total - left_size >= MIN_FREE_CHUNK_BYTES,
                "split halves must each hold a chunk header"
            );

            let right = start + left_size;
            free_chunk::format_free_chunk(start, left_size, right);
            free_chunk::format_free_chunk(right, total - left_size, next);

            self.stats.record_dead_split();
            self.listener.notify_split_dead(start, left_size, start + total);
        }

        self.maybe_verify();
    }

    /// Unlink the first chunk of at least `min_size` bytes and hand it to
    /// an allocator wholesale. Returns the chunk and its full size.
    pub fn refill(&mut self, min_size: usize) -> Option<(NonNull<u8>, usize)> {
        assert!(min_size > 0, "zero-size refill");
        let request = align_up(min_size, WORD_SIZE);

        let mut prev = 0;
        let mut cur = self.head;
        unsafe {
            while cur != 0 {
                let chunk_size = free_chunk::free_chunk_size(cur);
                let next = free_chunk::free_chunk_next(cur);
                if chunk_size >= request {
                    self.unlink(prev, next);
                    self.stats.record_refill(chunk_size);
                    self.listener.notify_refill(cur, chunk_size);
                    self.maybe_verify();
                    return Some((NonNull::new_unchecked(cur as *mut u8), chunk_size));
                }
                prev = cur;
                cur = next;
            }
        }
        None
    }

    /// Take back the unused tail of a refill or allocation.
    ///
    /// `RetireKind::Dead` formats dark matter; `RetireKind::Free` formats
    /// a chunk header and reinserts it in address order. Retired tails are
    /// not merged with neighbors; merging happens at the next sweep. A
    /// zero-size retire is a no-op.
    pub fn retire(&mut self, start: usize, size: usize, kind: RetireKind) {
        if size == 0 {
            return;
        }
        self.assert_managed_range(start, size);

        match kind {
            RetireKind::Dead => {
                assert!(
                    size >= DARK_MATTER_HEADER_BYTES,
                    "retired tail cannot hold a dark-matter header"
                );
                unsafe { free_chunk::format_dark_matter(start, size) };
                self.stats.record_dark_retire(size);
                self.listener.notify_retire_dead_space(start, size);
            }
            RetireKind::Free => {
                assert!(
                    size >= MIN_FREE_CHUNK_BYTES,
                    "retired tail cannot hold a chunk header"
                );
                let (prev, next) = self.find_position(start);
                unsafe {
                    free_chunk::format_free_chunk(start, size, next);
                    self.link_after(prev, start);
                }
                self.stats.record_free_retire(size);
                self.listener.notify_retire_free_space(start, size);
            }
        }

        self.maybe_verify();
    }

    /// Discard the free list ahead of a sweep.
    ///
    /// The sweep rebuilds dead space from scratch through
    /// [`Self::release_dead`]; byte tallies restart from zero while event
    /// counts accumulate.
    pub fn begin_sweep(&mut self) {
        self.head = 0;
        self.stats.reset_occupancy();
    }

    /// Visit every free chunk as `(start, size)`, in address order.
    pub fn for_each_free_chunk<F>(&self, mut f: F)
    where
        F: FnMut(usize, usize),
    {
        let mut cur = self.head;
        unsafe {
            while cur != 0 {
                f(cur, free_chunk::free_chunk_size(cur));
                cur = free_chunk::free_chunk_next(cur);
            }
        }
    }

    /// Number of chunks on the free list.
    pub fn free_chunk_count(&self) -> usize {
        let mut count = 0;
        self.for_each_free_chunk(|_, _| count += 1);
        count
    }

    /// Check whether `addr` is a chunk currently on the free list.
    pub fn contains_chunk(&self, addr: usize) -> bool {
        let mut found = false;
        self.for_each_free_chunk(|start, _| found |= start == addr);
        found
    }

    /// Walk the free list checking order, bounds, and the byte tally.
    ///
    /// Panics on any inconsistency; dead-space corruption must never
    /// survive the operation that caused it.
    pub fn verify_free_list(&self) {
        let mut cur = self.head;
        let mut prev_end = 0usize;
        let mut total = 0u64;

        unsafe {
            while cur != 0 {
                assert!(
                    free_chunk::is_free_chunk(cur),
                    "free-list entry without a chunk tag"
                );
                let size = free_chunk::free_chunk_size(cur);
                assert!(is_word_aligned(cur) && is_word_aligned(size));
                assert!(size >= MIN_FREE_CHUNK_BYTES);
                assert!(
                    cur >= self.region.start() && cur + size <= self.region.end(),
                    "chunk outside the managed region"
                );
                assert!(cur >= prev_end, "free list out of address order");

                prev_end = cur + size;
                total += size as u64;
                cur = free_chunk::free_chunk_next(cur);
            }
        }

        assert_eq!(
            total,
            self.stats.free_bytes.load(Ordering::Relaxed),
            "free-byte tally out of sync"
        );
    }

    #[inline]
    fn maybe_verify(&self) {
        if self.verify {
            self.verify_free_list();
        }
    }

    /// Chunks straddling `addr`: the last chunk before it and the first
    /// chunk at or after it (0 = none).
    fn find_position(&self, addr: usize) -> (usize, usize) {
        let mut prev = 0;
        let mut cur = self.head;
        unsafe {
            while cur != 0 && cur < addr {
                prev = cur;
                cur = free_chunk::free_chunk_next(cur);
            }
        }
        (prev, cur)
    }

    /// Point `prev` (or the head) at `chunk`.
    unsafe fn link_after(&mut self, prev: usize, chunk: usize) {
        if prev == 0 {
            self.head = chunk;
        } else {
            free_chunk::set_free_chunk_next(prev, chunk);
        }
    }

    /// Point `prev` (or the head) past an unlinked chunk at `next`.
    unsafe fn unlink(&mut self, prev: usize, next: usize) {
        if prev == 0 {
            self.head = next;
        } else {
            free_chunk::set_free_chunk_next(prev, next);
        }
    }

    fn assert_managed_range(&self, start: usize, size: usize) {
        assert!(
            is_word_aligned(start) && is_word_aligned(size),
            "dead-space ranges are word-aligned"
        );
        assert!(
            start >= self.region.start() && start + size <= self.region.end(),
            "range outside the managed region"
        );
    }
}
