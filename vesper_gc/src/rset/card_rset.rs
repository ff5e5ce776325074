//! Card-table remembered set.
//!
//! Combines the dirty-card table with the first-object table and keeps
//! both coherent with the free-space manager by implementing
//! [`DeadSpaceListener`].
//!
//! # Design
//!
//! Dirty-card scanning must be able to start at an arbitrary card
//! boundary, so every dead-space event refreshes the first-object entries
//! of the affected cards. Large dead ranges additionally get a small dead
//! unit planted at their last card boundary (pulled back by one minimum
//! unit when the tail there is too small to format): the tail of the range
//! parses on its own, so an allocation carving the front never forces a
//! refresh of the trailing entries.
//!
//! Cards are only set CLEAN when an event fully covers them; a partially
//! covered card may still hold references elsewhere in its range and keeps
//! its state.
//!
//! # Thread Safety
//!
//! Mutators dirty cards concurrently (atomic stores). The listener side is
//! serialized by the space that owns the manager; both tables tolerate the
//! mix because every access is a single atomic load or store.

use crate::deadspace::DeadSpaceListener;
use crate::heap::free_chunk::{self, DARK_MATTER_HEADER_BYTES, FREE_CHUNK_HEADER_BYTES};
use crate::rset::card_table::{align_down_to_card, align_up_to_card, CardTable, CARD_SIZE};
use crate::rset::cfo_table::CardFirstObjectTable;

/// Remembered set over one managed region.
pub struct CardTableRemSet {
    /// Dirty-card state, written by mutator barriers.
    cards: CardTable,
    /// First-object entries, written by dead-space events and allocators.
    first_objects: CardFirstObjectTable,
}

impl CardTableRemSet {
    /// Create a remembered set covering `[base, base + size)`.
    ///
    /// `base` must be card-aligned.
    pub fn new(base: usize, size: usize) -> Self {
        Self {
            cards: CardTable::new(base, size),
            first_objects: CardFirstObjectTable::new(base, size),
        }
    }

    /// The dirty-card table.
    #[inline]
    pub fn cards(&self) -> &CardTable {
        &self.cards
    }

    /// The first-object table.
    #[inline]
    pub fn first_objects(&self) -> &CardFirstObjectTable {
        &self.first_objects
    }

    /// Mark the card covering `addr` as dirty (mutator write barrier).
    #[inline]
    pub fn dirty(&self, addr: usize) {
        self.cards.dirty(addr);
    }

    /// Check if the card covering `addr` is dirty.
    #[inline]
    pub fn is_dirty(&self, addr: usize) -> bool {
        self.cards.is_dirty(addr)
    }

    /// Visit every dirty card's address range.
    pub fn for_each_dirty_card<F>(&self, f: F)
    where
        F: FnMut(usize, usize),
    {
        self.cards.for_each_dirty(f);
    }

    /// Clean every card intersecting `[start, end)` after scanning it.
    pub fn clean_range(&self, start: usize, end: usize) {
        self.cards.clean_range(start, end);
    }

    /// Refresh first-object entries for the dead unit `[start, end)` and
    /// clean the cards it fully covers.
    fn update_for_free_space(&self, start: usize, end: usize) {
        self.first_objects.set(start, end);

        let first_full = align_up_to_card(start);
        let last_full = align_down_to_card(end);
        if first_full < last_full {
            self.cards.clean_range(first_full, last_full);
        }
    }

    /// Plant a dead unit at the last card boundary of `[start, start +
    /// size)` so the tail of the range parses independently of its front.
    ///
    /// Returns the unit's address, or `start` when the range is too small
    /// to split. When the tail past the boundary cannot hold a formatted
    /// unit, the boundary is pulled back by the minimum unit size.
    fn split_last_card(&self, start: usize, size: usize) -> usize {
        if size >= CARD_SIZE {
            let end = start + size;
            let boundary = align_down_to_card(end);
            if boundary - start > FREE_CHUNK_HEADER_BYTES {
                let split = if end - boundary < DARK_MATTER_HEADER_BYTES {
                    end - DARK_MATTER_HEADER_BYTES
                } else {
                    boundary
                };
                // SAFETY: the event contract hands the listener dead
                // memory; [split, end) lies inside [start, start + size).
                unsafe { free_chunk::format_dark_matter(split, end - split) };
                return split;
            }
        }
        start
    }

    /// Make `[start, start + size)` walkable from any of its cards without
    /// touching card state.
    fn prepare_walkable(&self, start: usize, size: usize) {
        let split = self.split_last_card(start, size);
        if split != start {
            self.first_objects.set(start, split);
            self.first_objects.set(split, start + size);
        } else {
            self.first_objects.set(start, start + size);
        }
    }
}

impl DeadSpaceListener for CardTableRemSet {
    fn notify_coalescing(&self, start: usize, size: usize) {
        let split = self.split_last_card(start, size);
        if split != start {
            self.update_for_free_space(start, split);
            self.update_for_free_space(split, start + size);
        } else {
            self.update_for_free_space(start, start + size);
        }
    }

    fn notify_split_live(&self, start: usize, left_size: usize, _end: usize) {
        // The right remainder keeps its entries until it is reformatted.
        self.first_objects.set(start, start + left_size);
    }

    fn notify_split_dead(&self, start: usize, left_size: usize, end: usize) {
        self.prepare_walkable(start, left_size);
        self.prepare_walkable(start + left_size, end - start - left_size);
    }

    fn notify_refill(&self, _start: usize, _size: usize) {
        // The allocator maintains table entries itself as it lays cells
        // down in the refilled region.
    }

    fn notify_retire_dead_space(&self, start: usize, size: usize) {
        // Cards were cleaned when the region coalesced; only the
        // first-object entries move.
        self.first_objects.set(start, start + size);
    }

    fn notify_retire_free_space(&self, start: usize, size: usize) {
        self.prepare_walkable(start, size);
    }
}
