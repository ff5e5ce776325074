//! Card-first-object table.
//!
//! Dirty-card scanning starts in the middle of the heap: the scanner needs
//! the address of the cell covering a card's first word before it can walk
//! anything. This table answers that query with one `i16` per card:
//!
//! - entry ≥ 0: the covering cell starts `entry` **words** before the card
//!   start;
//! - entry < 0: hop back `|entry|` cards and resolve there. Hops chain for
//!   cells whose span outruns the direct word-offset range, and always
//!   land within the same cell's cards, so resolution terminates.
//!
//! Entries are set eagerly by dead-space events and by allocators as they
//! lay objects down; a card's entry is only consulted after the event that
//! covers it, so unset entries are never read.

use std::sync::atomic::{AtomicI16, Ordering};

use vesper_core::{is_aligned, is_word_aligned, WORD_SIZE};

use crate::rset::card_table::{align_up_to_card, CARD_SIZE, LOG2_CARD_SIZE};

/// Largest backward hop a negative entry can encode.
const MAX_CARD_HOP: usize = 1 << 15;

/// First-object table over `[base, base + size)`.
pub struct CardFirstObjectTable {
    /// One entry per card.
    entries: Box<[AtomicI16]>,
    /// Start address of the covered region; card-aligned.
    base: usize,
}

impl CardFirstObjectTable {
    /// Create a table covering the given address range, all entries zero.
    ///
    /// `base` must be card-aligned; `size` is rounded up to whole cards.
    pub fn new(base: usize, size: usize) -> Self {
        assert!(
            is_aligned(base, CARD_SIZE),
            "first-object table base must be card-aligned"
        );

        let num_cards = align_up_to_card(size) >> LOG2_CARD_SIZE;
        let entries: Vec<AtomicI16> = (0..num_cards).map(|_| AtomicI16::new(0)).collect();

        Self {
            entries: entries.into_boxed_slice(),
            base,
        }
    }

    /// Start address of the card at `index`.
    #[inline]
    fn card_start(&self, index: usize) -> usize {
        self.base + (index << LOG2_CARD_SIZE)
    }

    /// Record that one cell occupies `[cell_start, cell_end)`.
    ///
    /// Updates every card whose first word the cell covers; cards whose
    /// first word belongs to an earlier cell keep their entries.
    pub fn set(&self, cell_start: usize, cell_end: usize) {
        debug_assert!(is_word_aligned(cell_start));
        debug_assert!(is_word_aligned(cell_end));
        debug_assert!(cell_start < cell_end);
        debug_assert!(cell_start >= self.base);

        let first = (align_up_to_card(cell_start) - self.base) >> LOG2_CARD_SIZE;
        let end = (align_up_to_card(cell_end) - self.base) >> LOG2_CARD_SIZE;
        let end = end.min(self.entries.len());

        for card in first..end {
            let word_offset = (self.card_start(card) - cell_start) / WORD_SIZE;
            let entry = if word_offset <= i16::MAX as usize {
                word_offset as i16
            } else {
                let hop = (card - first).min(MAX_CARD_HOP);
                -(hop as i32) as i16
            };
            self.entries[card].store(entry, Ordering::Relaxed);
        }
    }

    /// Address of the cell covering the first word of the card at `index`.
    pub fn cell_start(&self, index: usize) -> usize {
        let mut card = index;
        let mut entry = self.entries[card].load(Ordering::Relaxed);
        while entry < 0 {
            card -= entry.unsigned_abs() as usize;
            entry = self.entries[card].load(Ordering::Relaxed);
        }
        self.card_start(card) - (entry as usize) * WORD_SIZE
    }

    /// Raw entry for the card at `index`.
    #[inline]
    pub fn entry(&self, index: usize) -> i16 {
        self.entries[index].load(Ordering::Relaxed)
    }

    /// Get total number of cards.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table covers no cards.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the base address of the covered region.
    pub fn base(&self) -> usize {
        self.base
    }
}
