//! Dirty-card table.
//!
//! The covered region is divided into fixed 512-byte cards, one `AtomicU8`
//! per card. Mutator write barriers dirty the card covering a written
//! address; the collector scans dirty cards and cleans them. Card state
//! changes are plain atomic byte stores, never read-modify-write, so the
//! barrier stays a two-instruction sequence.

use std::sync::atomic::{AtomicU8, Ordering};

use vesper_core::{align_down, align_up, is_aligned};

/// Log2 of the card size.
pub const LOG2_CARD_SIZE: u32 = 9;

/// Size of each card in bytes.
pub const CARD_SIZE: usize = 1 << LOG2_CARD_SIZE;

/// State of a card with no recorded writes since the last scan.
pub const CARD_CLEAN: u8 = 0;

/// State of a card a mutator wrote a reference into.
pub const CARD_DIRTY: u8 = 1;

/// Round `addr` up to the next card boundary.
#[inline]
pub const fn align_up_to_card(addr: usize) -> usize {
    align_up(addr, CARD_SIZE)
}

/// Round `addr` down to the previous card boundary.
#[inline]
pub const fn align_down_to_card(addr: usize) -> usize {
    align_down(addr, CARD_SIZE)
}

/// Dirty-card table over `[base, base + size)`.
pub struct CardTable {
    /// The card bytes.
    cards: Box<[AtomicU8]>,
    /// Start address of the covered region; card-aligned.
    base: usize,
}

impl CardTable {
    /// Create a new card table covering the given address range.
    ///
    /// `base` must be card-aligned; `size` is rounded up to whole cards.
    pub fn new(base: usize, size: usize) -> Self {
        assert!(
            is_aligned(base, CARD_SIZE),
            "card table base must be card-aligned"
        );

        let num_cards = align_up_to_card(size) >> LOG2_CARD_SIZE;
        let cards: Vec<AtomicU8> = (0..num_cards).map(|_| AtomicU8::new(CARD_CLEAN)).collect();

        Self {
            cards: cards.into_boxed_slice(),
            base,
        }
    }

    /// Get the card index for an address.
    #[inline]
    fn card_index(&self, addr: usize) -> Option<usize> {
        if addr < self.base {
            return None;
        }
        let index = (addr - self.base) >> LOG2_CARD_SIZE;
        if index < self.cards.len() {
            Some(index)
        } else {
            None
        }
    }

    /// Start address of the card at `index`.
    #[inline]
    pub fn card_start(&self, index: usize) -> usize {
        self.base + (index << LOG2_CARD_SIZE)
    }

    /// Mark the card covering `addr` as dirty.
    #[inline]
    pub fn dirty(&self, addr: usize) {
        if let Some(index) = self.card_index(addr) {
            self.cards[index].store(CARD_DIRTY, Ordering::Relaxed);
        }
    }

    /// Check if the card covering `addr` is dirty.
    #[inline]
    pub fn is_dirty(&self, addr: usize) -> bool {
        self.card_index(addr)
            .map(|i| self.cards[i].load(Ordering::Relaxed) == CARD_DIRTY)
            .unwrap_or(false)
    }

    /// Clean the card covering `addr`.
    #[inline]
    pub fn clean(&self, addr: usize) {
        if let Some(index) = self.card_index(addr) {
            self.cards[index].store(CARD_CLEAN, Ordering::Relaxed);
        }
    }

    /// Clean every card intersecting `[start, end)`.
    pub fn clean_range(&self, start: usize, end: usize) {
        let lo = start.max(self.base);
        let hi = end.min(self.covered_end());
        if lo >= hi {
            return;
        }

        let first = (lo - self.base) >> LOG2_CARD_SIZE;
        let last = (hi - 1 - self.base) >> LOG2_CARD_SIZE;
        for card in &self.cards[first..=last] {
            card.store(CARD_CLEAN, Ordering::Relaxed);
        }
    }

    /// Clean all cards.
    pub fn clean_all(&self) {
        for card in self.cards.iter() {
            card.store(CARD_CLEAN, Ordering::Relaxed);
        }
    }

    /// Iterate over dirty cards, calling the closure with the card's
    /// address range.
    pub fn for_each_dirty<F>(&self, mut f: F)
    where
        F: FnMut(usize, usize), // (card_start, card_end)
    {
        for (i, card) in self.cards.iter().enumerate() {
            if card.load(Ordering::Relaxed) == CARD_DIRTY {
                let card_start = self.card_start(i);
                f(card_start, card_start + CARD_SIZE);
            }
        }
    }

    /// Count dirty cards.
    pub fn dirty_count(&self) -> usize {
        self.cards
            .iter()
            .filter(|c| c.load(Ordering::Relaxed) == CARD_DIRTY)
            .count()
    }

    /// Get total number of cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Check if the table covers no cards.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Get the base address of the covered region.
    pub fn base(&self) -> usize {
        self.base
    }

    /// One past the last covered byte.
    pub fn covered_end(&self) -> usize {
        self.base + (self.cards.len() << LOG2_CARD_SIZE)
    }
}
