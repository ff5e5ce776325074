//! The atomic lock-word slot of an object header.
//!
//! All lock-word mutation goes through this cell. Ownership transitions
//! (bias acquisition, revocation, inflation) use compare-and-swap; a bias
//! owner's recursion updates use plain release stores because the bias
//! protocol guarantees the owner writes alone.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::word::LockWord;

/// One object's lock word, mutated atomically in place.
#[derive(Debug)]
pub struct HeaderCell(AtomicU64);

impl HeaderCell {
    /// A cell holding the given word.
    #[inline]
    pub const fn new(word: LockWord) -> Self {
        HeaderCell(AtomicU64::new(word.as_raw()))
    }

    /// A cell in the canonical initial state (zero word).
    #[inline]
    pub const fn unlocked() -> Self {
        Self::new(LockWord::UNLOCKED)
    }

    /// Current word.
    #[inline]
    pub fn load(&self) -> LockWord {
        LockWord::from_raw(self.0.load(Ordering::Acquire))
    }

    /// Overwrite the word.
    ///
    /// Only correct on paths where no other thread can be writing: the
    /// bias owner's recursion updates, or inside a suspension/world-stop
    /// window. Everything else uses [`Self::compare_exchange`].
    #[inline]
    pub fn store(&self, word: LockWord) {
        self.0.store(word.as_raw(), Ordering::Release);
    }

    /// Replace `current` with `new` if the cell still holds `current`.
    ///
    /// On failure returns the word actually found.
    #[inline]
    pub fn compare_exchange(&self, current: LockWord, new: LockWord) -> Result<LockWord, LockWord> {
        self.0
            .compare_exchange(
                current.as_raw(),
                new.as_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(LockWord::from_raw)
            .map_err(LockWord::from_raw)
    }
}

impl Default for HeaderCell {
    #[inline]
    fn default() -> Self {
        Self::unlocked()
    }
}
