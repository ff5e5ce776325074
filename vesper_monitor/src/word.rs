//! The lock word and its shape decode.
//!
//! Every object header carries one 64-bit lock word. Bit 0 selects between
//! two shapes:
//!
//! - **lightweight**: the word itself encodes the lock state through the
//!   fields of [`crate::layout`]; see [`LightweightWord`] and its biased /
//!   thin interpretations.
//! - **inflated**: the word is an out-of-line monitor address with bit 0
//!   set; no other field may be read.
//!
//! Decoding is a single branch on the low bit, returning a two-variant
//! enum instead of dispatching through a type hierarchy.

use std::fmt;

use crate::layout;
use crate::lightweight::LightweightWord;

/// A raw 64-bit lock word.
///
/// The zero word is the canonical initial state: lightweight shape, no
/// hash, no owner, zero recursion, unused epoch.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockWord(u64);

/// The two interpretations a lock word can decode to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockShape {
    /// State encoded in the word itself.
    Lightweight(LightweightWord),
    /// State held by an out-of-line monitor.
    Inflated(InflatedWord),
}

impl LockWord {
    /// The zero word: unlocked, unbiased, unhashed.
    pub const UNLOCKED: LockWord = LockWord(0);

    /// Wrap a raw word value.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        LockWord(raw)
    }

    /// The raw word value.
    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Whether this is the zero word.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Whether the shape tag marks the word inflated.
    ///
    /// Must be consulted before trusting any other field.
    #[inline]
    pub const fn is_inflated(self) -> bool {
        layout::is_inflated(self.0)
    }

    /// Decode the word into its shape.
    #[inline]
    pub const fn decode(self) -> LockShape {
        if self.is_inflated() {
            LockShape::Inflated(InflatedWord(self.0))
        } else {
            LockShape::Lightweight(LightweightWord::from_raw_unchecked(self.0))
        }
    }
}

impl Default for LockWord {
    #[inline]
    fn default() -> Self {
        LockWord::UNLOCKED
    }
}

impl fmt::Debug for LockWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_inflated() {
            write!(
                f,
                "LockWord[inflated, monitor={:#x}]",
                InflatedWord(self.0).monitor_address()
            )
        } else {
            write!(
                f,
                "LockWord[lightweight, thread={}, util={}, rcount={}, hash={:#x}]",
                layout::thread_id_of(self.0),
                layout::util_of(self.0),
                layout::rcount_of(self.0),
                layout::hash_of(self.0)
            )
        }
    }
}

/// An inflated lock word: an opaque monitor address tagged in bit 0.
///
/// Monitors are word-aligned allocations, so the low bit of a real monitor
/// address is always free for the shape tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InflatedWord(u64);

impl InflatedWord {
    /// Encode a monitor address. `address` must be word-aligned.
    #[inline]
    pub fn from_monitor_address(address: usize) -> Self {
        debug_assert!(vesper_core::is_word_aligned(address));
        InflatedWord(address as u64 | layout::SHAPE_MASK)
    }

    /// The monitor address the word points at.
    #[inline]
    pub const fn monitor_address(self) -> usize {
        (self.0 & !layout::SHAPE_MASK) as usize
    }

    /// The enclosing lock word.
    #[inline]
    pub const fn as_word(self) -> LockWord {
        LockWord(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_word_is_lightweight_and_empty() {
        let word = LockWord::UNLOCKED;
        assert!(!word.is_inflated());
        match word.decode() {
            LockShape::Lightweight(lw) => {
                assert_eq!(lw.recursion_count(), 0);
                assert_eq!(lw.hash(), 0);
                assert!(lw.thread_id().is_none());
            }
            LockShape::Inflated(_) => panic!("zero word must decode lightweight"),
        }
    }

    #[test]
    fn test_inflated_roundtrip() {
        let address = 0x7f00_1000usize & !(vesper_core::WORD_SIZE - 1);
        let inflated = InflatedWord::from_monitor_address(address);
        assert!(inflated.as_word().is_inflated());
        assert_eq!(inflated.monitor_address(), address);
        match inflated.as_word().decode() {
            LockShape::Inflated(m) => assert_eq!(m.monitor_address(), address),
            LockShape::Lightweight(_) => panic!("tagged word must decode inflated"),
        }
    }

    #[test]
    fn test_decode_is_driven_by_low_bit() {
        assert!(matches!(
            LockWord::from_raw(0x1234_5678 << 1).decode(),
            LockShape::Lightweight(_)
        ));
        assert!(matches!(
            LockWord::from_raw((0x1234_5678 << 1) | 1).decode(),
            LockShape::Inflated(_)
        ));
    }
}
