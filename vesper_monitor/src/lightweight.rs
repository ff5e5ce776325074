//! The lightweight shape: lock state encoded in the word itself.
//!
//! Accessors here are interpretation-neutral; the biased and thin views
//! ([`crate::biased::BiasedWord`], [`crate::thin::ThinWord`]) layer their
//! transition logic on top of these. All operations are pure: they return
//! new word values and never touch memory.

use vesper_core::VmThreadId;

use crate::epoch::BiasedLockEpoch;
use crate::layout;
use crate::word::LockWord;

/// A lock word whose shape tag is lightweight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightweightWord(u64);

impl LightweightWord {
    /// Wrap a raw word known to have the lightweight shape.
    ///
    /// Callers must have checked the shape tag; [`LockWord::decode`] is the
    /// checked entry point.
    #[inline]
    pub(crate) const fn from_raw_unchecked(raw: u64) -> Self {
        debug_assert!(!layout::is_inflated(raw));
        LightweightWord(raw)
    }

    /// The enclosing lock word.
    #[inline]
    pub const fn as_word(self) -> LockWord {
        LockWord::from_raw(self.0)
    }

    /// The raw word value.
    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// The thread-id field (owner or bias owner; `NONE` when empty).
    #[inline]
    pub const fn thread_id(self) -> VmThreadId {
        VmThreadId::new(layout::thread_id_of(self.0))
    }

    /// The util field, uninterpreted.
    #[inline]
    pub const fn util(self) -> u32 {
        layout::util_of(self.0)
    }

    /// The recursion-count field.
    #[inline]
    pub const fn recursion_count(self) -> u32 {
        layout::rcount_of(self.0)
    }

    /// The identity-hash field (0 = not yet assigned).
    #[inline]
    pub const fn hash(self) -> u32 {
        layout::hash_of(self.0)
    }

    /// Replace the identity-hash field.
    #[inline]
    pub const fn with_hash(self, hash: u32) -> Self {
        LightweightWord(layout::with_hash(self.0, hash))
    }

    /// Whether the recursion field is at its maximum.
    ///
    /// A further [`Self::increment_count`] would not be representable; the
    /// caller escalates to inflation instead.
    #[inline]
    pub const fn count_overflow(self) -> bool {
        layout::rcount_of(self.0) == layout::RCOUNT_MAX
    }

    /// Whether the recursion field is zero.
    ///
    /// A further [`Self::decrement_count`] would not be representable; the
    /// caller reports an unbalanced unlock instead.
    #[inline]
    pub const fn count_underflow(self) -> bool {
        layout::rcount_of(self.0) == 0
    }

    /// A new word with the recursion field one higher.
    ///
    /// Does not clamp; check [`Self::count_overflow`] first.
    #[inline]
    #[must_use]
    pub const fn increment_count(self) -> Self {
        LightweightWord(layout::rcount_increment(self.0))
    }

    /// A new word with the recursion field one lower.
    ///
    /// Does not clamp; check [`Self::count_underflow`] first.
    #[inline]
    #[must_use]
    pub const fn decrement_count(self) -> Self {
        LightweightWord(layout::rcount_decrement(self.0))
    }

    /// Whether the util field carries the revocation marker.
    ///
    /// Marked words are thin and never biasable again; see
    /// [`crate::thin::ThinWord::from_biased`].
    #[inline]
    pub const fn is_revoked(self) -> bool {
        layout::util_of(self.0) == BiasedLockEpoch::REVOKED.to_bits() as u32
    }
}
