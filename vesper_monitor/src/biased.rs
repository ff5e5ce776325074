//! The biased interpretation of a lightweight word.
//!
//! A biased word records which thread the object is biased to (owner 0 =
//! anonymously biased, nobody has locked it yet), the epoch the bias was
//! acquired under, and the owner's recursion depth. While the word's epoch
//! equals the class epoch, only the bias owner mutates the word, so the
//! owner's lock/unlock paths need no atomics. A stale epoch makes the bias
//! invalid: any thread may take it over with a single CAS.

use vesper_core::VmThreadId;

use crate::epoch::BiasedLockEpoch;
use crate::layout;
use crate::lightweight::LightweightWord;
use crate::word::LockWord;

/// A lightweight word read under the biased interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BiasedWord(LightweightWord);

impl BiasedWord {
    /// View a lightweight word as biased.
    ///
    /// Only meaningful when the word is not revocation-marked; callers
    /// check [`LightweightWord::is_revoked`] first.
    #[inline]
    pub const fn from_lightweight(word: LightweightWord) -> Self {
        BiasedWord(word)
    }

    /// Anonymously biased word carrying a hash, epoch `UNUSED`.
    ///
    /// The state a hashed-but-never-locked object header holds.
    #[inline]
    pub const fn anon_biased_from_hash(hash: u32) -> Self {
        BiasedWord(LightweightWord::from_raw_unchecked(layout::with_hash(
            0, hash,
        )))
    }

    /// The underlying lightweight word.
    #[inline]
    pub const fn as_lightweight(self) -> LightweightWord {
        self.0
    }

    /// The enclosing lock word.
    #[inline]
    pub const fn as_word(self) -> LockWord {
        self.0.as_word()
    }

    /// The thread the object is biased to (`NONE` = anonymous).
    #[inline]
    pub const fn bias_owner(self) -> VmThreadId {
        self.0.thread_id()
    }

    /// The epoch the bias was acquired under.
    #[inline]
    pub const fn epoch(self) -> BiasedLockEpoch {
        BiasedLockEpoch::from_bits(self.0.util() as u16)
    }

    /// Whether nobody holds the bias.
    #[inline]
    pub const fn is_anonymous(self) -> bool {
        self.0.thread_id().is_none()
    }

    /// The same word with owner and recursion cleared.
    ///
    /// Hash and epoch are preserved, so `word == word.as_anon_biased()`
    /// tests "is this word anonymously biased" regardless of epoch.
    #[inline]
    #[must_use]
    pub const fn as_anon_biased(self) -> Self {
        let raw = self.0.as_raw();
        let raw = layout::with_thread_id(raw, 0);
        let raw = layout::with_rcount(raw, 0);
        BiasedWord(LightweightWord::from_raw_unchecked(raw))
    }

    /// The word after `thread` acquires the bias under `epoch`.
    ///
    /// Hash is preserved; recursion starts at one.
    #[inline]
    #[must_use]
    pub const fn as_biased_and_locked_once_by(
        self,
        thread: VmThreadId,
        epoch: BiasedLockEpoch,
    ) -> Self {
        debug_assert!(!thread.is_none());
        let raw = self.0.as_raw();
        let raw = layout::with_thread_id(raw, thread.as_u32());
        let raw = layout::with_util(raw, epoch.to_bits() as u32);
        let raw = layout::with_rcount(raw, 1);
        BiasedWord(LightweightWord::from_raw_unchecked(raw))
    }

    /// The same word stamped with a different epoch.
    #[inline]
    #[must_use]
    pub const fn with_epoch(self, epoch: BiasedLockEpoch) -> Self {
        BiasedWord(LightweightWord::from_raw_unchecked(layout::with_util(
            self.0.as_raw(),
            epoch.to_bits() as u32,
        )))
    }
}
