//! The thin interpretation of a lightweight word.
//!
//! A thin word is the post-revocation (or never-biased) lock state: the
//! owner field is the current lock holder, acquired and released by CAS.
//! Thin words carry the revocation marker in the util field; every
//! transition preserves it, so a word that has been through revocation can
//! never be mistaken for a biasable one.

use vesper_core::VmThreadId;

use crate::biased::BiasedWord;
use crate::epoch::BiasedLockEpoch;
use crate::layout;
use crate::lightweight::LightweightWord;
use crate::word::LockWord;

/// A lightweight word read under the thin interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThinWord(LightweightWord);

impl ThinWord {
    /// View a lightweight word as thin.
    #[inline]
    pub const fn from_lightweight(word: LightweightWord) -> Self {
        ThinWord(word)
    }

    /// Unlocked thin word carrying a hash and the revocation marker.
    #[inline]
    pub const fn unlocked_from_hash(hash: u32) -> Self {
        let raw = layout::with_hash(0, hash);
        let raw = layout::with_util(raw, BiasedLockEpoch::REVOKED.to_bits() as u32);
        ThinWord(LightweightWord::from_raw_unchecked(raw))
    }

    /// Convert a biased word into its thin equivalent.
    ///
    /// This is the revocation rewrite: owner, recursion, and hash carry
    /// over unchanged, and the util field is stamped with the revocation
    /// marker so the word stays thin forever.
    #[inline]
    #[must_use]
    pub const fn from_biased(word: BiasedWord) -> Self {
        ThinWord(LightweightWord::from_raw_unchecked(layout::with_util(
            word.as_lightweight().as_raw(),
            BiasedLockEpoch::REVOKED.to_bits() as u32,
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

    /// The current lock holder (`NONE` = unlocked).
    #[inline]
    pub const fn lock_owner(self) -> VmThreadId {
        self.0.thread_id()
    }

    /// Whether the word is unlocked.
    #[inline]
    pub const fn is_unlocked(self) -> bool {
        self.0.thread_id().is_none() && self.0.recursion_count() == 0
    }

    /// The same word with owner and recursion cleared.
    ///
    /// Hash and the revocation marker are preserved.
    #[inline]
    #[must_use]
    pub const fn as_unlocked(self) -> Self {
        let raw = self.0.as_raw();
        let raw = layout::with_thread_id(raw, 0);
        let raw = layout::with_rcount(raw, 0);
        ThinWord(LightweightWord::from_raw_unchecked(raw))
    }

    /// The word after `thread` acquires the lock, recursion one.
    #[inline]
    #[must_use]
    pub const fn as_locked_once_by(self, thread: VmThreadId) -> Self {
        debug_assert!(!thread.is_none());
        let raw = self.0.as_raw();
        let raw = layout::with_thread_id(raw, thread.as_u32());
        let raw = layout::with_rcount(raw, 1);
        ThinWord(LightweightWord::from_raw_unchecked(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlocked_from_hash_carries_marker() {
        let word = ThinWord::unlocked_from_hash(0x1234);
        assert!(word.is_unlocked());
        assert!(word.as_lightweight().is_revoked());
        assert_eq!(word.as_lightweight().hash(), 0x1234);
    }

    #[test]
    fn test_revocation_conversion_preserves_owner_count_hash() {
        let biased = BiasedWord::anon_biased_from_hash(0xFACE)
            .as_biased_and_locked_once_by(VmThreadId::new(6), BiasedLockEpoch::MIN)
            .as_lightweight()
            .increment_count()
            .increment_count();
        let thin = ThinWord::from_biased(BiasedWord::from_lightweight(biased));

        assert_eq!(thin.lock_owner(), VmThreadId::new(6));
        assert_eq!(thin.as_lightweight().recursion_count(), 3);
        assert_eq!(thin.as_lightweight().hash(), 0xFACE);
        assert!(thin.as_lightweight().is_revoked());
    }

    #[test]
    fn test_lock_unlock_transitions_keep_marker() {
        let word = ThinWord::unlocked_from_hash(9);
        let locked = word.as_locked_once_by(VmThreadId::new(3));
        assert_eq!(locked.lock_owner(), VmThreadId::new(3));
        assert!(!locked.is_unlocked());
        assert!(locked.as_lightweight().is_revoked());

        let unlocked = locked.as_unlocked();
        assert!(unlocked.is_unlocked());
        assert!(unlocked.as_lightweight().is_revoked());
        assert_eq!(unlocked, word);
    }
}
