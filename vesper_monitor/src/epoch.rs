//! Bias epochs.
//!
//! A bias epoch is a 9-bit generation counter stored both in each biased
//! lock word (the util field) and once per class. A word's bias is valid
//! only while its recorded epoch equals the class epoch; bumping the class
//! epoch invalidates every existing bias of that class at once, which is
//! what makes bulk rebias a constant-time operation.
//!
//! Three low values are reserved and never produced by incrementing:
//!
//! - `UNUSED`: freshly allocated word / class never rebiased
//! - `REVOKED`: stamped into a word when its bias is revoked; marks the
//!   word thin from then on
//! - `BULK_REVOCATION`: class-level marker, biasing disabled for the class

use crate::layout::UTIL_MAX;

/// A bias epoch value, valid range `0..=UTIL_MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BiasedLockEpoch(u16);

impl BiasedLockEpoch {
    /// Epoch of a freshly allocated word or a never-rebiased class.
    pub const UNUSED: BiasedLockEpoch = BiasedLockEpoch(0);
    /// Word-level marker: bias revoked, interpret the word as thin.
    pub const REVOKED: BiasedLockEpoch = BiasedLockEpoch(1);
    /// Class-level marker: biasing disabled for the whole class.
    pub const BULK_REVOCATION: BiasedLockEpoch = BiasedLockEpoch(2);
    /// Smallest counter value.
    pub const MIN: BiasedLockEpoch = BiasedLockEpoch(3);
    /// Largest counter value (the field maximum).
    pub const MAX: BiasedLockEpoch = BiasedLockEpoch(UTIL_MAX as u16);

    /// Build an epoch from its field bits. `bits` must fit the field.
    #[inline]
    pub const fn from_bits(bits: u16) -> Self {
        debug_assert!(bits as u32 <= UTIL_MAX);
        BiasedLockEpoch(bits)
    }

    /// The epoch's field bits.
    #[inline]
    pub const fn to_bits(self) -> u16 {
        self.0
    }

    /// Next epoch in the counter cycle.
    ///
    /// Wraps `MAX` back to `MIN` and normalizes any sentinel to `MIN`, so
    /// repeated incrementing cycles through `[MIN, MAX]` and never lands
    /// on a reserved value.
    #[inline]
    pub const fn increment(self) -> Self {
        if self.0 >= Self::MAX.0 || self.0 < Self::MIN.0 {
            Self::MIN
        } else {
            BiasedLockEpoch(self.0 + 1)
        }
    }

    /// Whether this is the class-level bulk-revocation marker.
    #[inline]
    pub const fn is_bulk_revocation(self) -> bool {
        self.0 == Self::BULK_REVOCATION.0
    }

    /// Whether this is the word-level revocation marker.
    #[inline]
    pub const fn is_revoked(self) -> bool {
        self.0 == Self::REVOKED.0
    }

    /// Whether this is the unused (fresh) epoch.
    #[inline]
    pub const fn is_unused(self) -> bool {
        self.0 == Self::UNUSED.0
    }

    /// Whether this is any reserved value rather than a counter value.
    #[inline]
    pub const fn is_sentinel(self) -> bool {
        self.0 < Self::MIN.0
    }
}
