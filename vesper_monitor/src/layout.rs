//! Bit layout of the 64-bit lock word.
//!
//! A single parameterized field description shared by every interpretation
//! of the word. The layout is static per build, so all accessors are free
//! `const fn`s over `u64` with no dispatch and no per-shape types.
//!
//! ```text
//! bit [63........................................................0]
//!     [ rcount(5) | util(9) | threadID(17) | hash(32) | shape(1) ]
//! ```
//!
//! - `shape` (bit 0): 0 = lightweight, 1 = inflated. When set, the rest of
//!   the word is an out-of-line monitor address and none of the fields
//!   below may be read.
//! - `hash`: 32-bit identity hash, 0 = not yet assigned.
//! - `threadID`: owner/bias-owner id, 0 = no thread. The width is whatever
//!   remains after the fixed fields, 17 bits on 64-bit targets.
//! - `util`: 9 bits, interpretation-specific. Biased words keep the bias
//!   epoch here; thin words keep the revocation marker.
//! - `rcount`: 5-bit recursion count. Saturation is detected by callers
//!   (`count_overflow`), never clamped here.

/// Width of the shape tag in bits.
pub const SHAPE_BITS: u32 = 1;
/// Width of the identity-hash field in bits.
pub const HASH_BITS: u32 = 32;
/// Width of the util field in bits.
pub const UTIL_BITS: u32 = 9;
/// Width of the recursion-count field in bits.
pub const RCOUNT_BITS: u32 = 5;
/// Width of the thread-id field: the remainder of the word.
pub const THREAD_ID_BITS: u32 = 64 - SHAPE_BITS - HASH_BITS - UTIL_BITS - RCOUNT_BITS;

/// Bit position of the shape tag.
pub const SHAPE_SHIFT: u32 = 0;
/// Bit position of the identity-hash field.
pub const HASH_SHIFT: u32 = SHAPE_SHIFT + SHAPE_BITS;
/// Bit position of the thread-id field.
pub const THREAD_ID_SHIFT: u32 = HASH_SHIFT + HASH_BITS;
/// Bit position of the util field.
pub const UTIL_SHIFT: u32 = THREAD_ID_SHIFT + THREAD_ID_BITS;
/// Bit position of the recursion-count field.
pub const RCOUNT_SHIFT: u32 = UTIL_SHIFT + UTIL_BITS;

/// Maximum value of the recursion-count field.
pub const RCOUNT_MAX: u32 = (1 << RCOUNT_BITS) - 1;
/// Maximum value of the thread-id field.
pub const THREAD_ID_MAX: u32 = (1 << THREAD_ID_BITS) - 1;
/// Maximum value of the util field.
pub const UTIL_MAX: u32 = (1 << UTIL_BITS) - 1;

/// In-place mask of the shape tag.
pub const SHAPE_MASK: u64 = field_mask(SHAPE_BITS) << SHAPE_SHIFT;
/// In-place mask of the identity-hash field.
pub const HASH_MASK: u64 = field_mask(HASH_BITS) << HASH_SHIFT;
/// In-place mask of the thread-id field.
pub const THREAD_ID_MASK: u64 = field_mask(THREAD_ID_BITS) << THREAD_ID_SHIFT;
/// In-place mask of the util field.
pub const UTIL_MASK: u64 = field_mask(UTIL_BITS) << UTIL_SHIFT;
/// In-place mask of the recursion-count field.
pub const RCOUNT_MASK: u64 = field_mask(RCOUNT_BITS) << RCOUNT_SHIFT;

const fn field_mask(bits: u32) -> u64 {
    (1u64 << bits) - 1
}

/// Whether the word's shape tag marks it inflated.
#[inline]
pub const fn is_inflated(word: u64) -> bool {
    word & SHAPE_MASK != 0
}

/// Read the identity-hash field.
#[inline]
pub const fn hash_of(word: u64) -> u32 {
    ((word & HASH_MASK) >> HASH_SHIFT) as u32
}

/// Replace the identity-hash field.
#[inline]
pub const fn with_hash(word: u64, hash: u32) -> u64 {
    (word & !HASH_MASK) | ((hash as u64) << HASH_SHIFT)
}

/// Read the thread-id field.
#[inline]
pub const fn thread_id_of(word: u64) -> u32 {
    ((word & THREAD_ID_MASK) >> THREAD_ID_SHIFT) as u32
}

/// Replace the thread-id field. `id` must fit `THREAD_ID_BITS`.
#[inline]
pub const fn with_thread_id(word: u64, id: u32) -> u64 {
    debug_assert!(id <= THREAD_ID_MAX);
    (word & !THREAD_ID_MASK) | ((id as u64) << THREAD_ID_SHIFT)
}

/// Read the util field.
#[inline]
pub const fn util_of(word: u64) -> u32 {
    ((word & UTIL_MASK) >> UTIL_SHIFT) as u32
}

/// Replace the util field. `util` must fit `UTIL_BITS`.
#[inline]
pub const fn with_util(word: u64, util: u32) -> u64 {
    debug_assert!(util <= UTIL_MAX);
    (word & !UTIL_MASK) | ((util as u64) << UTIL_SHIFT)
}

/// Read the recursion-count field.
#[inline]
pub const fn rcount_of(word: u64) -> u32 {
    ((word & RCOUNT_MASK) >> RCOUNT_SHIFT) as u32
}

/// Replace the recursion-count field. `count` must fit `RCOUNT_BITS`.
#[inline]
pub const fn with_rcount(word: u64, count: u32) -> u64 {
    debug_assert!(count <= RCOUNT_MAX);
    (word & !RCOUNT_MASK) | ((count as u64) << RCOUNT_SHIFT)
}

/// Add one to the recursion field in place, without clamping.
///
/// At `RCOUNT_MAX` the carry leaves the field; callers must have checked
/// `rcount_of(word) < RCOUNT_MAX` first.
#[inline]
pub const fn rcount_increment(word: u64) -> u64 {
    word.wrapping_add(1 << RCOUNT_SHIFT)
}

/// Subtract one from the recursion field in place, without clamping.
///
/// At zero the borrow leaves the field; callers must have checked
/// `rcount_of(word) > 0` first.
#[inline]
pub const fn rcount_decrement(word: u64) -> u64 {
    word.wrapping_sub(1 << RCOUNT_SHIFT)
}
