//! Machine-word constants and alignment arithmetic.
//!
//! Heap formatting and the lock-word layout both reason in native machine
//! words; the helpers here keep that arithmetic in one place.

/// Size of a native machine word in bytes.
pub const WORD_SIZE: usize = core::mem::size_of::<usize>();

/// Width of a native machine word in bits.
pub const WORD_BITS: u32 = usize::BITS;

/// Round `value` up to the next multiple of `alignment`.
///
/// `alignment` must be a power of two.
#[inline]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Round `value` down to the previous multiple of `alignment`.
///
/// `alignment` must be a power of two.
#[inline]
pub const fn align_down(value: usize, alignment: usize) -> usize {
    assert!(alignment.is_power_of_two());
    value & !(alignment - 1)
}

/// Check whether `value` is a multiple of `alignment` (a power of two).
#[inline]
pub const fn is_aligned(value: usize, alignment: usize) -> bool {
    assert!(alignment.is_power_of_two());
    value & (alignment - 1) == 0
}

/// Check whether `value` is aligned to a native machine word.
#[inline]
pub const fn is_word_aligned(value: usize) -> bool {
    is_aligned(value, WORD_SIZE)
}
