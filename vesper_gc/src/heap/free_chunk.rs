//! Free-chunk and dark-matter formatting.
//!
//! Dead memory is self-describing: the manager writes a small header into
//! each dead range so a heap scanner can parse the region without any side
//! table. Two formats exist:
//!
//! - **Free chunk** (3 words): tag, size in bytes, address of the next
//!   free chunk (0 = none). The free list threads through these headers.
//! - **Dark matter** (2 words): tag, size in bytes. Walkable but never
//!   allocatable again until the space is re-coalesced.
//!
//! All functions here take raw addresses and perform unchecked writes;
//! callers guarantee the range is dead memory they own.

use vesper_core::{is_word_aligned, WORD_SIZE};

/// Tag word identifying a free chunk.
///
/// Low bit set so the tag can never alias a word-aligned class pointer.
pub const FREE_CHUNK_TAG: usize = 0xFC_0001;

/// Tag word identifying dark matter.
pub const DARK_MATTER_TAG: usize = 0xDA_0001;

/// Words in a free-chunk header (tag, size, next).
pub const FREE_CHUNK_HEADER_WORDS: usize = 3;

/// Bytes in a free-chunk header.
pub const FREE_CHUNK_HEADER_BYTES: usize = FREE_CHUNK_HEADER_WORDS * WORD_SIZE;

/// Smallest range that can be kept as a free chunk.
pub const MIN_FREE_CHUNK_BYTES: usize = FREE_CHUNK_HEADER_BYTES;

/// Words in a dark-matter header (tag, size).
pub const DARK_MATTER_HEADER_WORDS: usize = 2;

/// Bytes in a dark-matter header; also the smallest formattable dead unit.
pub const DARK_MATTER_HEADER_BYTES: usize = DARK_MATTER_HEADER_WORDS * WORD_SIZE;

#[inline]
unsafe fn write_word(addr: usize, index: usize, value: usize) {
    *((addr + index * WORD_SIZE) as *mut usize) = value;
}

#[inline]
unsafe fn read_word(addr: usize, index: usize) -> usize {
    *((addr + index * WORD_SIZE) as *const usize)
}

/// Format `[start, start + size)` as a free chunk linked to `next`.
///
/// # Safety
///
/// `start` must point to `size` bytes of dead memory owned by the caller;
/// `start` and `size` must be word-aligned and `size` at least
/// [`MIN_FREE_CHUNK_BYTES`].
pub unsafe fn format_free_chunk(start: usize, size: usize, next: usize) {
    debug_assert!(is_word_aligned(start));
    debug_assert!(is_word_aligned(size));
    debug_assert!(size >= MIN_FREE_CHUNK_BYTES);
    debug_assert!(next == 0 || is_word_aligned(next));

    write_word(start, 0, FREE_CHUNK_TAG);
    write_word(start, 1, size);
    write_word(start, 2, next);
}

/// Format `[start, start + size)` as dark matter.
///
/// # Safety
///
/// `start` must point to `size` bytes of dead memory owned by the caller;
/// `start` and `size` must be word-aligned and `size` at least
/// [`DARK_MATTER_HEADER_BYTES`].
pub unsafe fn format_dark_matter(start: usize, size: usize) {
    debug_assert!(is_word_aligned(start));
    debug_assert!(is_word_aligned(size));
    debug_assert!(size >= DARK_MATTER_HEADER_BYTES);

    write_word(start, 0, DARK_MATTER_TAG);
    write_word(start, 1, size);
}

/// Check whether `start` carries a free-chunk tag.
///
/// # Safety
///
/// `start` must be a readable word-aligned address.
#[inline]
pub unsafe fn is_free_chunk(start: usize) -> bool {
    read_word(start, 0) == FREE_CHUNK_TAG
}

/// Check whether `start` carries a dark-matter tag.
///
/// # Safety
///
/// `start` must be a readable word-aligned address.
#[inline]
pub unsafe fn is_dark_matter(start: usize) -> bool {
    read_word(start, 0) == DARK_MATTER_TAG
}

/// Size in bytes of the free chunk at `start`.
///
/// # Safety
///
/// `start` must be a formatted free chunk.
#[inline]
pub unsafe fn free_chunk_size(start: usize) -> usize {
    debug_assert!(is_free_chunk(start));
    read_word(start, 1)
}

/// Address of the free chunk following the one at `start` (0 = none).
///
/// # Safety
///
/// `start` must be a formatted free chunk.
#[inline]
pub unsafe fn free_chunk_next(start: usize) -> usize {
    debug_assert!(is_free_chunk(start));
    read_word(start, 2)
}

/// Relink the free chunk at `start` to `next`.
///
/// # Safety
///
/// `start` must be a formatted free chunk; `next` 0 or a chunk address.
#[inline]
pub unsafe fn set_free_chunk_next(start: usize, next: usize) {
    debug_assert!(is_free_chunk(start));
    write_word(start, 2, next);
}

/// Size in bytes of the dark matter at `start`.
///
/// # Safety
///
/// `start` must be formatted dark matter.
#[inline]
pub unsafe fn dark_matter_size(start: usize) -> usize {
    debug_assert!(is_dark_matter(start));
    read_word(start, 1)
}

/// Parse the dead unit at `start`, returning its size.
///
/// Returns `None` when `start` carries neither dead tag, which a scanner
/// interprets as the start of a live cell.
///
/// # Safety
///
/// `start` must be a readable word-aligned address.
#[inline]
pub unsafe fn dead_unit_size(start: usize) -> Option<usize> {
    match read_word(start, 0) {
        FREE_CHUNK_TAG | DARK_MATTER_TAG => Some(read_word(start, 1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_buffer(words: usize) -> Vec<usize> {
        vec![0usize; words]
    }

    #[test]
    fn test_free_chunk_roundtrip() {
        let mut buf = word_buffer(8);
        let start = buf.as_mut_ptr() as usize;

        unsafe {
            format_free_chunk(start, 64, 0xdead0);
            assert!(is_free_chunk(start));
            assert!(!is_dark_matter(start));
            assert_eq!(free_chunk_size(start), 64);
            assert_eq!(free_chunk_next(start), 0xdead0);

            set_free_chunk_next(start, 0);
            assert_eq!(free_chunk_next(start), 0);
        }
    }

    #[test]
    fn test_dark_matter_roundtrip() {
        let mut buf = word_buffer(4);
        let start = buf.as_mut_ptr() as usize;

        unsafe {
            format_dark_matter(start, 32);
            assert!(is_dark_matter(start));
            assert!(!is_free_chunk(start));
            assert_eq!(dark_matter_size(start), 32);
        }
    }

    #[test]
    fn test_dead_unit_parsing() {
        let mut buf = word_buffer(8);
        let start = buf.as_mut_ptr() as usize;

        unsafe {
            format_free_chunk(start, 64, 0);
            assert_eq!(dead_unit_size(start), Some(64));

            format_dark_matter(start, 24);
            assert_eq!(dead_unit_size(start), Some(24));
        }

        // A class pointer in word 0 parses as live.
        buf[0] = 0x7f00_1000;
        assert_eq!(unsafe { dead_unit_size(buf.as_ptr() as usize) }, None);
    }

    #[test]
    fn test_tags_are_distinct_and_unaligned() {
        assert_ne!(FREE_CHUNK_TAG, DARK_MATTER_TAG);
        assert!(!is_word_aligned(FREE_CHUNK_TAG));
        assert!(!is_word_aligned(DARK_MATTER_TAG));
    }
}
