//! Owned raw memory for a managed heap space.

use std::ptr::NonNull;

/// Alignment of region base addresses.
///
/// Matches the card size so card boundaries coincide with region-relative
/// offsets (see [`crate::rset`]).
pub const REGION_ALIGNMENT: usize = 512;

/// A contiguous, zeroed, card-aligned allocation `[start, end)`.
///
/// The region is plain memory; all structure (free chunks, dark matter,
/// live cells) is formatted into it by the free-space manager and its
/// allocators. Freed on drop.
pub struct HeapRegion {
    /// Base of the allocation.
    ptr: NonNull<u8>,
    /// Size in bytes.
    size: usize,
}

impl HeapRegion {
    /// Allocate a new zeroed region of `size` bytes.
    ///
    /// Returns `None` when the allocation fails or `size` is zero.
    pub fn new(size: usize) -> Option<Self> {
        if size == 0 {
            return None;
        }

        let layout = std::alloc::Layout::from_size_align(size, REGION_ALIGNMENT).ok()?;
        let ptr = unsafe { std::alloc::alloc_zeroed(layout) };

        if ptr.is_null() {
            return None;
        }

        let ptr = unsafe { NonNull::new_unchecked(ptr) };
        Some(Self { ptr, size })
    }

    /// Base address of the region.
    #[inline]
    pub fn start(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// One past the last byte of the region.
    #[inline]
    pub fn end(&self) -> usize {
        self.start() + self.size
    }

    /// Size of the region in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Check whether an address lies within the region.
    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.start() && addr < self.end()
    }

    /// Raw base pointer.
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for HeapRegion {
    fn drop(&mut self) {
        if let Ok(layout) = std::alloc::Layout::from_size_align(self.size, REGION_ALIGNMENT) {
            unsafe {
                std::alloc::dealloc(self.ptr.as_ptr(), layout);
            }
        }
    }
}

impl std::fmt::Debug for HeapRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapRegion")
            .field("start", &format_args!("{:#x}", self.start()))
            .field("size", &self.size)
            .finish()
    }
}

// Safety: HeapRegion is an owning handle over raw memory with no interior
// aliasing; it can move between threads.
unsafe impl Send for HeapRegion {}
