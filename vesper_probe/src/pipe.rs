//! Byte pipe over a shared ring buffer.
//!
//! # Layout
//!
//! The pipe lives in one fixed memory region, laid out so both sides of a
//! shared-memory mapping parse it identically on 32- and 64-bit hosts:
//!
//! ```text
//! offset 0        4        8                              size
//!        | read   | write  | circular data ............. |
//!        | cursor | cursor |                              |
//! ```
//!
//! Cursors are 4-byte offsets from the region base into the data area.
//! `read == write` means empty; a write that would advance the write
//! cursor onto the read cursor fails, so one byte stays sacrificial and
//! the usable capacity is `size - 8 - 1`.
//!
//! # Thread Safety
//!
//! No internal locking: exactly one producer and one consumer, typically
//! in different processes over a shared mapping (each maps its own view).
//! Cursor stores are atomic with Release, loads with Acquire, pairing the
//! byte write with its visibility.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering};

/// Bytes taken by the two cursor words.
pub const HEADER_BYTES: usize = 8;

/// Cursor value addressing the first data byte.
const DATA_START: u32 = HEADER_BYTES as u32;

/// Alignment required of the region (cursor words are read atomically).
const CURSOR_ALIGN: usize = 4;

/// Errors from pipe writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeError {
    /// No room for another byte; the consumer has not caught up.
    Full,
}

impl fmt::Display for PipeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipeError::Full => write!(f, "pipe is full"),
        }
    }
}

impl std::error::Error for PipeError {}

/// Single-producer single-consumer byte pipe over raw memory.
pub struct RingBufferPipe {
    /// Region base; the header words live here.
    base: NonNull<u8>,
    /// Total region size, header included.
    size: usize,
    /// Whether this handle allocated the region and must free it.
    owned: bool,
}

impl RingBufferPipe {
    /// Allocate a zeroed region of `size` bytes and set up an empty pipe.
    ///
    /// Returns `None` if the region cannot hold at least one data byte
    /// plus the sacrificial byte, if `size` does not fit a cursor word,
    /// or if allocation fails.
    pub fn new(size: usize) -> Option<Self> {
        if size < HEADER_BYTES + 2 || size > u32::MAX as usize {
            return None;
        }

        let layout = Layout::from_size_align(size, CURSOR_ALIGN).ok()?;
        let ptr = unsafe { alloc_zeroed(layout) };
        let base = NonNull::new(ptr)?;

        let pipe = Self {
            base,
            size,
            owned: true,
        };
        pipe.reset();
        Some(pipe)
    }

    /// Attach to an existing pipe region, preserving its cursors.
    ///
    /// This is the shared-memory path: the region was set up by the other
    /// side (or a previous run) and may already hold unread data.
    ///
    /// # Safety
    ///
    /// - `base` must be valid for reads and writes of `size` bytes for
    ///   the lifetime of the returned pipe, and 4-byte aligned
    /// - `size` must be the region's true size, in `[10, u32::MAX]`
    /// - the region's header must hold cursors in `[8, size)`
    /// - across all views of the region there must be exactly one
    ///   producer and one consumer
    pub unsafe fn from_raw_parts(base: NonNull<u8>, size: usize) -> Self {
        debug_assert!(size >= HEADER_BYTES + 2 && size <= u32::MAX as usize);
        debug_assert!(base.as_ptr() as usize % CURSOR_ALIGN == 0);
        Self {
            base,
            size,
            owned: false,
        }
    }

    /// Total region size in bytes, header included.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Usable data capacity: the region minus header and sacrificial byte.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.size - HEADER_BYTES - 1
    }

    /// Append one byte.
    ///
    /// Fails with [`PipeError::Full`] when the consumer has not freed a
    /// slot; the producer decides whether to spin, yield, or drop.
    pub fn write(&self, byte: u8) -> Result<(), PipeError> {
        let write = self.write_cursor().load(Ordering::Relaxed);
        let next = self.advance(write);
        if next == self.read_cursor().load(Ordering::Acquire) {
            return Err(PipeError::Full);
        }

        // Safety: write is in [8, size) by the cursor invariant.
        unsafe { *self.base.as_ptr().add(write as usize) = byte };
        self.write_cursor().store(next, Ordering::Release);
        Ok(())
    }

    /// Take one byte, or `None` when the pipe is empty.
    ///
    /// Empty is not an error; it is the steady state between messages.
    pub fn read(&self) -> Option<u8> {
        let read = self.read_cursor().load(Ordering::Relaxed);
        if read == self.write_cursor().load(Ordering::Acquire) {
            return None;
        }

        // Safety: read is in [8, size) by the cursor invariant.
        let byte = unsafe { *self.base.as_ptr().add(read as usize) };
        self.read_cursor().store(self.advance(read), Ordering::Release);
        Some(byte)
    }

    /// Unread byte count.
    pub fn available(&self) -> usize {
        let read = self.read_cursor().load(Ordering::Acquire) as usize;
        let write = self.write_cursor().load(Ordering::Acquire) as usize;
        let span = self.size - HEADER_BYTES;
        (write + span - read) % span
    }

    /// Whether the pipe currently holds no data.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// Discard all content and rewind both cursors to the data start.
    ///
    /// Both sides must be quiescent; this is for protocol
    /// re-synchronization, not for concurrent use.
    pub fn reset(&self) {
        self.read_cursor().store(DATA_START, Ordering::Release);
        self.write_cursor().store(DATA_START, Ordering::Release);
    }

    /// The region base, for handing this view to `from_raw_parts`.
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    #[inline]
    fn read_cursor(&self) -> &AtomicU32 {
        // Safety: base is 4-aligned and the first header word is ours.
        unsafe { &*(self.base.as_ptr() as *const AtomicU32) }
    }

    #[inline]
    fn write_cursor(&self) -> &AtomicU32 {
        // Safety: base is 4-aligned and the second header word is ours.
        unsafe { &*(self.base.as_ptr().add(4) as *const AtomicU32) }
    }

    /// Next cursor position, wrapping from the region end to data start.
    #[inline]
    fn advance(&self, cursor: u32) -> u32 {
        let next = cursor + 1;
        if next == self.size as u32 {
            DATA_START
        } else {
            next
        }
    }
}

// Safety: the handle owns (or exclusively borrows) its view of the
// region; the cursors are atomics and the data bytes are only touched
// under the SPSC discipline documented on the type.
unsafe impl Send for RingBufferPipe {}

impl Drop for RingBufferPipe {
    fn drop(&mut self) {
        if self.owned {
            // Safety: allocated in new() with this exact layout.
            unsafe {
                let layout = Layout::from_size_align_unchecked(self.size, CURSOR_ALIGN);
                dealloc(self.base.as_ptr(), layout);
            }
        }
    }
}

impl fmt::Debug for RingBufferPipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBufferPipe")
            .field("size", &self.size)
            .field("available", &self.available())
            .field("owned", &self.owned)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_undersized_regions() {
        assert!(RingBufferPipe::new(0).is_none());
        assert!(RingBufferPipe::new(HEADER_BYTES).is_none());
        assert!(RingBufferPipe::new(HEADER_BYTES + 1).is_none());
        assert!(RingBufferPipe::new(HEADER_BYTES + 2).is_some());
    }

    #[test]
    fn test_single_byte_capacity() {
        let pipe = RingBufferPipe::new(HEADER_BYTES + 2).expect("Failed to create pipe");
        assert_eq!(pipe.capacity(), 1);

        assert!(pipe.write(0xAB).is_ok());
        assert_eq!(pipe.write(0xCD), Err(PipeError::Full));
        assert_eq!(pipe.read(), Some(0xAB));
        assert_eq!(pipe.read(), None);
    }

    #[test]
    fn test_wraparound_traffic() {
        // Capacity 3; ten one-byte round trips cross the wrap repeatedly.
        let pipe = RingBufferPipe::new(12).expect("Failed to create pipe");
        assert_eq!(pipe.capacity(), 3);

        for i in 0..10u8 {
            assert!(pipe.write(i).is_ok());
            assert_eq!(pipe.available(), 1);
            assert_eq!(pipe.read(), Some(i));
            assert_eq!(pipe.available(), 0);
        }
    }

    #[test]
    fn test_full_drain_refill() {
        let pipe = RingBufferPipe::new(12).expect("Failed to create pipe");

        for i in 0..3u8 {
            assert!(pipe.write(i).is_ok());
        }
        assert_eq!(pipe.write(99), Err(PipeError::Full));

        assert_eq!(pipe.read(), Some(0));
        assert!(pipe.write(3).is_ok());
        assert_eq!(pipe.write(99), Err(PipeError::Full));

        for expected in 1..=3u8 {
            assert_eq!(pipe.read(), Some(expected));
        }
        assert_eq!(pipe.read(), None);
    }

    #[test]
    fn test_reset_discards_content() {
        let pipe = RingBufferPipe::new(32).expect("Failed to create pipe");

        for i in 0..5u8 {
            pipe.write(i).expect("write failed");
        }
        assert_eq!(pipe.available(), 5);

        pipe.reset();
        assert_eq!(pipe.available(), 0);
        assert_eq!(pipe.read(), None);

        pipe.write(42).expect("write failed");
        assert_eq!(pipe.read(), Some(42));
    }

    #[test]
    fn test_attached_view_sees_cursors() {
        let owner = RingBufferPipe::new(32).expect("Failed to create pipe");
        owner.write(7).expect("write failed");
        owner.write(9).expect("write failed");

        // Safety: the region outlives the view and the view is the only
        // consumer.
        let view = unsafe {
            RingBufferPipe::from_raw_parts(NonNull::new(owner.as_ptr()).unwrap(), owner.size())
        };
        assert_eq!(view.available(), 2);
        assert_eq!(view.read(), Some(7));
        assert_eq!(view.read(), Some(9));
        assert_eq!(view.read(), None);

        // The producer's view agrees.
        assert_eq!(owner.available(), 0);
    }
}
