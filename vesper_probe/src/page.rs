//! One cached page of remote memory.

/// A page-sized window into the target's address space.
///
/// The page knows which generation of the target it was fetched from;
/// `epoch == None` means never fetched (or explicitly invalidated), so
/// the next read must fetch regardless of the cache's generation.
pub struct Page {
    /// Page number in the target's address space.
    index: u64,
    /// Backing bytes, exactly one page long, owned until cache teardown.
    buffer: Vec<u8>,
    /// Target generation at the last successful fetch.
    epoch: Option<u64>,
}

impl Page {
    /// Wrap a buffer as the never-fetched page `index`.
    pub fn new(index: u64, buffer: Vec<u8>) -> Self {
        debug_assert!(!buffer.is_empty());
        Self {
            index,
            buffer,
            epoch: None,
        }
    }

    /// Page number in the target's address space.
    #[inline]
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Page size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// Generation at the last successful fetch, if any.
    #[inline]
    pub fn epoch(&self) -> Option<u64> {
        self.epoch
    }

    /// Whether the contents must be re-fetched for generation
    /// `current_epoch`.
    #[inline]
    pub fn is_stale(&self, current_epoch: u64) -> bool {
        match self.epoch {
            None => true,
            Some(fetched) => fetched < current_epoch,
        }
    }

    /// Stamp the page as fetched at `epoch`.
    #[inline]
    pub fn mark_fetched(&mut self, epoch: u64) {
        self.epoch = Some(epoch);
    }

    /// Force a re-fetch on the next access, whatever the generation.
    #[inline]
    pub fn invalidate(&mut self) {
        self.epoch = None;
    }

    /// The cached bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// The cached bytes, writable for the fetch path.
    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// Read one byte at `offset`.
    #[inline]
    pub fn read_u8(&self, offset: usize) -> u8 {
        self.buffer[offset]
    }

    /// Read a native-order u16 at `offset`; must not cross the page end.
    #[inline]
    pub fn read_u16(&self, offset: usize) -> u16 {
        let mut bytes = [0u8; 2];
        bytes.copy_from_slice(&self.buffer[offset..offset + 2]);
        u16::from_ne_bytes(bytes)
    }

    /// Read a native-order u32 at `offset`; must not cross the page end.
    #[inline]
    pub fn read_u32(&self, offset: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.buffer[offset..offset + 4]);
        u32::from_ne_bytes(bytes)
    }

    /// Read a native-order u64 at `offset`; must not cross the page end.
    #[inline]
    pub fn read_u64(&self, offset: usize) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.buffer[offset..offset + 8]);
        u64::from_ne_bytes(bytes)
    }

    /// Copy from `offset` into `dst`, clamped to whichever runs out
    /// first. Returns the bytes copied.
    pub fn copy_to(&self, offset: usize, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.buffer.len() - offset);
        dst[..n].copy_from_slice(&self.buffer[offset..offset + n]);
        n
    }
}
