//! Page-granular caching of a target's memory.
//!
//! A debugger session reads the same neighborhoods of target memory over
//! and over between pauses. [`PagedReadCache`] fetches whole fixed-size
//! pages and serves repeat reads from the local copies, going back to the
//! target only when a page is older than the cache's epoch or has been
//! explicitly invalidated.
//!
//! # Epochs
//!
//! The cache carries a monotonically increasing epoch, bumped whenever the
//! target is resumed and re-paused. Every page records the epoch it was
//! last fetched at; a page from an earlier epoch is stale and is re-fetched
//! before any byte of it is served. Bumping the epoch touches no pages, so
//! it stays O(1) no matter how much has been cached.
//!
//! # Buffer policy
//!
//! Page buffers come from a shared [`BufferPool`] while its budget lasts
//! and from plain heap allocations afterwards. The two behave identically;
//! the pool only trims allocation cost on the hot fetch path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::page::Page;
use crate::pool::BufferPool;
use crate::remote::{RemoteMemory, RemoteReadError};

// =============================================================================
// Statistics
// =============================================================================

/// Counters describing one cache's traffic.
#[derive(Debug)]
pub struct CacheStats {
    /// Pages materialized (one per distinct page index ever touched).
    pub pages_created: AtomicU64,
    /// Full-page fetches completed against the target.
    pub fetches: AtomicU64,
    /// Page buffers served from the shared pool.
    pub pool_hits: AtomicU64,
    /// Page buffers heap-allocated after the pool ran dry.
    pub heap_fallbacks: AtomicU64,
}

impl CacheStats {
    /// Create new empty statistics.
    pub const fn new() -> Self {
        Self {
            pages_created: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
            pool_hits: AtomicU64::new(0),
            heap_fallbacks: AtomicU64::new(0),
        }
    }

    /// Record a page materialized, noting where its buffer came from.
    #[inline]
    pub fn record_page_created(&self, pooled: bool) {
        self.pages_created.fetch_add(1, Ordering::Relaxed);
        if pooled {
            self.pool_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.heap_fallbacks.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a full-page fetch that completed.
    #[inline]
    pub fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Paged Read Cache
// =============================================================================

/// A read-through page cache over one target's memory.
///
/// Addresses split into a page index (`addr / page_size`) and an intra-page
/// offset. Pages materialize on first touch and live until the cache is
/// dropped; staleness, not eviction, bounds how old a served byte can be.
///
/// Read methods take `&mut self`: a cache belongs to one session thread,
/// and a fetch in progress must never be observable half-done.
pub struct PagedReadCache<R: RemoteMemory> {
    remote: R,
    pages: FxHashMap<u64, Page>,
    pool: Arc<BufferPool>,
    page_size: usize,
    epoch: u64,
    stats: Arc<CacheStats>,
}

impl<R: RemoteMemory> PagedReadCache<R> {
    /// Create a cache over `remote`, drawing page buffers from `pool`.
    ///
    /// The pool's buffer size fixes the page size.
    pub fn new(remote: R, pool: Arc<BufferPool>) -> Self {
        let page_size = pool.buffer_size();
        assert!(page_size > 0, "pool buffer size must be nonzero");
        Self {
            remote,
            pages: FxHashMap::default(),
            pool,
            page_size,
            epoch: 0,
            stats: Arc::new(CacheStats::new()),
        }
    }

    /// The cache's current epoch.
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Bytes per page.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages currently materialized.
    #[inline]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Counters describing the cache's traffic so far.
    #[inline]
    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// The underlying target handle.
    #[inline]
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Mutable access to the underlying target handle.
    #[inline]
    pub fn remote_mut(&mut self) -> &mut R {
        &mut self.remote
    }

    /// Advance the epoch, staling every cached page at once.
    ///
    /// Call after the target has run and paused again. Pages re-fetch
    /// lazily, each on its next read.
    pub fn bump_epoch(&mut self) {
        self.epoch += 1;
    }

    /// Force the next read touching `addr` to re-fetch its page.
    ///
    /// For the cases where something is known to have written target
    /// memory behind the cache's back (a planted breakpoint, a poked
    /// word) without the epoch moving.
    pub fn invalidate(&mut self, addr: u64) {
        let index = self.page_index(addr);
        if let Some(page) = self.pages.get_mut(&index) {
            page.invalidate();
        }
    }

    /// Force every cached page to re-fetch on its next read.
    pub fn invalidate_all(&mut self) {
        for page in self.pages.values_mut() {
            page.invalidate();
        }
    }

    /// Read one byte of target memory through the cache.
    pub fn read_u8(&mut self, addr: u64) -> Result<u8, RemoteReadError> {
        let index = self.page_index(addr);
        let offset = self.page_offset(addr);
        let page = self.refresh_read(index)?;
        Ok(page.read_u8(offset))
    }

    /// Read two bytes of target memory as a native-order `u16`.
    ///
    /// # Panics
    ///
    /// Panics if the value straddles a page boundary.
    pub fn read_u16(&mut self, addr: u64) -> Result<u16, RemoteReadError> {
        let index = self.page_index(addr);
        let offset = self.page_offset(addr);
        let page = self.refresh_read(index)?;
        Ok(page.read_u16(offset))
    }

    /// Read four bytes of target memory as a native-order `u32`.
    ///
    /// # Panics
    ///
    /// Panics if the value straddles a page boundary.
    pub fn read_u32(&mut self, addr: u64) -> Result<u32, RemoteReadError> {
        let index = self.page_index(addr);
        let offset = self.page_offset(addr);
        let page = self.refresh_read(index)?;
        Ok(page.read_u32(offset))
    }

    /// Read eight bytes of target memory as a native-order `u64`.
    ///
    /// # Panics
    ///
    /// Panics if the value straddles a page boundary.
    pub fn read_u64(&mut self, addr: u64) -> Result<u64, RemoteReadError> {
        let index = self.page_index(addr);
        let offset = self.page_offset(addr);
        let page = self.refresh_read(index)?;
        Ok(page.read_u64(offset))
    }

    /// Copy `dst.len()` bytes of target memory starting at `addr`.
    ///
    /// The copy walks as many pages as the span covers, fetching each
    /// stale page once. Returns the count transferred, which on success
    /// is always `dst.len()`.
    pub fn read_bytes(&mut self, addr: u64, dst: &mut [u8]) -> Result<usize, RemoteReadError> {
        let mut copied = 0;
        while copied < dst.len() {
            let cursor = addr + copied as u64;
            let index = self.page_index(cursor);
            let offset = self.page_offset(cursor);
            let page = self.refresh_read(index)?;
            copied += page.copy_to(offset, &mut dst[copied..]);
        }
        Ok(copied)
    }

    /// Locate the page holding index `index`, fetching its contents from
    /// the target if the page is stale or brand new.
    ///
    /// A failed fetch leaves the page unstamped, so the next read retries
    /// rather than serving garbage.
    fn refresh_read(&mut self, index: u64) -> Result<&Page, RemoteReadError> {
        let current = self.epoch;
        let base = index * self.page_size as u64;
        let Self {
            pages,
            pool,
            remote,
            stats,
            page_size,
            ..
        } = self;
        let page = pages.entry(index).or_insert_with(|| {
            let (buffer, pooled) = match pool.acquire() {
                Some(buffer) => (buffer, true),
                None => (vec![0u8; *page_size], false),
            };
            stats.record_page_created(pooled);
            Page::new(index, buffer)
        });
        if page.is_stale(current) {
            remote.read_fully(base, page.bytes_mut())?;
            stats.record_fetch();
            page.mark_fetched(current);
        }
        Ok(page)
    }

    #[inline]
    fn page_index(&self, addr: u64) -> u64 {
        addr / self.page_size as u64
    }

    #[inline]
    fn page_offset(&self, addr: u64) -> usize {
        (addr % self.page_size as u64) as usize
    }
}

// =============================================================================
// Tests
// =============================================================================
