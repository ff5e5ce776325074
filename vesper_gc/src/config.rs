//! Heap-space configuration parameters.
//!
//! All sizes are tunable per space; defaults suit a mid-sized tenured
//! region. Card geometry is fixed at compile time (see [`crate::rset`]).

use vesper_core::is_word_aligned;

use crate::heap::free_chunk::MIN_FREE_CHUNK_BYTES;

/// Configuration for a managed heap space.
///
/// # Example
///
/// ```ignore
/// use vesper_gc::HeapConfig;
///
/// // Small fixed-footprint space for an embedded target
/// let config = HeapConfig {
///     region_size: 2 * 1024 * 1024,
///     ..Default::default()
/// };
/// config.validate()?;
/// ```
#[derive(Debug, Clone)]
pub struct HeapConfig {
    // =========================================================================
    // Region
    // =========================================================================
    /// Size of the managed region in bytes.
    ///
    /// The free-space manager tracks exactly one region; generational
    /// setups create one manager per space.
    ///
    /// Default: 16MB
    pub region_size: usize,

    // =========================================================================
    // Free-Space Management
    // =========================================================================
    /// Smallest split remainder worth keeping on the free list.
    ///
    /// Leftovers below this size are formatted as dark matter instead of
    /// free chunks, trading space for a shorter free list. Must be at
    /// least the free-chunk header size.
    ///
    /// Default: 24 bytes (the free-chunk header size)
    pub min_reclaimable: usize,

    // =========================================================================
    // Debugging
    // =========================================================================
    /// Verify free-list integrity after every mutation.
    ///
    /// Expensive but invaluable when chasing dead-space corruption.
    ///
    /// Default: true in debug builds, false otherwise
    pub verify_heap: bool,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            region_size: 16 * 1024 * 1024, // 16MB
            min_reclaimable: MIN_FREE_CHUNK_BYTES,
            verify_heap: cfg!(debug_assertions),
        }
    }
}

impl HeapConfig {
    /// Create a configuration optimized for low memory usage.
    pub fn low_memory() -> Self {
        Self {
            region_size: 1024 * 1024, // 1MB
            ..Default::default()
        }
    }

    /// Create a configuration optimized for high allocation throughput.
    ///
    /// A larger minimum remainder keeps the free list short at the cost
    /// of some dark matter.
    pub fn high_throughput() -> Self {
        Self {
            region_size: 64 * 1024 * 1024, // 64MB
            min_reclaimable: 64,
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region_size < 4096 {
            return Err(ConfigError::RegionTooSmall);
        }
        if !is_word_aligned(self.region_size) {
            return Err(ConfigError::UnalignedRegionSize);
        }
        if self.min_reclaimable < MIN_FREE_CHUNK_BYTES {
            return Err(ConfigError::MinReclaimableTooSmall);
        }
        if !is_word_aligned(self.min_reclaimable) {
            return Err(ConfigError::UnalignedMinReclaimable);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Region size is too small (minimum 4KB).
    RegionTooSmall,
    /// Region size must be word-aligned.
    UnalignedRegionSize,
    /// Minimum reclaimable size must fit a free-chunk header.
    MinReclaimableTooSmall,
    /// Minimum reclaimable size must be word-aligned.
    UnalignedMinReclaimable,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::RegionTooSmall => write!(f, "region size must be at least 4KB"),
            ConfigError::UnalignedRegionSize => write!(f, "region size must be word-aligned"),
            ConfigError::MinReclaimableTooSmall => write!(
                f,
                "minimum reclaimable size must be at least {} bytes",
                MIN_FREE_CHUNK_BYTES
            ),
            ConfigError::UnalignedMinReclaimable => {
                write!(f, "minimum reclaimable size must be word-aligned")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
