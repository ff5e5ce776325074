//! Dead-space event protocol.
//!
//! The free-space manager owns the truth about which heap ranges are dead;
//! consumers that keep derived tables over that space (remembered sets,
//! first-object tables) register a listener and mirror every boundary
//! change as it happens.
//!
//! # Contract
//!
//! Listeners run inside GC critical sections. They must not allocate,
//! block, or unwind; an internally inconsistent listener must abort the
//! process rather than continue, because a stale remembered-set entry
//! corrupts silently and surfaces collections later.

/// Receiver for dead-space boundary changes.
///
/// Every method describes a range of heap memory the caller currently
/// treats as dead (or, for splits and refills, a range transitioning out
/// of that state). All addresses and sizes are word-aligned and lie inside
/// the managed region. The default implementations do nothing.
pub trait DeadSpaceListener {
    /// Adjacent dead chunks merged into `[start, start + size)`.
    ///
    /// Also fired when a lone chunk is registered: the event means "this
    /// range now scans as a single dead unit".
    fn notify_coalescing(&self, _start: usize, _size: usize) {}

    /// The first `left_size` bytes of `[start, end)` became a live
    /// allocation. The remainder stays dead and must remain independently
    /// parsable.
    fn notify_split_live(&self, _start: usize, _left_size: usize, _end: usize) {}

    /// A dead chunk `[start, end)` was carved in two at `start + left_size`.
    /// Both halves stay dead.
    fn notify_split_dead(&self, _start: usize, _left_size: usize, _end: usize) {}

    /// An allocator was handed `[start, start + size)` to carve
    /// allocations from.
    fn notify_refill(&self, _start: usize, _size: usize) {}

    /// An allocator returned `[start, start + size)` as dark matter:
    /// walkable immediately, never allocatable again without
    /// re-coalescing.
    fn notify_retire_dead_space(&self, _start: usize, _size: usize) {}

    /// An allocator returned `[start, start + size)` as a free chunk that
    /// may be handed out again as-is.
    fn notify_retire_free_space(&self, _start: usize, _size: usize) {}
}

/// Listener that performs no bookkeeping.
///
/// Used by spaces that are never card-scanned, and as the baseline in
/// benchmarks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDeadSpaceListener;

impl DeadSpaceListener for NullDeadSpaceListener {}
