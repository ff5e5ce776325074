//! Identifier newtypes shared across the runtime crates.

/// VM-level thread identifier.
///
/// Allocated densely by the thread map starting at 1; id 0 is reserved to
/// mean "no thread" wherever an owner field can be empty (e.g. an
/// anonymously biased lock word).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VmThreadId(u32);

impl VmThreadId {
    /// The reserved "no thread" id.
    pub const NONE: VmThreadId = VmThreadId(0);

    /// Create a thread id from its raw value.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        VmThreadId(raw)
    }

    /// Raw id value.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Whether this is the reserved "no thread" id.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// Identifier of a loaded class.
///
/// Keys per-class runtime state such as the bias epoch and revocation
/// heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    /// Create a class id from its raw value.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        ClassId(raw)
    }

    /// Raw id value.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}
