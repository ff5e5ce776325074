//! Access to a target process's memory.

use std::fmt;

/// A source of remote memory the probe can read from.
///
/// Implementations wrap whatever transport reaches the target: ptrace,
/// a mapped core file, or an in-process view for tests. Reads are
/// synchronous and either fill the whole destination or fail.
pub trait RemoteMemory {
    /// Fill `dst` from the target's memory starting at `addr`.
    ///
    /// Partial reads are failures; on `Err` the contents of `dst` are
    /// unspecified.
    fn read_fully(&mut self, addr: u64, dst: &mut [u8]) -> Result<(), RemoteReadError>;

    /// Whether the target is still attached and readable.
    fn is_live(&self) -> bool;
}

/// Why a remote read failed.
#[derive(Debug)]
pub enum RemoteReadError {
    /// The target process has terminated. Cached data is stale but the
    /// read is retryable after reattaching.
    Terminated,
    /// The access itself failed.
    Io(std::io::Error),
}

impl fmt::Display for RemoteReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteReadError::Terminated => {
                write!(f, "attempt to read memory of a terminated process")
            }
            RemoteReadError::Io(err) => write!(f, "remote memory access failed: {}", err),
        }
    }
}

impl std::error::Error for RemoteReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RemoteReadError::Terminated => None,
            RemoteReadError::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for RemoteReadError {
    fn from(err: std::io::Error) -> Self {
        RemoteReadError::Io(err)
    }
}
