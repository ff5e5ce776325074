//! Vesper Lock-Word Machinery
//!
//! Lightweight and biased object locking for a meta-circular VM: the
//! bit-packed per-object lock word, the bias epoch scheme, the revocation
//! heuristics, and the revocation flows themselves.
//!
//! # Architecture
//!
//! Every object header carries one 64-bit word ([`LockWord`]) whose low
//! bit selects its shape:
//!
//! - **Lightweight**: the word itself holds owner, recursion count,
//!   identity hash, and a utility sub-field. Two interpretations layer on
//!   top: [`BiasedWord`] (the utility field is the bias epoch) and
//!   [`ThinWord`] (the utility field carries a permanent revocation
//!   marker).
//!
//! - **Inflated**: the word is the address of an out-of-line monitor;
//!   nothing else may be read from it.
//!
//! A bias lets its owner lock and unlock with plain stores. The price is
//! revocation: taking the bias away requires the owner held off the fast
//! path, which [`BiasRevoker`] coordinates through an injected
//! [`RevocationScheduler`]. Per-class epochs make revocation amortizable:
//! bumping a class epoch ([`BiasRevoker::bulk_rebias`]) invalidates every
//! instance's bias at once without touching their words.
//!
//! # Usage
//!
//! ```ignore
//! use vesper_monitor::{BiasRevoker, HeaderCell, SerializingScheduler};
//!
//! let revoker = BiasRevoker::new(SerializingScheduler::new());
//! let cell = HeaderCell::unlocked();
//!
//! match revoker.try_biased_lock(&cell, class, thread) {
//!     BiasLockOutcome::Acquired => { /* critical section */ }
//!     BiasLockOutcome::Contended { .. } => {
//!         revoker.revoke_on_contention(&cell, class, thread);
//!         // word is thin now; retry through the thin protocol
//!     }
//!     _ => { /* escalate */ }
//! }
//! ```
//!
//! # Thread Safety
//!
//! All word reads and ownership transitions are atomic on the
//! [`HeaderCell`]; only a bias owner's recursion updates use plain
//! stores, which is exactly the invariant the revocation flows exist to
//! protect.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod biased;
pub mod epoch;
pub mod header;
pub mod heuristics;
pub mod layout;
pub mod lightweight;
pub mod registry;
pub mod revoke;
pub mod thin;
pub mod word;

// Re-exports for convenient access
pub use biased::BiasedWord;
pub use epoch::BiasedLockEpoch;
pub use header::HeaderCell;
pub use heuristics::{BiasedLockRevocationHeuristics, HeuristicsConfig, RevocationType};
pub use lightweight::LightweightWord;
pub use registry::{BiasRegistry, ClassBiasState};
pub use revoke::{
    BiasLockOutcome, BiasRevoker, BiasUnlockOutcome, RevocationScheduler, RevocationStats,
    SerializingScheduler,
};
pub use thin::ThinWord;
pub use word::{InflatedWord, LockShape, LockWord};
