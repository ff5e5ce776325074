//! Bias acquisition fast paths and revocation flows.
//!
//! Ties the word transitions, the per-class registry, and the contention
//! heuristics together over a [`HeaderCell`]. A bias owner updates its
//! recursion count with plain stores, so a contender can never rewrite an
//! owned word safely on its own: the word changes mode only while the
//! owner is held off the lock-word fast paths. That suspension machinery
//! belongs to the embedding VM and is injected as a
//! [`RevocationScheduler`].
//!
//! # Design
//!
//! - [`BiasRevoker::try_biased_lock`] / [`BiasRevoker::try_biased_unlock`]
//!   are the fast paths: no heuristics consult, at most one CAS or one
//!   plain store, and an outcome telling the caller how to proceed.
//! - [`BiasRevoker::revoke_on_contention`] is the slow path: one
//!   heuristics decision, then the single / bulk-rebias / bulk-revocation
//!   flow.
//! - Bulk flows mutate only the class epoch. Words biased under an older
//!   epoch are re-examined lazily the next time a thread locks them.
//!
//! # Thread Safety
//!
//! Any number of threads may call any method concurrently. Racing
//! contenders may each consult the heuristics and each run a bulk flow;
//! the flows are idempotent under the scheduler's world stop, so
//! at-least-once execution is harmless.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use vesper_core::{ClassId, VmThreadId};

use crate::biased::BiasedWord;
use crate::epoch::BiasedLockEpoch;
use crate::header::HeaderCell;
use crate::heuristics::{HeuristicsConfig, RevocationType};
use crate::registry::BiasRegistry;
use crate::thin::ThinWord;
use crate::word::{LockShape, LockWord};

// =============================================================================
// RevocationScheduler
// =============================================================================

/// The safepoint seam a revoker needs from its embedding.
///
/// Both methods run `op` synchronously and return after it completes.
/// The contract is about what the rest of the system may do while `op`
/// runs, not about how the stop is achieved.
pub trait RevocationScheduler {
    /// Run `op` while `thread` executes no lock-word operation.
    fn with_thread_suspended(&self, thread: VmThreadId, op: &mut dyn FnMut());

    /// Run `op` while no application thread executes a lock-word
    /// operation.
    fn with_world_stopped(&self, op: &mut dyn FnMut());
}

/// A scheduler that realizes both stops as one process-wide write lock.
///
/// Revocations serialize against each other but running threads are not
/// actually suspended, so this suits embeddings (and tests) where bias
/// owners are quiescent whenever their bias is contended. A VM with
/// preemptive mutators supplies its own safepoint-backed implementation.
#[derive(Debug, Default)]
pub struct SerializingScheduler {
    world: RwLock<()>,
}

impl SerializingScheduler {
    /// A scheduler with an unheld world lock.
    pub fn new() -> Self {
        Self {
            world: RwLock::new(()),
        }
    }
}

impl RevocationScheduler for SerializingScheduler {
    fn with_thread_suspended(&self, _thread: VmThreadId, op: &mut dyn FnMut()) {
        let _world = self.world.write();
        op();
    }

    fn with_world_stopped(&self, op: &mut dyn FnMut()) {
        let _world = self.world.write();
        op();
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of a biased lock attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiasLockOutcome {
    /// The bias is ours and the recursion count was raised.
    Acquired,
    /// The recursion field is saturated; the caller escalates to
    /// inflation after revoking its own bias.
    Overflowed,
    /// The class epoch is the bulk-revocation marker; new lock attempts
    /// take the thin path.
    BiasingDisabled,
    /// The word is validly biased toward another thread; the caller
    /// resolves it through [`BiasRevoker::revoke_on_contention`].
    Contended {
        /// The current bias owner.
        owner: VmThreadId,
    },
    /// The word is not in biased mode (revoked earlier, or inflated).
    NotBiased,
}

/// Result of a biased unlock attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiasUnlockOutcome {
    /// Recursion count lowered.
    Released,
    /// The count was already zero: an unbalanced unlock.
    Underflowed,
    /// The word is biased toward a different thread.
    NotOwner,
    /// The word is not in biased mode.
    NotBiased,
}

// =============================================================================
// RevocationStats
// =============================================================================

/// Counters for lock traffic and revocation decisions.
///
/// All counters are updated with relaxed atomics; read them individually
/// or print a summary. Totals across racing threads are exact, ordering
/// between counters is not.
#[derive(Debug)]
pub struct RevocationStats {
    /// Fast-path acquisitions (bias already ours).
    pub biased_locks: AtomicU64,
    /// Bias transfers: anonymous or epoch-stale words CASed to a new owner.
    pub rebiases: AtomicU64,
    /// Contention events that consulted the heuristics.
    pub contentions: AtomicU64,
    /// Single-object revocations performed.
    pub single_revocations: AtomicU64,
    /// Bulk rebias operations performed.
    pub bulk_rebiases: AtomicU64,
    /// Bulk revocation operations performed.
    pub bulk_revocations: AtomicU64,
}

impl RevocationStats {
    /// Create zeroed statistics.
    pub fn new() -> Self {
        RevocationStats {
            biased_locks: AtomicU64::new(0),
            rebiases: AtomicU64::new(0),
            contentions: AtomicU64::new(0),
            single_revocations: AtomicU64::new(0),
            bulk_rebiases: AtomicU64::new(0),
            bulk_revocations: AtomicU64::new(0),
        }
    }

    /// Revocations of any kind.
    pub fn total_revocations(&self) -> u64 {
        self.single_revocations.load(Ordering::Relaxed)
            + self.bulk_rebiases.load(Ordering::Relaxed)
            + self.bulk_revocations.load(Ordering::Relaxed)
    }

    /// Reset every counter to zero.
    pub fn reset(&self) {
        self.biased_locks.store(0, Ordering::Relaxed);
        self.rebiases.store(0, Ordering::Relaxed);
        self.contentions.store(0, Ordering::Relaxed);
        self.single_revocations.store(0, Ordering::Relaxed);
        self.bulk_rebiases.store(0, Ordering::Relaxed);
        self.bulk_revocations.store(0, Ordering::Relaxed);
    }
}

impl Default for RevocationStats {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// BiasRevoker
// =============================================================================

/// Biased-locking front end over a class registry and a scheduler.
pub struct BiasRevoker<S: RevocationScheduler> {
    registry: BiasRegistry,
    scheduler: S,
    stats: RevocationStats,
}

impl<S: RevocationScheduler> BiasRevoker<S> {
    /// A revoker with default heuristics thresholds.
    pub fn new(scheduler: S) -> Self {
        Self::with_config(HeuristicsConfig::default(), scheduler)
    }

    /// A revoker whose classes share the given heuristics thresholds.
    pub fn with_config(config: HeuristicsConfig, scheduler: S) -> Self {
        BiasRevoker {
            registry: BiasRegistry::with_config(config),
            scheduler,
            stats: RevocationStats::new(),
        }
    }

    /// The per-class bias state table.
    #[inline]
    pub fn registry(&self) -> &BiasRegistry {
        &self.registry
    }

    /// Lock traffic and revocation counters.
    #[inline]
    pub fn stats(&self) -> &RevocationStats {
        &self.stats
    }

    // =========================================================================
    // Fast paths
    // =========================================================================

    /// Attempt to lock `cell` biased toward `thread`.
    ///
    /// Acquisition either deepens an existing self-bias with a plain
    /// store or claims an anonymous / epoch-stale word with one CAS.
    /// Everything else is reported back for the caller to escalate.
    pub fn try_biased_lock(
        &self,
        cell: &HeaderCell,
        class: ClassId,
        thread: VmThreadId,
    ) -> BiasLockOutcome {
        let state = self.registry.class_state(class);
        loop {
            let word = cell.load();
            let lightweight = match word.decode() {
                LockShape::Inflated(_) => return BiasLockOutcome::NotBiased,
                LockShape::Lightweight(lw) => lw,
            };
            if lightweight.is_revoked() {
                return BiasLockOutcome::NotBiased;
            }
            let biased = BiasedWord::from_lightweight(lightweight);
            let class_epoch = state.epoch();

            if class_epoch.is_bulk_revocation() {
                return BiasLockOutcome::BiasingDisabled;
            }

            if biased.bias_owner() == thread {
                if lightweight.count_overflow() {
                    return BiasLockOutcome::Overflowed;
                }
                // A stale epoch still permits recursive locking while the
                // count is non-zero; the word rebiases on the next
                // acquire after full release.
                if biased.epoch() == class_epoch || !lightweight.count_underflow() {
                    cell.store(lightweight.increment_count().as_word());
                    self.stats.biased_locks.fetch_add(1, Ordering::Relaxed);
                    return BiasLockOutcome::Acquired;
                }
            }

            // A stale bias is claimable only once fully released; a holder
            // mid-critical-section keeps its word until revocation.
            let stale_and_released =
                biased.epoch() != class_epoch && lightweight.count_underflow();
            if biased.is_anonymous() || stale_and_released {
                let claimed = biased.as_biased_and_locked_once_by(thread, class_epoch);
                if cell.compare_exchange(word, claimed.as_word()).is_ok() {
                    self.stats.rebiases.fetch_add(1, Ordering::Relaxed);
                    return BiasLockOutcome::Acquired;
                }
                // Raced with another claimant or a revoker.
                continue;
            }

            return BiasLockOutcome::Contended {
                owner: biased.bias_owner(),
            };
        }
    }

    /// Release one recursion level of `thread`'s bias on `cell`.
    ///
    /// The class epoch is not consulted: a stale-epoch word still unwinds
    /// its outstanding count before it becomes rebiasable.
    pub fn try_biased_unlock(&self, cell: &HeaderCell, thread: VmThreadId) -> BiasUnlockOutcome {
        let word = cell.load();
        let lightweight = match word.decode() {
            LockShape::Inflated(_) => return BiasUnlockOutcome::NotBiased,
            LockShape::Lightweight(lw) => lw,
        };
        if lightweight.is_revoked() {
            return BiasUnlockOutcome::NotBiased;
        }
        if BiasedWord::from_lightweight(lightweight).bias_owner() != thread {
            return BiasUnlockOutcome::NotOwner;
        }
        if lightweight.count_underflow() {
            return BiasUnlockOutcome::Underflowed;
        }
        cell.store(lightweight.decrement_count().as_word());
        BiasUnlockOutcome::Released
    }

    // =========================================================================
    // Revocation flows
    // =========================================================================

    /// Resolve contention on `cell` per the class heuristics.
    ///
    /// Returns the decision that was carried out. After a bulk rebias the
    /// word itself is untouched but epoch-stale, so the caller's retry
    /// claims it with a CAS; after the other flows the word is thin.
    pub fn revoke_on_contention(
        &self,
        cell: &HeaderCell,
        class: ClassId,
        requester: VmThreadId,
    ) -> RevocationType {
        let state = self.registry.class_state(class);
        self.stats.contentions.fetch_add(1, Ordering::Relaxed);
        let decision = state.heuristics().notify_contention_revocation_request();
        match decision {
            RevocationType::SingleObjectRevocation => {
                self.revoke_object_bias(cell, requester);
            }
            RevocationType::BulkRebias => {
                self.bulk_rebias(class);
            }
            RevocationType::BulkRevocation => {
                self.bulk_revoke(class);
                self.revoke_object_bias(cell, requester);
            }
        }
        decision
    }

    /// Rewrite a biased `cell` as thin, preserving owner, recursion count
    /// and hash.
    ///
    /// An anonymous bias is claimed with a bare CAS. A bias owned by
    /// `requester` itself is rewritten directly, since the owner cannot
    /// race its own fast path. A foreign bias is rewritten inside the
    /// scheduler's suspension window for its owner.
    ///
    /// Returns the word the cell held when the bias was gone: the thin
    /// word written here, or whatever non-biased word another thread
    /// installed first.
    pub fn revoke_object_bias(&self, cell: &HeaderCell, requester: VmThreadId) -> LockWord {
        loop {
            let word = cell.load();
            let lightweight = match word.decode() {
                LockShape::Inflated(_) => return word,
                LockShape::Lightweight(lw) => lw,
            };
            if lightweight.is_revoked() {
                return word;
            }
            let biased = BiasedWord::from_lightweight(lightweight);
            let owner = biased.bias_owner();
            let thin = ThinWord::from_biased(biased);

            if biased.is_anonymous() {
                if cell.compare_exchange(word, thin.as_word()).is_ok() {
                    self.stats.single_revocations.fetch_add(1, Ordering::Relaxed);
                    return thin.as_word();
                }
                continue;
            }

            if owner == requester {
                cell.store(thin.as_word());
                self.stats.single_revocations.fetch_add(1, Ordering::Relaxed);
                return thin.as_word();
            }

            let mut revoked = None;
            self.scheduler.with_thread_suspended(owner, &mut || {
                // The word may have moved on before the suspension took
                // effect; only rewrite the bias we suspended the owner for.
                let current = cell.load();
                if let LockShape::Lightweight(lw) = current.decode() {
                    if !lw.is_revoked() {
                        let b = BiasedWord::from_lightweight(lw);
                        if b.bias_owner() == owner {
                            let t = ThinWord::from_biased(b);
                            if cell.compare_exchange(current, t.as_word()).is_ok() {
                                revoked = Some(t.as_word());
                            }
                        }
                    }
                }
            });
            if let Some(word) = revoked {
                self.stats.single_revocations.fetch_add(1, Ordering::Relaxed);
                return word;
            }
        }
    }

    /// Advance the class epoch so every instance biased under the old
    /// epoch becomes rebiasable on its next acquire.
    pub fn bulk_rebias(&self, class: ClassId) {
        let state = self.registry.class_state(class);
        self.scheduler.with_world_stopped(&mut || {
            let epoch = state.epoch();
            // Bulk revocation is terminal for a class; an epoch bump must
            // not resurrect biasing.
            if !epoch.is_bulk_revocation() {
                state.set_epoch(epoch.increment());
            }
        });
        state.heuristics().notify_bulk_rebias_complete();
        self.stats.bulk_rebiases.fetch_add(1, Ordering::Relaxed);
    }

    /// Mark the class so no instance ever biases again.
    ///
    /// Existing biased words are revoked lazily as they are touched; the
    /// class marker alone keeps new biases from forming.
    pub fn bulk_revoke(&self, class: ClassId) {
        let state = self.registry.class_state(class);
        self.scheduler.with_world_stopped(&mut || {
            state.set_epoch(BiasedLockEpoch::BULK_REVOCATION);
        });
        self.stats.bulk_revocations.fetch_add(1, Ordering::Relaxed);
    }
}

// =============================================================================
// Tests
// =============================================================================
