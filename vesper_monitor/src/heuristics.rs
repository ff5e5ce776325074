//! Contention heuristics for biased-lock revocation.
//!
//! Each class carries one heuristics instance. Every contended bias reports
//! in through [`BiasedLockRevocationHeuristics::notify_contention_revocation_request`],
//! which classifies the event:
//!
//! - most contention is an isolated incident: revoke this one object's bias
//! - a class crossing the rebias threshold is being passed between threads:
//!   rebias the whole class (bump its epoch) instead of revoking one by one
//! - a class crossing the revocation threshold contends for real: disable
//!   biasing for the class outright
//!
//! A class whose count sits in the warm band `[rebias, revocation)` cools
//! back to zero if enough wall-clock time passes after a bulk rebias. A
//! count that has reached the revocation threshold never decays; that state
//! is terminal by design.
//!
//! # Concurrency
//!
//! The counter is a plain atomic; many threads may report concurrently.
//! Which thread observes a threshold crossing is inherently racy, so the
//! bulk decisions are delivered at-least-once and the actions behind them
//! must be idempotent (they run under the world lock).

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

// =============================================================================
// Policy constants
// =============================================================================

/// Contention count at which a class is bulk-rebiased.
pub const BULK_REBIAS_THRESHOLD: u32 = 20;
/// Contention count at which biasing is disabled for a class.
pub const BULK_REVOCATION_THRESHOLD: u32 = 40;
/// Wall-clock window after a bulk rebias in which the warm band decays.
pub const BULK_REBIAS_DECAY: Duration = Duration::from_millis(25_000);

/// Timestamp value meaning "no bulk rebias has happened yet".
const NEVER: u64 = u64::MAX;

// =============================================================================
// Revocation decision
// =============================================================================

/// What a contention event should escalate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RevocationType {
    /// Revoke the bias of the one contended object.
    SingleObjectRevocation,
    /// Bump the class epoch so every instance rebiases lazily.
    BulkRebias,
    /// Disable biasing for the class.
    BulkRevocation,
}

// =============================================================================
// Configuration
// =============================================================================

/// Tunable thresholds for the revocation heuristics.
#[derive(Debug, Clone)]
pub struct HeuristicsConfig {
    /// Contention count that triggers a bulk rebias.
    pub bulk_rebias_threshold: u32,
    /// Contention count that triggers a bulk revocation.
    pub bulk_revocation_threshold: u32,
    /// Decay window armed by a completed bulk rebias.
    pub bulk_rebias_decay: Duration,
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            bulk_rebias_threshold: BULK_REBIAS_THRESHOLD,
            bulk_revocation_threshold: BULK_REVOCATION_THRESHOLD,
            bulk_rebias_decay: BULK_REBIAS_DECAY,
        }
    }
}

impl HeuristicsConfig {
    /// Thresholds for contention-heavy workloads: give up on biasing
    /// sooner rather than paying repeated revocation safepoints.
    pub fn contended() -> Self {
        Self {
            bulk_rebias_threshold: 8,
            bulk_revocation_threshold: 16,
            ..Default::default()
        }
    }

    /// Thresholds for mostly-single-threaded workloads: tolerate more
    /// incidental contention before any bulk action.
    pub fn patient() -> Self {
        Self {
            bulk_rebias_threshold: 40,
            bulk_revocation_threshold: 80,
            bulk_rebias_decay: Duration::from_millis(60_000),
            ..Default::default()
        }
    }

    /// Validate threshold ordering.
    pub fn validate(&self) -> Result<(), HeuristicsConfigError> {
        if self.bulk_rebias_threshold == 0 {
            return Err(HeuristicsConfigError::ZeroRebiasThreshold);
        }
        if self.bulk_rebias_threshold >= self.bulk_revocation_threshold {
            return Err(HeuristicsConfigError::ThresholdOrder);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeuristicsConfigError {
    /// The rebias threshold must be at least 1.
    ZeroRebiasThreshold,
    /// The rebias threshold must be below the revocation threshold.
    ThresholdOrder,
}

impl std::fmt::Display for HeuristicsConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeuristicsConfigError::ZeroRebiasThreshold => {
                write!(f, "bulk rebias threshold must be at least 1")
            }
            HeuristicsConfigError::ThresholdOrder => {
                write!(
                    f,
                    "bulk rebias threshold must be below the bulk revocation threshold"
                )
            }
        }
    }
}

impl std::error::Error for HeuristicsConfigError {}

// =============================================================================
// Heuristics
// =============================================================================

/// Per-class revocation heuristics: a contention counter with a decay
/// window armed by completed bulk rebiases.
#[derive(Debug)]
pub struct BiasedLockRevocationHeuristics {
    /// Contention events seen so far, saturating just past the
    /// revocation threshold.
    revocation_count: AtomicU32,
    /// Monotonic milliseconds of the last completed bulk rebias,
    /// `NEVER` until one happens.
    last_bulk_rebias_millis: AtomicU64,
    config: HeuristicsConfig,
}

impl BiasedLockRevocationHeuristics {
    /// New heuristics with default thresholds.
    pub fn new() -> Self {
        Self::with_config(HeuristicsConfig::default())
    }

    /// New heuristics with custom thresholds.
    pub fn with_config(config: HeuristicsConfig) -> Self {
        Self {
            revocation_count: AtomicU32::new(0),
            last_bulk_rebias_millis: AtomicU64::new(NEVER),
            config,
        }
    }

    /// Classify a contention event against the current count.
    ///
    /// Reads the process-monotonic clock; embeddings with their own time
    /// source (and tests) use [`Self::request_at`] directly.
    #[inline]
    pub fn notify_contention_revocation_request(&self) -> RevocationType {
        self.request_at(monotonic_millis())
    }

    /// Classify a contention event at an explicit timestamp.
    pub fn request_at(&self, now_millis: u64) -> RevocationType {
        let mut count = self.revocation_count.load(Ordering::Relaxed);

        // Cool the warm band back to zero once the decay window after a
        // bulk rebias has passed. The band is half-open: a count at the
        // revocation threshold stays there for good.
        if count >= self.config.bulk_rebias_threshold
            && count < self.config.bulk_revocation_threshold
        {
            let last = self.last_bulk_rebias_millis.load(Ordering::Relaxed);
            if last != NEVER && now_millis.saturating_sub(last) > decay_millis(&self.config) {
                self.revocation_count.store(0, Ordering::Relaxed);
                count = 0;
            }
        }

        if count <= self.config.bulk_revocation_threshold {
            count = self.revocation_count.fetch_add(1, Ordering::Relaxed) + 1;
        }

        if count == self.config.bulk_rebias_threshold {
            RevocationType::BulkRebias
        } else if count == self.config.bulk_revocation_threshold {
            RevocationType::BulkRevocation
        } else {
            RevocationType::SingleObjectRevocation
        }
    }

    /// Record that a bulk rebias finished, arming the decay window.
    ///
    /// Called exactly once by whichever thread performed the rebias.
    #[inline]
    pub fn notify_bulk_rebias_complete(&self) {
        self.complete_bulk_rebias_at(monotonic_millis());
    }

    /// Record a completed bulk rebias at an explicit timestamp.
    #[inline]
    pub fn complete_bulk_rebias_at(&self, now_millis: u64) {
        debug_assert!(now_millis != NEVER);
        self.last_bulk_rebias_millis
            .store(now_millis, Ordering::Relaxed);
    }

    /// Current contention count.
    #[inline]
    pub fn revocation_count(&self) -> u32 {
        self.revocation_count.load(Ordering::Relaxed)
    }

    /// The active configuration.
    pub fn config(&self) -> &HeuristicsConfig {
        &self.config
    }
}

impl Default for BiasedLockRevocationHeuristics {
    fn default() -> Self {
        Self::new()
    }
}

fn decay_millis(config: &HeuristicsConfig) -> u64 {
    config.bulk_rebias_decay.as_millis() as u64
}

/// Milliseconds since the first use of the heuristics in this process.
fn monotonic_millis() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Configuration Tests
    // =========================================================================

    #[test]
    fn test_default_config_is_valid() {
        assert!(HeuristicsConfig::default().validate().is_ok());
        assert!(HeuristicsConfig::contended().validate().is_ok());
        assert!(HeuristicsConfig::patient().validate().is_ok());
    }

    #[test]
    fn test_threshold_order_enforced() {
        let config = HeuristicsConfig {
            bulk_rebias_threshold: 40,
            bulk_revocation_threshold: 40,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(HeuristicsConfigError::ThresholdOrder)
        );
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = HeuristicsConfig {
            bulk_rebias_threshold: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(HeuristicsConfigError::ZeroRebiasThreshold)
        );
    }

    // =========================================================================
    // Decision Sequence Tests
    // =========================================================================

    #[test]
    fn test_threshold_crossing_sequence() {
        let heuristics = BiasedLockRevocationHeuristics::new();

        for call in 1..=50u32 {
            let decision = heuristics.request_at(0);
            let expected = if call == BULK_REBIAS_THRESHOLD {
                RevocationType::BulkRebias
            } else if call == BULK_REVOCATION_THRESHOLD {
                RevocationType::BulkRevocation
            } else {
                RevocationType::SingleObjectRevocation
            };
            assert_eq!(decision, expected, "call {call}");
        }
    }

    #[test]
    fn test_count_saturates_past_revocation_threshold() {
        let heuristics = BiasedLockRevocationHeuristics::new();
        for _ in 0..200 {
            heuristics.request_at(0);
        }
        assert_eq!(
            heuristics.revocation_count(),
            BULK_REVOCATION_THRESHOLD + 1
        );
    }

    // =========================================================================
    // Decay Tests
    // =========================================================================

    #[test]
    fn test_no_decay_before_any_bulk_rebias() {
        let heuristics = BiasedLockRevocationHeuristics::new();
        for _ in 0..25 {
            heuristics.request_at(0);
        }
        // Far in the future, but no bulk rebias ever completed.
        heuristics.request_at(1_000_000);
        assert_eq!(heuristics.revocation_count(), 26);
    }

    #[test]
    fn test_warm_band_decays_after_window() {
        let heuristics = BiasedLockRevocationHeuristics::new();
        for _ in 0..25 {
            heuristics.request_at(0);
        }
        heuristics.complete_bulk_rebias_at(1_000);

        // Inside the window: no decay.
        heuristics.request_at(1_000 + 24_999);
        assert_eq!(heuristics.revocation_count(), 26);

        // Past the window: counter cools to zero, then records this event.
        let decision = heuristics.request_at(1_000 + 26_001);
        assert_eq!(decision, RevocationType::SingleObjectRevocation);
        assert_eq!(heuristics.revocation_count(), 1);
    }

    #[test]
    fn test_count_below_warm_band_never_decays() {
        let heuristics = BiasedLockRevocationHeuristics::new();
        for _ in 0..5 {
            heuristics.request_at(0);
        }
        heuristics.complete_bulk_rebias_at(0);
        heuristics.request_at(1_000_000);
        assert_eq!(heuristics.revocation_count(), 6);
    }

    #[test]
    fn test_count_at_revocation_threshold_is_terminal() {
        // The decay band is half-open: once the count reaches the
        // revocation threshold it never cools, no matter how much time
        // passes after a bulk rebias.
        let heuristics = BiasedLockRevocationHeuristics::new();
        for _ in 0..BULK_REVOCATION_THRESHOLD {
            heuristics.request_at(0);
        }
        heuristics.complete_bulk_rebias_at(0);

        let decision = heuristics.request_at(10_000_000);
        assert_eq!(decision, RevocationType::SingleObjectRevocation);
        assert_eq!(
            heuristics.revocation_count(),
            BULK_REVOCATION_THRESHOLD + 1
        );
    }

    // =========================================================================
    // Concurrency Tests
    // =========================================================================

    #[test]
    fn test_concurrent_requests_count_every_event() {
        let heuristics = std::sync::Arc::new(BiasedLockRevocationHeuristics::with_config(
            HeuristicsConfig {
                bulk_rebias_threshold: 1_000_000,
                bulk_revocation_threshold: 2_000_000,
                ..Default::default()
            },
        ));
        let mut handles = vec![];
        for _ in 0..8 {
            let h = heuristics.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..1_000 {
                    h.request_at(0);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(heuristics.revocation_count(), 8_000);
    }
}
