//! Per-class bias state.
//!
//! Each class carries its current bias epoch and its revocation
//! heuristics; both live here, keyed by [`ClassId`] in a concurrent map
//! that creates state lazily on first contact with a class.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use vesper_core::ClassId;

use crate::epoch::BiasedLockEpoch;
use crate::heuristics::{BiasedLockRevocationHeuristics, HeuristicsConfig};

/// One class's bias epoch and revocation heuristics.
#[derive(Debug)]
pub struct ClassBiasState {
    /// Current epoch, stored in the low bits.
    ///
    /// Written only under the world lock (bulk rebias / bulk revoke);
    /// read concurrently by every lock fast path.
    epoch: AtomicU32,
    heuristics: BiasedLockRevocationHeuristics,
}

impl ClassBiasState {
    /// Fresh state: epoch `UNUSED`, zero contention history.
    pub fn new(config: HeuristicsConfig) -> Self {
        Self {
            epoch: AtomicU32::new(BiasedLockEpoch::UNUSED.to_bits() as u32),
            heuristics: BiasedLockRevocationHeuristics::with_config(config),
        }
    }

    /// The class's current epoch.
    #[inline]
    pub fn epoch(&self) -> BiasedLockEpoch {
        BiasedLockEpoch::from_bits(self.epoch.load(Ordering::Acquire) as u16)
    }

    /// Whether biasing has been disabled for this class.
    #[inline]
    pub fn biasing_disabled(&self) -> bool {
        self.epoch().is_bulk_revocation()
    }

    /// The class's revocation heuristics.
    #[inline]
    pub fn heuristics(&self) -> &BiasedLockRevocationHeuristics {
        &self.heuristics
    }

    /// Replace the epoch. Callers hold the world lock.
    #[inline]
    pub(crate) fn set_epoch(&self, epoch: BiasedLockEpoch) {
        self.epoch.store(epoch.to_bits() as u32, Ordering::Release);
    }
}

/// Lazily populated map from class to bias state.
#[derive(Debug)]
pub struct BiasRegistry {
    classes: DashMap<ClassId, Arc<ClassBiasState>>,
    config: HeuristicsConfig,
}

impl BiasRegistry {
    /// A registry with default heuristics thresholds.
    pub fn new() -> Self {
        Self::with_config(HeuristicsConfig::default())
    }

    /// A registry whose classes share the given heuristics thresholds.
    pub fn with_config(config: HeuristicsConfig) -> Self {
        Self {
            classes: DashMap::new(),
            config,
        }
    }

    /// The state for `class`, created on first touch.
    pub fn class_state(&self, class: ClassId) -> Arc<ClassBiasState> {
        if let Some(state) = self.classes.get(&class) {
            return Arc::clone(&state);
        }
        Arc::clone(
            &self
                .classes
                .entry(class)
                .or_insert_with(|| Arc::new(ClassBiasState::new(self.config.clone()))),
        )
    }

    /// Number of classes with bias state.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no class has bias state yet.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for BiasRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_created_on_first_touch() {
        let registry = BiasRegistry::new();
        assert!(registry.is_empty());

        let state = registry.class_state(ClassId::new(3));
        assert_eq!(state.epoch(), BiasedLockEpoch::UNUSED);
        assert_eq!(registry.len(), 1);

        // Same class, same state.
        let again = registry.class_state(ClassId::new(3));
        assert!(Arc::ptr_eq(&state, &again));
    }

    #[test]
    fn test_epoch_updates_visible_through_registry() {
        let registry = BiasRegistry::new();
        let state = registry.class_state(ClassId::new(1));
        state.set_epoch(BiasedLockEpoch::MIN);
        assert_eq!(
            registry.class_state(ClassId::new(1)).epoch(),
            BiasedLockEpoch::MIN
        );
        assert!(!state.biasing_disabled());

        state.set_epoch(BiasedLockEpoch::BULK_REVOCATION);
        assert!(state.biasing_disabled());
    }

    #[test]
    fn test_concurrent_first_touch_yields_one_state() {
        let registry = Arc::new(BiasRegistry::new());
        let mut handles = vec![];
        for _ in 0..8 {
            let r = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                r.class_state(ClassId::new(9));
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 1);
    }
}
