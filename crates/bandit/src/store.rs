//! Arm store: sharded, concurrency-safe map from (segment, candidate) to
//! Beta-Bernoulli belief state.

use creative_core::{Arm, ArmKey, BanditError, BanditResult};
use dashmap::DashMap;

/// Owns every [`Arm`] in the engine.
///
/// Each shard of the underlying map has its own `RwLock`, so readers and
/// writers on keys in different shards never contend, while updates to the
/// same key serialize on that key's shard write lock.
pub struct ArmStore {
    arms: DashMap<ArmKey, Arm>,
}

impl ArmStore {
    pub fn new() -> Self {
        Self {
            arms: DashMap::new(),
        }
    }

    /// Build a store with an explicit shard count (power of two, > 1).
    pub fn with_shard_amount(shard_amount: usize) -> BanditResult<Self> {
        if shard_amount < 2 || !shard_amount.is_power_of_two() {
            return Err(BanditError::Config(format!(
                "shard_amount must be a power of two greater than 1, got {shard_amount}"
            )));
        }
        Ok(Self {
            arms: DashMap::with_shard_amount(shard_amount),
        })
    }

    /// Create the arm with the uniform prior if it does not exist yet.
    pub fn ensure(&self, segment: &str, candidate_id: &str) {
        self.arms
            .entry(ArmKey::new(segment, candidate_id))
            .or_insert(Arm::PRIOR);
    }

    /// Current state of an arm, creating it on first reference.
    pub fn read(&self, segment: &str, candidate_id: &str) -> Arm {
        *self
            .arms
            .entry(ArmKey::new(segment, candidate_id))
            .or_insert(Arm::PRIOR)
    }

    /// Current state of an arm without creating it.
    pub fn get(&self, segment: &str, candidate_id: &str) -> Option<Arm> {
        self.arms
            .get(&ArmKey::new(segment, candidate_id))
            .map(|arm| *arm)
    }

    /// Fold one outcome into an arm, creating it first if absent.
    /// Returns the state right after this update.
    pub fn apply_update(&self, segment: &str, candidate_id: &str, clicked: bool) -> Arm {
        let mut arm = self
            .arms
            .entry(ArmKey::new(segment, candidate_id))
            .or_insert(Arm::PRIOR);
        arm.record(clicked);
        *arm
    }

    /// Fold one outcome into an arm only if it already exists.
    pub fn apply_existing(&self, segment: &str, candidate_id: &str, clicked: bool) -> Option<Arm> {
        let mut arm = self.arms.get_mut(&ArmKey::new(segment, candidate_id))?;
        arm.record(clicked);
        Some(*arm)
    }

    /// Point-in-time copy of every arm, sorted by (segment, candidate_id).
    ///
    /// Each arm is copied whole while its shard read lock is held, so no
    /// record mixes fields from before and after an update.
    pub fn enumerate(&self) -> Vec<(ArmKey, Arm)> {
        let mut rows: Vec<(ArmKey, Arm)> = self
            .arms
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }

    /// Distinct segments that have at least one arm, sorted.
    pub fn segments(&self) -> Vec<String> {
        let mut segments: Vec<String> = self
            .arms
            .iter()
            .map(|entry| entry.key().segment.clone())
            .collect();
        segments.sort();
        segments.dedup();
        segments
    }

    pub fn len(&self) -> usize {
        self.arms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }
}

impl Default for ArmStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_is_idempotent() {
        let store = ArmStore::new();
        store.ensure("US", "A");
        store.apply_update("US", "A", true);
        store.ensure("US", "A");

        assert_eq!(store.len(), 1);
        assert_eq!(store.read("US", "A").clicks, 1);
    }

    #[test]
    fn test_read_creates_default_arm() {
        let store = ArmStore::new();
        assert!(store.get("US", "A").is_none());

        assert_eq!(store.read("US", "A"), Arm::PRIOR);
        assert_eq!(store.get("US", "A"), Some(Arm::PRIOR));
    }

    #[test]
    fn test_apply_update_increments_counts() {
        let store = ArmStore::new();
        store.apply_update("IN", "A", true);
        let arm = store.apply_update("IN", "A", false);

        assert_eq!(arm.alpha, 2.0);
        assert_eq!(arm.beta, 2.0);
        assert_eq!(arm.impressions, 2);
        assert_eq!(arm.clicks, 1);
    }

    #[test]
    fn test_apply_existing_skips_missing_arm() {
        let store = ArmStore::new();
        assert!(store.apply_existing("IN", "ghost", true).is_none());
        assert!(store.is_empty());

        store.ensure("IN", "A");
        let arm = store.apply_existing("IN", "A", true).unwrap();
        assert_eq!(arm.clicks, 1);
    }

    #[test]
    fn test_segments_distinguish_same_candidate() {
        let store = ArmStore::new();
        store.apply_update("US", "A", true);
        store.ensure("IN", "A");

        assert_eq!(store.read("IN", "A"), Arm::PRIOR);
        assert_eq!(store.segments(), vec!["IN".to_string(), "US".to_string()]);
    }

    #[test]
    fn test_enumerate_is_sorted_and_pure() {
        let store = ArmStore::new();
        store.ensure("US", "B");
        store.ensure("US", "A");
        store.ensure("IN", "Z");

        let first = store.enumerate();
        let keys: Vec<String> = first.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["IN/Z", "US/A", "US/B"]);

        let _ = store.read("US", "A");
        assert_eq!(store.enumerate(), first);
    }

    #[test]
    fn test_shard_amount_validation() {
        assert!(ArmStore::with_shard_amount(8).is_ok());
        assert!(matches!(
            ArmStore::with_shard_amount(6),
            Err(BanditError::Config(_))
        ));
        assert!(ArmStore::with_shard_amount(1).is_err());
    }
}
