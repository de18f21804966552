//! Snapshot reporting: read-only views of the learned arm state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use creative_core::{ArmRecord, BanditResult};
use serde::{Deserialize, Serialize};

use crate::store::ArmStore;

/// Per-arm statistics within a segment summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmStats {
    pub candidate_id: String,
    pub impressions: u64,
    pub clicks: u64,
    pub ctr: f64,
    pub posterior_mean: f64,
    pub confidence_interval_lower: f64,
    pub confidence_interval_upper: f64,
    pub traffic_share: f64,
    pub is_leader: bool,
}

/// Aggregated view of one segment's arms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub segment: String,
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub arms: Vec<ArmStats>,
    pub computed_at: DateTime<Utc>,
}

impl SegmentSummary {
    pub fn leader(&self) -> Option<&ArmStats> {
        self.arms.iter().find(|a| a.is_leader)
    }
}

#[derive(Clone)]
pub struct SnapshotReporter {
    store: Arc<ArmStore>,
}

impl SnapshotReporter {
    pub fn new(store: Arc<ArmStore>) -> Self {
        Self { store }
    }

    /// Every arm in the store, ordered by (segment, candidate_id).
    pub fn snapshot(&self) -> Vec<ArmRecord> {
        self.store
            .enumerate()
            .into_iter()
            .map(|(key, arm)| ArmRecord::from_arm(key, &arm))
            .collect()
    }

    /// Arms of a single segment, ordered by candidate_id.
    pub fn segment_snapshot(&self, segment: &str) -> Vec<ArmRecord> {
        self.store
            .enumerate()
            .into_iter()
            .filter(|(key, _)| key.segment == segment)
            .map(|(key, arm)| ArmRecord::from_arm(key, &arm))
            .collect()
    }

    pub fn segment_summary(&self, segment: &str) -> SegmentSummary {
        let records = self.segment_snapshot(segment);
        let total_impressions: u64 = records.iter().map(|r| r.impressions).sum();
        let total_clicks: u64 = records.iter().map(|r| r.clicks).sum();

        let mut arms: Vec<ArmStats> = records
            .iter()
            .map(|r| {
                let ci_width = if r.impressions > 0 {
                    1.96 * (r.ctr * (1.0 - r.ctr) / r.impressions as f64).sqrt()
                } else {
                    0.5
                };
                let traffic_share = if total_impressions > 0 {
                    r.impressions as f64 / total_impressions as f64
                } else {
                    1.0 / records.len() as f64
                };
                ArmStats {
                    candidate_id: r.candidate_id.clone(),
                    impressions: r.impressions,
                    clicks: r.clicks,
                    ctr: r.ctr,
                    posterior_mean: r.arm().posterior_mean(),
                    confidence_interval_lower: (r.ctr - ci_width).max(0.0),
                    confidence_interval_upper: (r.ctr + ci_width).min(1.0),
                    traffic_share,
                    is_leader: false,
                }
            })
            .collect();

        let mut leader: Option<usize> = None;
        for (idx, stats) in arms.iter().enumerate() {
            match leader {
                Some(best) if arms[best].posterior_mean >= stats.posterior_mean => {}
                _ => leader = Some(idx),
            }
        }
        if let Some(idx) = leader {
            arms[idx].is_leader = true;
        }

        SegmentSummary {
            segment: segment.to_string(),
            total_impressions,
            total_clicks,
            arms,
            computed_at: Utc::now(),
        }
    }

    /// Snapshot serialized as a JSON array of flat records.
    pub fn to_json(&self) -> BanditResult<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> Arc<ArmStore> {
        let store = Arc::new(ArmStore::new());
        for _ in 0..3 {
            store.apply_update("US", "A", true);
        }
        store.apply_update("US", "B", false);
        store.ensure("IN", "C");
        store
    }

    #[test]
    fn test_snapshot_fields_and_order() {
        let reporter = SnapshotReporter::new(seeded_store());
        let rows = reporter.snapshot();

        let keys: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.segment.as_str(), r.candidate_id.as_str()))
            .collect();
        assert_eq!(keys, vec![("IN", "C"), ("US", "A"), ("US", "B")]);

        assert_eq!(rows[0].ctr, 0.0);
        assert_eq!(rows[1].alpha, 4.0);
        assert_eq!(rows[1].ctr, 1.0);
        assert_eq!(rows[2].beta, 2.0);
        assert_eq!(rows[2].ctr, 0.0);
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let store = seeded_store();
        let reporter = SnapshotReporter::new(store.clone());
        let before = store.enumerate();

        let _ = reporter.snapshot();
        let _ = reporter.segment_summary("US");
        let _ = reporter.segment_summary("nowhere");
        let _ = reporter.to_json().unwrap();

        assert_eq!(store.enumerate(), before);
    }

    #[test]
    fn test_segment_summary_marks_leader() {
        let reporter = SnapshotReporter::new(seeded_store());
        let summary = reporter.segment_summary("US");

        assert_eq!(summary.total_impressions, 4);
        assert_eq!(summary.total_clicks, 3);
        assert_eq!(summary.leader().unwrap().candidate_id, "A");
        assert!((summary.arms[0].traffic_share - 0.75).abs() < 1e-9);
        assert!(summary.arms[0].confidence_interval_upper <= 1.0);
    }

    #[test]
    fn test_summary_without_impressions_is_uniform() {
        let store = Arc::new(ArmStore::new());
        store.ensure("US", "A");
        store.ensure("US", "B");
        let summary = SnapshotReporter::new(store).segment_summary("US");

        assert_eq!(summary.arms[0].traffic_share, 0.5);
        assert_eq!(summary.arms[0].confidence_interval_upper, 0.5);
        assert_eq!(summary.leader().unwrap().candidate_id, "A");
    }

    #[test]
    fn test_to_json_is_flat_array() {
        let reporter = SnapshotReporter::new(seeded_store());
        let json: serde_json::Value = serde_json::from_str(&reporter.to_json().unwrap()).unwrap();

        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1]["candidate_id"], "A");
        assert_eq!(rows[1]["clicks"], 3);
    }
}
