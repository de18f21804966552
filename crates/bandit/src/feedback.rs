//! Feedback processing: folds click / no-click outcomes into arm state.

use std::sync::Arc;

use creative_core::{Arm, BanditError, BanditResult, FeedbackPolicy};
use tracing::debug;

use crate::store::ArmStore;

/// Applies observed outcomes to the arm store.
///
/// Under [`FeedbackPolicy::Lenient`] feedback for an arm that was never
/// selected creates it with default priors and applies the outcome on top.
/// [`FeedbackPolicy::Strict`] rejects such feedback instead.
#[derive(Clone)]
pub struct FeedbackProcessor {
    store: Arc<ArmStore>,
    policy: FeedbackPolicy,
}

impl FeedbackProcessor {
    pub fn new(store: Arc<ArmStore>, policy: FeedbackPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> FeedbackPolicy {
        self.policy
    }

    /// Record one outcome and return the arm state right after it.
    pub fn update(&self, segment: &str, candidate_id: &str, clicked: bool) -> BanditResult<Arm> {
        if segment.is_empty() || candidate_id.is_empty() {
            return Err(BanditError::InvalidInput(
                "feedback requires a segment and a candidate id".into(),
            ));
        }

        let arm = match self.policy {
            FeedbackPolicy::Lenient => {
                if self.store.get(segment, candidate_id).is_none() {
                    metrics::counter!("bandit.feedback.orphan").increment(1);
                    debug!(
                        segment,
                        candidate_id,
                        "feedback for unseen arm, creating with default priors"
                    );
                }
                self.store.apply_update(segment, candidate_id, clicked)
            }
            FeedbackPolicy::Strict => self
                .store
                .apply_existing(segment, candidate_id, clicked)
                .ok_or_else(|| {
                    metrics::counter!("bandit.feedback.rejected").increment(1);
                    BanditError::UnknownArm {
                        segment: segment.to_string(),
                        candidate_id: candidate_id.to_string(),
                    }
                })?,
        };

        metrics::counter!("bandit.feedback.applied").increment(1);
        if clicked {
            metrics::counter!("bandit.feedback.clicks").increment(1);
        }
        debug!(
            segment,
            candidate_id,
            clicked,
            impressions = arm.impressions,
            clicks = arm.clicks,
            "feedback applied"
        );
        Ok(arm)
    }
}
