use serde::{Deserialize, Serialize};

// ─── Arm State ──────────────────────────────────────────────────────────

/// Identity of one arm: a candidate creative within one audience segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArmKey {
    pub segment: String,
    pub candidate_id: String,
}

impl ArmKey {
    pub fn new(segment: impl Into<String>, candidate_id: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            candidate_id: candidate_id.into(),
        }
    }
}

impl std::fmt::Display for ArmKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.segment, self.candidate_id)
    }
}

/// Beta-Bernoulli belief about the click probability of one arm.
///
/// `alpha = 1 + clicks` and `beta = 1 + (impressions - clicks)` always hold;
/// the only way to change an arm is [`Arm::record`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arm {
    pub alpha: f64,
    pub beta: f64,
    pub impressions: u64,
    pub clicks: u64,
}

impl Arm {
    /// Uniform Beta(1, 1) prior with no observations.
    pub const PRIOR: Arm = Arm {
        alpha: 1.0,
        beta: 1.0,
        impressions: 0,
        clicks: 0,
    };

    /// Fold one observed outcome into the posterior.
    pub fn record(&mut self, clicked: bool) {
        if clicked {
            self.alpha += 1.0;
            self.clicks += 1;
        } else {
            self.beta += 1.0;
        }
        self.impressions += 1;
    }

    /// Observed click-through rate, `0.0` before the first impression.
    pub fn ctr(&self) -> f64 {
        if self.impressions > 0 {
            self.clicks as f64 / self.impressions as f64
        } else {
            0.0
        }
    }

    /// Mean of the Beta posterior.
    pub fn posterior_mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    pub fn failures(&self) -> u64 {
        self.impressions - self.clicks
    }
}

impl Default for Arm {
    fn default() -> Self {
        Self::PRIOR
    }
}

// ─── Snapshot Rows ──────────────────────────────────────────────────────

/// One flat row of a performance snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmRecord {
    pub segment: String,
    pub candidate_id: String,
    pub alpha: f64,
    pub beta: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub ctr: f64,
}

impl ArmRecord {
    pub fn from_arm(key: ArmKey, arm: &Arm) -> Self {
        Self {
            segment: key.segment,
            candidate_id: key.candidate_id,
            alpha: arm.alpha,
            beta: arm.beta,
            impressions: arm.impressions,
            clicks: arm.clicks,
            ctr: arm.ctr(),
        }
    }

    pub fn arm(&self) -> Arm {
        Arm {
            alpha: self.alpha,
            beta: self.beta,
            impressions: self.impressions,
            clicks: self.clicks,
        }
    }
}

// ─── Simulation Inputs ──────────────────────────────────────────────────

/// A candidate as seen by the offline simulator: its identity plus the
/// externally supplied signals that drive the synthetic click model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimCandidate {
    pub id: String,
    pub latent_quality: f64,
    #[serde(default)]
    pub cultural_match: bool,
    #[serde(default = "default_contrast_ok")]
    pub contrast_ok: bool,
}

fn default_contrast_ok() -> bool {
    true
}

impl SimCandidate {
    pub fn new(id: impl Into<String>, latent_quality: f64) -> Self {
        Self {
            id: id.into(),
            latent_quality,
            cultural_match: false,
            contrast_ok: default_contrast_ok(),
        }
    }

    pub fn with_cultural_match(mut self, cultural_match: bool) -> Self {
        self.cultural_match = cultural_match;
        self
    }

    pub fn with_contrast_ok(mut self, contrast_ok: bool) -> Self {
        self.contrast_ok = contrast_ok;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_shape_parameters_in_sync() {
        let mut arm = Arm::default();
        arm.record(true);
        arm.record(false);
        arm.record(true);

        assert_eq!(arm.impressions, 3);
        assert_eq!(arm.clicks, 2);
        assert_eq!(arm.alpha, 1.0 + arm.clicks as f64);
        assert_eq!(arm.beta, 1.0 + arm.failures() as f64);
    }

    #[test]
    fn test_ctr_without_impressions_is_zero() {
        assert_eq!(Arm::PRIOR.ctr(), 0.0);
        assert!((Arm::PRIOR.posterior_mean() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_serializes_flat() {
        let mut arm = Arm::default();
        arm.record(true);
        let record = ArmRecord::from_arm(ArmKey::new("IN", "C1-IN"), &arm);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["segment"], "IN");
        assert_eq!(json["candidate_id"], "C1-IN");
        assert_eq!(json["alpha"], 2.0);
        assert_eq!(json["impressions"], 1);
        assert_eq!(json["ctr"], 1.0);
        assert_eq!(record.arm(), arm);
    }

    #[test]
    fn test_sim_candidate_defaults() {
        let c: SimCandidate =
            serde_json::from_str(r#"{"id":"A","latent_quality":0.9}"#).unwrap();
        assert!(!c.cultural_match);
        assert!(c.contrast_ok);
    }
}
