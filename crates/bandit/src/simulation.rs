//! Offline simulator: drives the sampler and feedback processor against a
//! synthetic click model to check that the bandit converges on the best
//! creative.

use std::collections::BTreeMap;

use creative_core::config::SimulationConfig;
use creative_core::{BanditError, BanditResult, SimCandidate};
use rand::{Rng, RngCore};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::feedback::FeedbackProcessor;
use crate::sampler::{validate_candidates, Sampler};

// ─── Click Models ───────────────────────────────────────────────────────

/// Assigns a click probability to a served candidate.
pub trait ClickModel {
    fn click_probability(&self, candidate: &SimCandidate, rng: &mut dyn RngCore) -> f64;
}

/// `p = clamp(sigmoid(z), min, max)` with
/// `z = intercept + w_q·quality + w_c·cultural_match + w_k·contrast_ok + noise`.
#[derive(Debug, Clone)]
pub struct LogisticClickModel {
    intercept: f64,
    quality_weight: f64,
    cultural_weight: f64,
    contrast_weight: f64,
    noise: Normal<f64>,
    min_probability: f64,
    max_probability: f64,
}

impl LogisticClickModel {
    pub fn from_config(config: &SimulationConfig) -> BanditResult<Self> {
        let noise = Normal::new(0.0, config.noise_std)
            .map_err(|e| BanditError::NumericDomain(format!("noise_std: {e}")))?;
        if !(0.0..=1.0).contains(&config.min_click_probability)
            || !(0.0..=1.0).contains(&config.max_click_probability)
            || config.min_click_probability > config.max_click_probability
        {
            return Err(BanditError::Config(format!(
                "click probability bounds [{}, {}] must be an ordered range inside [0, 1]",
                config.min_click_probability, config.max_click_probability
            )));
        }
        Ok(Self {
            intercept: config.intercept,
            quality_weight: config.quality_weight,
            cultural_weight: config.cultural_weight,
            contrast_weight: config.contrast_weight,
            noise,
            min_probability: config.min_click_probability,
            max_probability: config.max_click_probability,
        })
    }

    fn logit(&self, candidate: &SimCandidate) -> f64 {
        self.intercept
            + self.quality_weight * candidate.latent_quality
            + self.cultural_weight * indicator(candidate.cultural_match)
            + self.contrast_weight * indicator(candidate.contrast_ok)
    }
}

impl ClickModel for LogisticClickModel {
    fn click_probability(&self, candidate: &SimCandidate, rng: &mut dyn RngCore) -> f64 {
        let z = self.logit(candidate) + self.noise.sample(rng);
        sigmoid(z).clamp(self.min_probability, self.max_probability)
    }
}

fn indicator(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

// ─── Segment Signals ────────────────────────────────────────────────────

/// Derives the external simulation signals for a segment's candidates.
#[derive(Debug, Clone)]
pub struct SegmentSignals {
    culturally_matched: Vec<String>,
    default_quality: f64,
}

impl SegmentSignals {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            culturally_matched: config.culturally_matched_segments.clone(),
            default_quality: config.default_quality,
        }
    }

    pub fn cultural_match(&self, segment: &str) -> bool {
        self.culturally_matched.iter().any(|s| s == segment)
    }

    /// Candidate for `segment` with the segment's cultural signal and
    /// contrast assumed ok. Missing quality falls back to the default.
    pub fn candidate(&self, segment: &str, id: &str, quality: Option<f64>) -> SimCandidate {
        SimCandidate::new(id, quality.unwrap_or(self.default_quality))
            .with_cultural_match(self.cultural_match(segment))
    }
}

// ─── Simulation Engine ──────────────────────────────────────────────────

/// Aggregate outcome of one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub run_id: Uuid,
    pub segment: String,
    pub iterations: u64,
    pub total_clicks: u64,
    pub selections: BTreeMap<String, u64>,
    pub clicks: BTreeMap<String, u64>,
}

impl SimulationReport {
    pub fn selection_share(&self, candidate_id: &str) -> f64 {
        if self.iterations == 0 {
            return 0.0;
        }
        self.selections.get(candidate_id).copied().unwrap_or(0) as f64 / self.iterations as f64
    }

    pub fn observed_ctr(&self) -> f64 {
        if self.iterations == 0 {
            return 0.0;
        }
        self.total_clicks as f64 / self.iterations as f64
    }
}

pub struct SimulationEngine<M: ClickModel = LogisticClickModel> {
    sampler: Sampler,
    feedback: FeedbackProcessor,
    model: M,
}

impl<M: ClickModel> SimulationEngine<M> {
    pub fn new(sampler: Sampler, feedback: FeedbackProcessor, model: M) -> Self {
        Self {
            sampler,
            feedback,
            model,
        }
    }

    /// Run `iterations` select → observe → update rounds for one segment.
    ///
    /// Per round the stream is consumed in a fixed order: the Beta draws of
    /// the selection, then the click model's noise, then the Bernoulli draw.
    pub fn run<R: RngCore>(
        &self,
        segment: &str,
        candidates: &[SimCandidate],
        iterations: u64,
        rng: &mut R,
    ) -> BanditResult<SimulationReport> {
        if iterations == 0 {
            return Err(BanditError::InvalidInput(
                "simulation needs at least one iteration".into(),
            ));
        }
        let ids: Vec<String> = candidates.iter().map(|c| c.id.clone()).collect();
        validate_candidates(segment, &ids)?;

        let run_id = Uuid::new_v4();
        info!(%run_id, segment, candidates = ids.len(), iterations, "simulation started");

        let mut selections: BTreeMap<String, u64> = ids.iter().map(|id| (id.clone(), 0)).collect();
        let mut clicks = selections.clone();
        let mut total_clicks = 0u64;

        for _ in 0..iterations {
            let idx = self.sampler.choose_index(segment, &ids, rng)?;
            let candidate = &candidates[idx];

            let p = self.model.click_probability(candidate, rng);
            let clicked = rng.gen::<f64>() < p;
            self.feedback.update(segment, &candidate.id, clicked)?;

            *selections.entry(candidate.id.clone()).or_default() += 1;
            if clicked {
                *clicks.entry(candidate.id.clone()).or_default() += 1;
                total_clicks += 1;
            }
        }

        let report = SimulationReport {
            run_id,
            segment: segment.to_string(),
            iterations,
            total_clicks,
            selections,
            clicks,
        };
        info!(
            %run_id,
            segment,
            total_clicks,
            observed_ctr = report.observed_ctr(),
            "simulation finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ArmStore;
    use creative_core::FeedbackPolicy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn engine(store: Arc<ArmStore>) -> SimulationEngine {
        let model = LogisticClickModel::from_config(&SimulationConfig::default()).unwrap();
        SimulationEngine::new(
            Sampler::new(store.clone()),
            FeedbackProcessor::new(store, FeedbackPolicy::Lenient),
            model,
        )
    }

    #[test]
    fn test_click_probability_is_clamped() {
        let model = LogisticClickModel::from_config(&SimulationConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let terrible = SimCandidate::new("low", -10.0).with_contrast_ok(false);
        let superb = SimCandidate::new("high", 10.0).with_cultural_match(true);
        for _ in 0..100 {
            assert_eq!(model.click_probability(&terrible, &mut rng), 0.01);
            assert_eq!(model.click_probability(&superb, &mut rng), 0.90);
        }
    }

    #[test]
    fn test_noise_free_probability_matches_formula() {
        let config = SimulationConfig {
            noise_std: 0.0,
            ..Default::default()
        };
        let model = LogisticClickModel::from_config(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let c = SimCandidate::new("A", 0.6).with_cultural_match(true);

        let expected = sigmoid(-2.0 + 1.6 * 0.6 + 0.8 + 0.4);
        assert!((model.click_probability(&c, &mut rng) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_probability_bounds() {
        let config = SimulationConfig {
            min_click_probability: 0.9,
            max_click_probability: 0.1,
            ..Default::default()
        };
        assert!(matches!(
            LogisticClickModel::from_config(&config),
            Err(BanditError::Config(_))
        ));
    }

    #[test]
    fn test_segment_signals() {
        let signals = SegmentSignals::from_config(&SimulationConfig::default());
        assert!(signals.cultural_match("IN"));
        assert!(!signals.cultural_match("US"));

        let c = signals.candidate("IN", "C1-IN", None);
        assert_eq!(c.latent_quality, 0.6);
        assert!(c.cultural_match);
        assert!(c.contrast_ok);
    }

    #[test]
    fn test_run_counts_add_up() {
        let store = Arc::new(ArmStore::new());
        let sim = engine(store.clone());
        let mut rng = StdRng::seed_from_u64(7);
        let candidates = vec![SimCandidate::new("A", 0.9), SimCandidate::new("B", 0.2)];

        let report = sim.run("US", &candidates, 300, &mut rng).unwrap();

        assert_eq!(report.selections.values().sum::<u64>(), 300);
        assert_eq!(report.clicks.values().sum::<u64>(), report.total_clicks);
        let impressions: u64 = store.enumerate().iter().map(|(_, a)| a.impressions).sum();
        let clicks: u64 = store.enumerate().iter().map(|(_, a)| a.clicks).sum();
        assert_eq!(impressions, 300);
        assert_eq!(clicks, report.total_clicks);
    }

    #[test]
    fn test_run_rejects_bad_input() {
        let store = Arc::new(ArmStore::new());
        let sim = engine(store.clone());
        let mut rng = StdRng::seed_from_u64(7);

        assert!(sim.run("US", &[SimCandidate::new("A", 0.5)], 0, &mut rng).is_err());
        assert!(sim.run("US", &[], 10, &mut rng).is_err());
        let dup = vec![SimCandidate::new("A", 0.5), SimCandidate::new("A", 0.1)];
        assert!(sim.run("US", &dup, 10, &mut rng).is_err());
        assert!(store.is_empty());
    }
}
