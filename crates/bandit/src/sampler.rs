//! Thompson Sampling over the arms of one segment.

use std::collections::HashSet;
use std::sync::Arc;

use creative_core::{BanditError, BanditResult};
use rand::Rng;
use rand_distr::{Distribution, Gamma};
use tracing::debug;

use crate::store::ArmStore;

/// Picks the next creative for a segment by sampling each candidate's
/// Beta posterior and taking the highest draw.
#[derive(Clone)]
pub struct Sampler {
    store: Arc<ArmStore>,
}

impl Sampler {
    pub fn new(store: Arc<ArmStore>) -> Self {
        Self { store }
    }

    /// Select one of `candidate_ids` for `segment`.
    ///
    /// Input is validated before any arm is touched. Ties on the sampled
    /// value go to the candidate listed first.
    pub fn choose<R: Rng + ?Sized>(
        &self,
        segment: &str,
        candidate_ids: &[String],
        rng: &mut R,
    ) -> BanditResult<String> {
        let idx = self.choose_index(segment, candidate_ids, rng)?;
        Ok(candidate_ids[idx].clone())
    }

    /// Same as [`Sampler::choose`], returning the position in `candidate_ids`.
    pub fn choose_index<R: Rng + ?Sized>(
        &self,
        segment: &str,
        candidate_ids: &[String],
        rng: &mut R,
    ) -> BanditResult<usize> {
        if let Err(e) = validate_candidates(segment, candidate_ids) {
            metrics::counter!("bandit.invalid_input").increment(1);
            return Err(e);
        }

        let mut best_sample = f64::NEG_INFINITY;
        let mut best_idx = 0;

        for (idx, candidate_id) in candidate_ids.iter().enumerate() {
            let arm = self.store.read(segment, candidate_id);
            let sample = sample_beta(arm.alpha, arm.beta, rng)?;
            if sample > best_sample {
                best_sample = sample;
                best_idx = idx;
            }
        }

        metrics::counter!("bandit.selections").increment(1);
        metrics::histogram!("bandit.choose.candidates").record(candidate_ids.len() as f64);
        debug!(
            segment,
            candidate_id = %candidate_ids[best_idx],
            theta = best_sample,
            candidates = candidate_ids.len(),
            "creative selected"
        );
        Ok(best_idx)
    }
}

/// Reject empty keys, empty candidate lists and duplicate candidates.
pub fn validate_candidates(segment: &str, candidate_ids: &[String]) -> BanditResult<()> {
    if segment.is_empty() {
        return Err(BanditError::InvalidInput("segment must not be empty".into()));
    }
    if candidate_ids.is_empty() {
        return Err(BanditError::InvalidInput(format!(
            "no candidates supplied for segment {segment}"
        )));
    }
    let mut seen = HashSet::with_capacity(candidate_ids.len());
    for candidate_id in candidate_ids {
        if candidate_id.is_empty() {
            return Err(BanditError::InvalidInput(
                "candidate id must not be empty".into(),
            ));
        }
        if !seen.insert(candidate_id.as_str()) {
            return Err(BanditError::InvalidInput(format!(
                "duplicate candidate {candidate_id} for segment {segment}"
            )));
        }
    }
    Ok(())
}

/// Draw from Beta(alpha, beta) as `X / (X + Y)` with `X ~ Gamma(alpha, 1)`
/// drawn before `Y ~ Gamma(beta, 1)` on the same stream.
pub fn sample_beta<R: Rng + ?Sized>(alpha: f64, beta: f64, rng: &mut R) -> BanditResult<f64> {
    let x = gamma(alpha)?.sample(rng);
    let y = gamma(beta)?.sample(rng);

    if x + y > 0.0 {
        Ok(x / (x + y))
    } else {
        Ok(0.5)
    }
}

// Marsaglia-Tsang for shape >= 1.
fn gamma(shape: f64) -> BanditResult<Gamma<f64>> {
    if !shape.is_finite() || shape <= 0.0 {
        return Err(BanditError::NumericDomain(format!(
            "gamma shape must be finite and positive, got {shape}"
        )));
    }
    Gamma::new(shape, 1.0).map_err(|e| BanditError::NumericDomain(e.to_string()))
}
