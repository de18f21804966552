use std::sync::Arc;

use creative_core::{Arm, ArmRecord, BanditResult, EngineConfig, FeedbackPolicy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::feedback::FeedbackProcessor;
use crate::sampler::Sampler;
use crate::simulation::{LogisticClickModel, SimulationEngine};
use crate::snapshot::{SegmentSummary, SnapshotReporter};
use crate::store::ArmStore;

/// One explicitly constructed bandit: a single arm store shared by the
/// sampler, feedback processor and snapshot reporter.
///
/// `BanditEngine` is `Send + Sync`; share it across serving threads with
/// an `Arc`. Each caller supplies its own random source.
pub struct BanditEngine {
    store: Arc<ArmStore>,
    sampler: Sampler,
    feedback: FeedbackProcessor,
    reporter: SnapshotReporter,
}

impl BanditEngine {
    /// Lenient engine with default store sharding.
    pub fn new() -> Self {
        Self::with_store(Arc::new(ArmStore::new()), FeedbackPolicy::Lenient)
    }

    pub fn with_store(store: Arc<ArmStore>, policy: FeedbackPolicy) -> Self {
        Self {
            sampler: Sampler::new(store.clone()),
            feedback: FeedbackProcessor::new(store.clone(), policy),
            reporter: SnapshotReporter::new(store.clone()),
            store,
        }
    }

    pub fn from_config(config: &EngineConfig) -> BanditResult<Self> {
        let store = match config.store.shard_amount {
            Some(shards) => ArmStore::with_shard_amount(shards)?,
            None => ArmStore::new(),
        };
        info!(
            shard_amount = ?config.store.shard_amount,
            policy = ?config.feedback.policy,
            "bandit engine initialized"
        );
        Ok(Self::with_store(Arc::new(store), config.feedback.policy))
    }

    pub fn choose<R: Rng + ?Sized>(
        &self,
        segment: &str,
        candidate_ids: &[String],
        rng: &mut R,
    ) -> BanditResult<String> {
        self.sampler.choose(segment, candidate_ids, rng)
    }

    pub fn update(&self, segment: &str, candidate_id: &str, clicked: bool) -> BanditResult<Arm> {
        self.feedback.update(segment, candidate_id, clicked)
    }

    pub fn read(&self, segment: &str, candidate_id: &str) -> Arm {
        self.store.read(segment, candidate_id)
    }

    pub fn snapshot(&self) -> Vec<ArmRecord> {
        self.reporter.snapshot()
    }

    pub fn segment_summary(&self, segment: &str) -> SegmentSummary {
        self.reporter.segment_summary(segment)
    }

    pub fn store(&self) -> &Arc<ArmStore> {
        &self.store
    }

    pub fn reporter(&self) -> &SnapshotReporter {
        &self.reporter
    }

    /// Simulator wired to this engine's store, using the logistic click
    /// model parameterized by `config.simulation`.
    pub fn simulation(&self, config: &EngineConfig) -> BanditResult<SimulationEngine> {
        let model = LogisticClickModel::from_config(&config.simulation)?;
        Ok(SimulationEngine::new(
            self.sampler.clone(),
            self.feedback.clone(),
            model,
        ))
    }
}

impl Default for BanditEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Seeded generator when a seed is given, OS entropy otherwise.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
