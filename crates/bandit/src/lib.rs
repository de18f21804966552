//! Thompson Sampling engine for per-segment creative selection: a sharded
//! arm store, the sampler, feedback processing, snapshot reporting, and an
//! offline simulator for convergence checks.

pub mod engine;
pub mod feedback;
pub mod sampler;
pub mod simulation;
pub mod snapshot;
pub mod store;

pub use engine::{rng_from_seed, BanditEngine};
pub use feedback::FeedbackProcessor;
pub use sampler::{sample_beta, Sampler};
pub use simulation::{
    ClickModel, LogisticClickModel, SegmentSignals, SimulationEngine, SimulationReport,
};
pub use snapshot::{ArmStats, SegmentSummary, SnapshotReporter};
pub use store::ArmStore;
