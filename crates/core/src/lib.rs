pub mod config;
pub mod error;
pub mod types;

pub use config::{EngineConfig, FeedbackPolicy};
pub use error::{BanditError, BanditResult};
pub use types::{Arm, ArmKey, ArmRecord, SimCandidate};
