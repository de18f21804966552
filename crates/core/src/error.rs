use thiserror::Error;

pub type BanditResult<T> = Result<T, BanditError>;

#[derive(Error, Debug)]
pub enum BanditError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown arm {segment}/{candidate_id}: feedback rejected under strict policy")]
    UnknownArm {
        segment: String,
        candidate_id: String,
    },

    #[error("Numeric domain error: {0}")]
    NumericDomain(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
