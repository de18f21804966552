use serde::{Deserialize, Serialize};

/// Root engine configuration. Loaded from environment variables
/// with the prefix `CREATIVE_BANDIT__`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seed for the pseudorandom source; `None` seeds from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Number of lock shards in the arm map. Must be a power of two
    /// greater than one; `None` lets the map pick from the core count.
    #[serde(default)]
    pub shard_amount: Option<usize>,
}

/// How feedback for an arm that was never selected is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum FeedbackPolicy {
    /// Create the arm with default priors and apply the outcome.
    #[default]
    Lenient,
    /// Reject the outcome with `BanditError::UnknownArm`.
    Strict,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackConfig {
    #[serde(default)]
    pub policy: FeedbackPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_iterations")]
    pub iterations: u64,
    #[serde(default = "default_intercept")]
    pub intercept: f64,
    #[serde(default = "default_quality_weight")]
    pub quality_weight: f64,
    #[serde(default = "default_cultural_weight")]
    pub cultural_weight: f64,
    #[serde(default = "default_contrast_weight")]
    pub contrast_weight: f64,
    #[serde(default = "default_noise_std")]
    pub noise_std: f64,
    #[serde(default = "default_min_click_probability")]
    pub min_click_probability: f64,
    #[serde(default = "default_max_click_probability")]
    pub max_click_probability: f64,
    /// Latent quality assumed for candidates without a score.
    #[serde(default = "default_quality")]
    pub default_quality: f64,
    /// Segments whose audiences count as a cultural match for localized creatives.
    #[serde(default = "default_culturally_matched_segments")]
    pub culturally_matched_segments: Vec<String>,
}

// Default functions
fn default_iterations() -> u64 {
    200
}
fn default_intercept() -> f64 {
    -2.0
}
fn default_quality_weight() -> f64 {
    1.6
}
fn default_cultural_weight() -> f64 {
    0.8
}
fn default_contrast_weight() -> f64 {
    0.4
}
fn default_noise_std() -> f64 {
    0.05
}
fn default_min_click_probability() -> f64 {
    0.01
}
fn default_max_click_probability() -> f64 {
    0.90
}
fn default_quality() -> f64 {
    0.6
}
fn default_culturally_matched_segments() -> Vec<String> {
    vec!["IN".to_string()]
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            intercept: default_intercept(),
            quality_weight: default_quality_weight(),
            cultural_weight: default_cultural_weight(),
            contrast_weight: default_contrast_weight(),
            noise_std: default_noise_std(),
            min_click_probability: default_min_click_probability(),
            max_click_probability: default_max_click_probability(),
            default_quality: default_quality(),
            culturally_matched_segments: default_culturally_matched_segments(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            store: StoreConfig::default(),
            feedback: FeedbackConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("CREATIVE_BANDIT")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("simulation.culturally_matched_segments"),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_click_model() {
        let config = EngineConfig::default();
        assert_eq!(config.feedback.policy, FeedbackPolicy::Lenient);
        assert_eq!(config.simulation.intercept, -2.0);
        assert_eq!(config.simulation.max_click_probability, 0.90);
        assert_eq!(config.simulation.culturally_matched_segments, vec!["IN"]);
        assert!(config.store.shard_amount.is_none());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"seed": 7, "feedback": {"policy": "strict"}, "simulation": {"iterations": 50}}"#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.feedback.policy, FeedbackPolicy::Strict);
        assert_eq!(config.simulation.iterations, 50);
        assert_eq!(config.simulation.noise_std, 0.05);
    }
}
