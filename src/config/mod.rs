mod defaults;
mod types;

pub use types::*;

use crate::error::ConfigError;
use defaults::*;
use std::path::Path;

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            dataset_path: default_dataset_path(),
            results_dir: default_results_dir(),
            reviewer_models: default_reviewer_models(),
            single_reviewer: default_single_reviewer(),
            author_model: default_author_model(),
            judge_model: default_judge_model(),
            sample_size: default_sample_size(),
            seed: default_seed(),
            base_url: default_base_url(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a YAML file. A missing file yields the defaults so
    /// the binary can run without a config present.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validate the config
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reviewer_models.is_empty() {
            return Err(ConfigError::NoReviewerModels);
        }

        if !self.reviewer_models.contains(&self.single_reviewer) {
            return Err(ConfigError::UnknownSingleReviewer(
                self.single_reviewer.clone(),
            ));
        }

        if self.sample_size == 0 {
            return Err(ConfigError::ZeroSampleSize);
        }

        Ok(())
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(&self.results_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_single_reviewer_must_be_configured() {
        let config = Config {
            single_reviewer: "someone/else".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownSingleReviewer(_))
        ));
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: Config = serde_yaml::from_str("sample_size: 3\nseed: 7\n").unwrap();
        assert_eq!(config.sample_size, 3);
        assert_eq!(config.seed, 7);
        assert_eq!(config.retry.max_attempts, 6);
        assert!(!config.reviewer_models.is_empty());
    }

    #[test]
    fn test_layout_paths() {
        let config = Config::default();
        let layout = config.layout();
        assert!(layout.reviews.ends_with("model_outputs/reviews.jsonl"));
        assert!(layout.samples.ends_with("sample_papers.jsonl"));
    }
}
