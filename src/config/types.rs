use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::*;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    /// JSONL corpus of papers: paper_id, title, abstract, year, decision
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,

    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    #[serde(default = "default_reviewer_models")]
    pub reviewer_models: Vec<String>,

    /// The reviewer whose feedback alone forms the "single" condition
    #[serde(default = "default_single_reviewer")]
    pub single_reviewer: String,

    #[serde(default = "default_author_model")]
    pub author_model: String,

    #[serde(default = "default_judge_model")]
    pub judge_model: String,

    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
        }
    }
}

/// What a run looked like: written to `config.json` after every run
/// (overwriting the previous snapshot) and read back by the analysis to
/// filter reviews down to the models that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub seed: u64,
    pub sample_size: usize,
    pub reviewer_models: Vec<String>,
    pub single_reviewer: String,
    pub author_model: String,
    pub judge_model: String,
    pub timestamp: DateTime<Utc>,
}

impl ConfigSnapshot {
    pub fn of(config: &Config) -> Self {
        Self {
            seed: config.seed,
            sample_size: config.sample_size,
            reviewer_models: config.reviewer_models.clone(),
            single_reviewer: config.single_reviewer.clone(),
            author_model: config.author_model.clone(),
            judge_model: config.judge_model.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// On-disk layout derived from the results directory.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub samples: PathBuf,
    pub config_snapshot: PathBuf,
    pub reviews: PathBuf,
    pub revisions: PathBuf,
    pub judgments: PathBuf,
    pub analysis_dir: PathBuf,
    pub plots_dir: PathBuf,
}

impl OutputLayout {
    pub fn new(results_dir: &std::path::Path) -> Self {
        let model_outputs = results_dir.join("model_outputs");
        Self {
            samples: results_dir.join("sample_papers.jsonl"),
            config_snapshot: results_dir.join("config.json"),
            reviews: model_outputs.join("reviews.jsonl"),
            revisions: model_outputs.join("revisions.jsonl"),
            judgments: model_outputs.join("judgments.jsonl"),
            analysis_dir: results_dir.join("analysis"),
            plots_dir: results_dir.join("plots"),
        }
    }
}
