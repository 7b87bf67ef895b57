use std::path::PathBuf;

pub fn default_version() -> u32 {
    1
}

pub fn default_dataset_path() -> PathBuf {
    PathBuf::from("datasets/papers.jsonl")
}

pub fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

pub fn default_reviewer_models() -> Vec<String> {
    vec![
        "anthropic/claude-sonnet-4.5".to_string(),
        "openai/gpt-4.1".to_string(),
    ]
}

pub fn default_single_reviewer() -> String {
    "anthropic/claude-sonnet-4.5".to_string()
}

pub fn default_author_model() -> String {
    "openai/gpt-4.1".to_string()
}

pub fn default_judge_model() -> String {
    "openai/gpt-4.1-mini".to_string()
}

pub fn default_sample_size() -> usize {
    50
}

pub fn default_seed() -> u64 {
    42
}

pub fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

pub fn default_max_attempts() -> u32 {
    6
}

pub fn default_backoff_base_ms() -> u64 {
    1000
}

pub fn default_backoff_cap_ms() -> u64 {
    30_000
}
