use std::path::PathBuf;
use thiserror::Error;

#[allow(dead_code)]
#[derive(Error, Debug)]
pub enum ReviewlabError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("OPENROUTER_API_KEY is not set in the environment")]
    MissingApiKey,

    #[error("No reviewer models configured")]
    NoReviewerModels,

    #[error("Single reviewer '{0}' is not in the reviewer model list")]
    UnknownSingleReviewer(String),

    #[error("Sample size must be greater than zero")]
    ZeroSampleSize,
}

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dataset file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read dataset '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed dataset record at line {line}: {source}")]
    Malformed {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Dataset is empty")]
    Empty,
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Response contained no choices")]
    EmptyResponse,
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("No JSON object found in text")]
    NoJsonObject,

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read log '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to append to log '{path}': {source}")]
    Append {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed log entry at {path}:{line}: {source}")]
    Malformed {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Missing review for paper '{paper_id}' and model '{model}'")]
    MissingReview { paper_id: String, model: String },

    #[error("Revision for paper '{paper_id}' ({condition}) has no revised abstract")]
    MissingRevisedAbstract { paper_id: String, condition: String },

    #[error("Failed to write config snapshot: {0}")]
    Snapshot(std::io::Error),
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Missing input log: {0}")]
    MissingLog(PathBuf),

    #[error("Failed to create output directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Failed to write output: {0}")]
    Write(std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to render plot '{path}': {message}")]
    Plot { path: PathBuf, message: String },
}
