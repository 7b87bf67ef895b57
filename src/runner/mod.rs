mod orchestrator;

pub use orchestrator::{ExperimentRunner, RunSummary};
