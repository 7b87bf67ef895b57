use crate::client::{call_json, ChatClient, StructuredResponse, Usage};
use crate::config::{Config, ConfigSnapshot, OutputLayout};
use crate::dataset::Sample;
use crate::error::RunnerError;
use crate::prompts;
use crate::store::{
    append_jsonl, latest_by_key, read_jsonl, write_jsonl, Condition, JudgmentRecord, ReviewRecord,
    RevisionRecord, Variant, JUDGMENT_REQUIRED_KEYS, REVIEW_REQUIRED_KEYS,
};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

const REVIEW_TEMPERATURE: f64 = 0.2;
const REVIEW_MAX_TOKENS: u32 = 800;
const REVISION_TEMPERATURE: f64 = 0.3;
const STRICT_REVISION_TEMPERATURE: f64 = 0.2;
const REVISION_MAX_TOKENS: u32 = 900;
const JUDGE_TEMPERATURE: f64 = 0.0;
const JUDGE_MAX_TOKENS: u32 = 400;

#[derive(Debug, Default)]
pub struct RunSummary {
    pub papers: usize,
    pub reviews_appended: usize,
    pub revisions_appended: usize,
    pub judgments_appended: usize,
    pub usage: Usage,
}

/// Drives the per-paper review -> revision -> judgment pipeline over the
/// sampled papers, one call at a time. Stages whose key already has a valid
/// cached record are skipped; everything new is appended to its log the
/// moment the call finishes, so a killed run resumes where it left off.
pub struct ExperimentRunner {
    config: Config,
    layout: OutputLayout,
    client: Arc<dyn ChatClient>,
}

impl ExperimentRunner {
    pub fn new(config: Config, client: Arc<dyn ChatClient>) -> Self {
        let layout = config.layout();
        Self {
            config,
            layout,
            client,
        }
    }

    pub async fn run(&self, sample: &[Sample]) -> Result<RunSummary, RunnerError> {
        write_jsonl(&self.layout.samples, sample)?;

        let mut reviews = self.load_reviews()?;
        let mut revisions = self.load_revisions()?;
        let mut judgments = self.load_judgments()?;

        info!(
            "Cached records: {} reviews, {} revisions, {} judgments",
            reviews.len(),
            revisions.len(),
            judgments.len()
        );

        let mut summary = RunSummary {
            papers: sample.len(),
            ..RunSummary::default()
        };

        for paper in sample {
            self.run_reviews(paper, &mut reviews, &mut summary).await?;

            let blocks = self.feedback_blocks(paper, &reviews)?;
            let feedback_multi = blocks.join("\n\n");
            let feedback_single = self
                .config
                .reviewer_models
                .iter()
                .zip(&blocks)
                .find(|(model, _)| **model == self.config.single_reviewer)
                .map(|(_, block)| block.clone())
                .unwrap_or_default();

            self.run_revisions(
                paper,
                &[
                    (Condition::Single, feedback_single),
                    (Condition::Multi, feedback_multi),
                ],
                &mut revisions,
                &mut summary,
            )
            .await?;

            self.run_judgments(paper, &revisions, &mut judgments, &mut summary)
                .await?;
        }

        self.write_snapshot()?;

        info!(
            "Run complete: {} papers, {} new reviews, {} new revisions, {} new judgments",
            summary.papers,
            summary.reviews_appended,
            summary.revisions_appended,
            summary.judgments_appended
        );

        Ok(summary)
    }

    fn load_reviews(&self) -> Result<HashMap<(String, String), ReviewRecord>, RunnerError> {
        let mut cache = latest_by_key(read_jsonl::<ReviewRecord>(&self.layout.reviews)?, |r| {
            (r.paper_id.clone(), r.model.clone())
        });
        // Invalid or stale-model entries are dropped here, not from disk;
        // regeneration appends a superseding record.
        cache.retain(|_, r| r.is_valid(&self.config.reviewer_models));
        Ok(cache)
    }

    fn load_revisions(&self) -> Result<HashMap<(String, Condition), RevisionRecord>, RunnerError> {
        let mut cache = latest_by_key(read_jsonl::<RevisionRecord>(&self.layout.revisions)?, |r| {
            (r.paper_id.clone(), r.condition)
        });
        cache.retain(|_, r| r.is_valid());
        Ok(cache)
    }

    fn load_judgments(&self) -> Result<HashMap<(String, Variant), JudgmentRecord>, RunnerError> {
        let mut cache = latest_by_key(read_jsonl::<JudgmentRecord>(&self.layout.judgments)?, |r| {
            (r.paper_id.clone(), r.variant)
        });
        cache.retain(|_, r| r.is_valid(&self.config.judge_model));
        Ok(cache)
    }

    async fn run_reviews(
        &self,
        paper: &Sample,
        reviews: &mut HashMap<(String, String), ReviewRecord>,
        summary: &mut RunSummary,
    ) -> Result<(), RunnerError> {
        for model in &self.config.reviewer_models {
            let key = (paper.paper_id.clone(), model.clone());
            if reviews.contains_key(&key) {
                continue;
            }

            debug!(paper_id = %paper.paper_id, model = %model, "requesting review");
            let messages = prompts::build_review_prompt(&paper.title, &paper.abstract_text);
            let user_content = messages[1].content.clone();

            let mut result = call_json(
                self.client.as_ref(),
                model,
                messages,
                REVIEW_TEMPERATURE,
                REVIEW_MAX_TOKENS,
            )
            .await?;

            if !result.has_keys(&REVIEW_REQUIRED_KEYS) {
                warn!(
                    paper_id = %paper.paper_id,
                    model = %model,
                    "review missing required keys; re-prompting strictly"
                );
                result = call_json(
                    self.client.as_ref(),
                    model,
                    prompts::build_strict_review_prompt(&user_content),
                    REVIEW_TEMPERATURE,
                    REVIEW_MAX_TOKENS,
                )
                .await?;
            }

            let record = ReviewRecord {
                paper_id: paper.paper_id.clone(),
                model: model.clone(),
                response: result.response,
                raw: result.raw,
                usage: result.usage,
                timestamp: Utc::now(),
            };
            append_jsonl(&self.layout.reviews, &record)?;
            summary.usage.accumulate(&record.usage);
            summary.reviews_appended += 1;
            reviews.insert(key, record);
        }

        Ok(())
    }

    /// One feedback block per configured reviewer, in configured order.
    fn feedback_blocks(
        &self,
        paper: &Sample,
        reviews: &HashMap<(String, String), ReviewRecord>,
    ) -> Result<Vec<String>, RunnerError> {
        let mut blocks = Vec::with_capacity(self.config.reviewer_models.len());
        for model in &self.config.reviewer_models {
            let review = reviews
                .get(&(paper.paper_id.clone(), model.clone()))
                .ok_or_else(|| RunnerError::MissingReview {
                    paper_id: paper.paper_id.clone(),
                    model: model.clone(),
                })?;
            let suggestions = suggestions_text(review.response.get("suggestions"));
            blocks.push(format!("Reviewer ({}) suggestions:\n{}", model, suggestions));
        }
        Ok(blocks)
    }

    async fn run_revisions(
        &self,
        paper: &Sample,
        inputs: &[(Condition, String)],
        revisions: &mut HashMap<(String, Condition), RevisionRecord>,
        summary: &mut RunSummary,
    ) -> Result<(), RunnerError> {
        for (condition, feedback) in inputs {
            let key = (paper.paper_id.clone(), *condition);
            if revisions.contains_key(&key) {
                continue;
            }

            debug!(paper_id = %paper.paper_id, condition = %condition, "requesting revision");
            let messages =
                prompts::build_revision_prompt(&paper.title, &paper.abstract_text, feedback);
            let user_content = messages[1].content.clone();

            let mut result = call_json(
                self.client.as_ref(),
                &self.config.author_model,
                messages,
                REVISION_TEMPERATURE,
                REVISION_MAX_TOKENS,
            )
            .await?;

            if revision_lacks_abstract(&result) {
                warn!(
                    paper_id = %paper.paper_id,
                    condition = %condition,
                    "revision missing revised_abstract; re-prompting strictly"
                );
                result = call_json(
                    self.client.as_ref(),
                    &self.config.author_model,
                    prompts::build_strict_revision_prompt(&user_content),
                    STRICT_REVISION_TEMPERATURE,
                    REVISION_MAX_TOKENS,
                )
                .await?;
            }

            let record = RevisionRecord {
                paper_id: paper.paper_id.clone(),
                condition: *condition,
                model: self.config.author_model.clone(),
                response: result.response,
                raw: result.raw,
                usage: result.usage,
                timestamp: Utc::now(),
            };
            append_jsonl(&self.layout.revisions, &record)?;
            summary.usage.accumulate(&record.usage);
            summary.revisions_appended += 1;
            revisions.insert(key, record);
        }

        Ok(())
    }

    async fn run_judgments(
        &self,
        paper: &Sample,
        revisions: &HashMap<(String, Condition), RevisionRecord>,
        judgments: &mut HashMap<(String, Variant), JudgmentRecord>,
        summary: &mut RunSummary,
    ) -> Result<(), RunnerError> {
        let variants = [
            (Variant::Original, paper.abstract_text.clone()),
            (
                Variant::Single,
                self.revised_abstract(paper, revisions, Condition::Single)?,
            ),
            (
                Variant::Multi,
                self.revised_abstract(paper, revisions, Condition::Multi)?,
            ),
        ];

        for (variant, text) in variants {
            let key = (paper.paper_id.clone(), variant);
            if judgments.contains_key(&key) {
                continue;
            }

            debug!(paper_id = %paper.paper_id, variant = %variant, "requesting judgment");
            let messages = prompts::build_judge_prompt(&paper.title, &text);

            // No strict re-prompt here: incomplete judgments are persisted
            // as returned and regenerated by load-time pruning next run.
            let result = call_json(
                self.client.as_ref(),
                &self.config.judge_model,
                messages,
                JUDGE_TEMPERATURE,
                JUDGE_MAX_TOKENS,
            )
            .await?;

            if !result.has_keys(&JUDGMENT_REQUIRED_KEYS) {
                warn!(
                    paper_id = %paper.paper_id,
                    variant = %variant,
                    "judgment missing required metrics; persisting as-is"
                );
            }

            let record = JudgmentRecord {
                paper_id: paper.paper_id.clone(),
                variant,
                model: self.config.judge_model.clone(),
                response: result.response,
                raw: result.raw,
                usage: result.usage,
                timestamp: Utc::now(),
            };
            append_jsonl(&self.layout.judgments, &record)?;
            summary.usage.accumulate(&record.usage);
            summary.judgments_appended += 1;
            judgments.insert(key, record);
        }

        Ok(())
    }

    fn revised_abstract(
        &self,
        paper: &Sample,
        revisions: &HashMap<(String, Condition), RevisionRecord>,
        condition: Condition,
    ) -> Result<String, RunnerError> {
        revisions
            .get(&(paper.paper_id.clone(), condition))
            .and_then(|r| r.revised_abstract())
            .map(str::to_string)
            .ok_or_else(|| RunnerError::MissingRevisedAbstract {
                paper_id: paper.paper_id.clone(),
                condition: condition.to_string(),
            })
    }

    fn write_snapshot(&self) -> Result<(), RunnerError> {
        let snapshot = ConfigSnapshot::of(&self.config);
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| RunnerError::Store(crate::error::StoreError::Serialize(e)))?;
        std::fs::write(&self.layout.config_snapshot, json).map_err(RunnerError::Snapshot)
    }
}

fn revision_lacks_abstract(result: &StructuredResponse) -> bool {
    result
        .response
        .get("revised_abstract")
        .and_then(Value::as_str)
        .map(|s| s.is_empty())
        .unwrap_or(true)
}

/// Render a review's suggestions as feedback text: one dash per entry for
/// arrays, the bare string for strings, JSON text otherwise.
fn suggestions_text(suggestions: Option<&Value>) -> String {
    match suggestions {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item.as_str() {
                Some(s) => format!("- {}", s),
                None => format!("- {}", item),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ChatOutput, ChatRequest};
    use crate::error::ClientError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Answers every request with stage-appropriate valid JSON, keyed off
    /// the system prompt. Counts calls.
    struct StageFake {
        calls: AtomicUsize,
    }

    impl StageFake {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatClient for StageFake {
        async fn chat(&self, request: &ChatRequest) -> Result<ChatOutput, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let system = &request.messages[0].content;

            let response = if system.contains("ICLR reviewer") {
                json!({
                    "score": 7,
                    "strengths": ["clear problem"],
                    "weaknesses": ["limited eval"],
                    "suggestions": ["add baselines", "report variance"],
                    "summary": "solid"
                })
            } else if system.contains("author revising") {
                json!({
                    "revised_abstract": "A sharper abstract.",
                    "change_log": ["tightened claims"]
                })
            } else if system.contains("meta-reviewer") {
                json!({"clarity": 7, "novelty": 6, "overall": 7, "justification": "fine"})
            } else {
                json!({"parse_error": true, "raw": "unexpected prompt"})
            };

            Ok(ChatOutput {
                content: response.to_string(),
                usage: Usage {
                    prompt_tokens: Some(100),
                    completion_tokens: Some(50),
                    total_tokens: Some(150),
                },
            })
        }
    }

    fn test_config(results_dir: &std::path::Path) -> Config {
        Config {
            results_dir: results_dir.to_path_buf(),
            reviewer_models: vec!["reviewer/a".to_string(), "reviewer/b".to_string()],
            single_reviewer: "reviewer/a".to_string(),
            author_model: "author/model".to_string(),
            judge_model: "judge/model".to_string(),
            sample_size: 2,
            seed: 42,
            ..Config::default()
        }
    }

    fn papers(n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| Sample {
                paper_id: format!("p{}", i),
                title: format!("Paper {}", i),
                abstract_text: format!("Abstract number {}.", i),
                year: Some(2024),
                decision: Some("Accept".to_string()),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_full_run_record_counts() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let runner = ExperimentRunner::new(config.clone(), Arc::new(StageFake::new()));

        let sample = papers(2);
        let summary = runner.run(&sample).await.unwrap();

        // 2 papers x 2 reviewers, x 2 conditions, x 3 variants
        assert_eq!(summary.reviews_appended, 4);
        assert_eq!(summary.revisions_appended, 4);
        assert_eq!(summary.judgments_appended, 6);

        let layout = config.layout();
        let reviews: Vec<ReviewRecord> = read_jsonl(&layout.reviews).unwrap();
        let revisions: Vec<RevisionRecord> = read_jsonl(&layout.revisions).unwrap();
        let judgments: Vec<JudgmentRecord> = read_jsonl(&layout.judgments).unwrap();
        assert_eq!(reviews.len(), 4);
        assert_eq!(revisions.len(), 4);
        assert_eq!(judgments.len(), 6);

        // Manifest and snapshot written
        let manifest: Vec<Sample> = read_jsonl(&layout.samples).unwrap();
        assert_eq!(manifest.len(), 2);
        let snapshot: ConfigSnapshot =
            serde_json::from_str(&std::fs::read_to_string(&layout.config_snapshot).unwrap())
                .unwrap();
        assert_eq!(snapshot.judge_model, "judge/model");
        assert_eq!(snapshot.seed, 42);
    }

    #[tokio::test]
    async fn test_rerun_with_full_cache_appends_nothing() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let sample = papers(2);

        let first = ExperimentRunner::new(config.clone(), Arc::new(StageFake::new()));
        first.run(&sample).await.unwrap();

        let fake = Arc::new(StageFake::new());
        let second = ExperimentRunner::new(config.clone(), fake.clone());
        let summary = second.run(&sample).await.unwrap();

        assert_eq!(summary.reviews_appended, 0);
        assert_eq!(summary.revisions_appended, 0);
        assert_eq!(summary.judgments_appended, 0);
        assert_eq!(fake.call_count(), 0);

        let reviews: Vec<ReviewRecord> = read_jsonl(&config.layout().reviews).unwrap();
        assert_eq!(reviews.len(), 4);
    }

    #[tokio::test]
    async fn test_invalidated_review_is_regenerated_alone() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let sample = papers(2);
        let layout = config.layout();

        let first = ExperimentRunner::new(config.clone(), Arc::new(StageFake::new()));
        first.run(&sample).await.unwrap();

        // Append a superseding-but-invalid entry for one (paper, model):
        // the loader keeps the last occurrence, the validity filter drops
        // it, and the run regenerates exactly that review.
        let broken = ReviewRecord {
            paper_id: "p0".to_string(),
            model: "reviewer/b".to_string(),
            response: json!({"parse_error": true, "raw": "oops"}),
            raw: "oops".to_string(),
            usage: Usage::default(),
            timestamp: Utc::now(),
        };
        append_jsonl(&layout.reviews, &broken).unwrap();

        let fake = Arc::new(StageFake::new());
        let second = ExperimentRunner::new(config.clone(), fake.clone());
        let summary = second.run(&sample).await.unwrap();

        assert_eq!(summary.reviews_appended, 1);
        assert_eq!(summary.revisions_appended, 0);
        assert_eq!(summary.judgments_appended, 0);
        assert_eq!(fake.call_count(), 1);

        // Log keeps full history: 4 + broken + regenerated
        let reviews: Vec<ReviewRecord> = read_jsonl(&layout.reviews).unwrap();
        assert_eq!(reviews.len(), 6);
        let last = reviews.last().unwrap();
        assert_eq!(last.paper_id, "p0");
        assert_eq!(last.model, "reviewer/b");
        assert!(last.is_valid(&config.reviewer_models));
    }

    #[tokio::test]
    async fn test_reviews_for_dropped_models_are_pruned() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let sample = papers(1);

        let first = ExperimentRunner::new(config.clone(), Arc::new(StageFake::new()));
        first.run(&sample).await.unwrap();

        // Reconfigure reviewer/b out; its cached review no longer counts,
        // and the replacement model must be reviewed from scratch.
        let reconfigured = Config {
            reviewer_models: vec!["reviewer/a".to_string(), "reviewer/c".to_string()],
            ..config.clone()
        };
        let second = ExperimentRunner::new(reconfigured, Arc::new(StageFake::new()));
        let summary = second.run(&sample).await.unwrap();

        assert_eq!(summary.reviews_appended, 1);
    }

    #[test]
    fn test_suggestions_text_variants() {
        assert_eq!(
            suggestions_text(Some(&json!(["a", "b"]))),
            "- a\n- b"
        );
        assert_eq!(suggestions_text(Some(&json!("just fix it"))), "just fix it");
        assert_eq!(suggestions_text(Some(&json!(3))), "3");
        assert_eq!(suggestions_text(None), "");
    }

    #[test]
    fn test_revision_lacks_abstract() {
        let ok = StructuredResponse {
            response: json!({"revised_abstract": "text"}),
            raw: String::new(),
            usage: Usage::default(),
        };
        let empty = StructuredResponse {
            response: json!({"revised_abstract": ""}),
            raw: String::new(),
            usage: Usage::default(),
        };
        let missing = StructuredResponse {
            response: json!({"change_log": []}),
            raw: String::new(),
            usage: Usage::default(),
        };
        assert!(!revision_lacks_abstract(&ok));
        assert!(revision_lacks_abstract(&empty));
        assert!(revision_lacks_abstract(&missing));
    }
}
