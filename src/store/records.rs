use crate::client::Usage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which reviewer feedback set produced a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Single,
    Multi,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Single => write!(f, "single"),
            Condition::Multi => write!(f, "multi"),
        }
    }
}

/// Which abstract version a judgment scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Original,
    Single,
    Multi,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Original, Variant::Single, Variant::Multi];
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Original => write!(f, "original"),
            Variant::Single => write!(f, "single"),
            Variant::Multi => write!(f, "multi"),
        }
    }
}

pub const REVIEW_REQUIRED_KEYS: [&str; 4] = ["score", "strengths", "weaknesses", "suggestions"];
pub const JUDGMENT_REQUIRED_KEYS: [&str; 3] = ["clarity", "novelty", "overall"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub paper_id: String,
    pub model: String,
    pub response: Value,
    pub raw: String,
    pub usage: Usage,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionRecord {
    pub paper_id: String,
    pub condition: Condition,
    pub model: String,
    pub response: Value,
    pub raw: String,
    pub usage: Usage,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgmentRecord {
    pub paper_id: String,
    pub variant: Variant,
    pub model: String,
    pub response: Value,
    pub raw: String,
    pub usage: Usage,
    pub timestamp: DateTime<Utc>,
}

fn has_keys(response: &Value, keys: &[&str]) -> bool {
    match response.as_object() {
        Some(map) => keys.iter().all(|k| map.contains_key(*k)),
        None => false,
    }
}

impl ReviewRecord {
    /// Valid when the model is still configured and the core keys are
    /// present. Invalid entries are pruned at load so a later run
    /// regenerates and supersedes them.
    pub fn is_valid(&self, reviewer_models: &[String]) -> bool {
        reviewer_models.iter().any(|m| m == &self.model)
            && has_keys(&self.response, &REVIEW_REQUIRED_KEYS)
    }
}

impl RevisionRecord {
    pub fn revised_abstract(&self) -> Option<&str> {
        self.response
            .get("revised_abstract")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn is_valid(&self) -> bool {
        self.revised_abstract().is_some()
    }
}

impl JudgmentRecord {
    pub fn is_valid(&self, judge_model: &str) -> bool {
        self.model == judge_model && has_keys(&self.response, &JUDGMENT_REQUIRED_KEYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn review(model: &str, response: Value) -> ReviewRecord {
        ReviewRecord {
            paper_id: "p1".to_string(),
            model: model.to_string(),
            response,
            raw: String::new(),
            usage: Usage::default(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_review_validity() {
        let models = vec!["m1".to_string()];
        let full = json!({
            "score": 7, "strengths": [], "weaknesses": [], "suggestions": [], "summary": "s"
        });

        assert!(review("m1", full.clone()).is_valid(&models));
        assert!(!review("m2", full).is_valid(&models));
        assert!(!review("m1", json!({"score": 7})).is_valid(&models));
        assert!(!review("m1", json!({"parse_error": true, "raw": "x"})).is_valid(&models));
    }

    #[test]
    fn test_revision_validity() {
        let mut record = RevisionRecord {
            paper_id: "p1".to_string(),
            condition: Condition::Single,
            model: "author".to_string(),
            response: json!({"revised_abstract": "Better.", "change_log": []}),
            raw: String::new(),
            usage: Usage::default(),
            timestamp: Utc::now(),
        };
        assert!(record.is_valid());

        record.response = json!({"revised_abstract": ""});
        assert!(!record.is_valid());

        record.response = json!({"change_log": []});
        assert!(!record.is_valid());
    }

    #[test]
    fn test_judgment_validity() {
        let mut record = JudgmentRecord {
            paper_id: "p1".to_string(),
            variant: Variant::Original,
            model: "judge".to_string(),
            response: json!({"clarity": 6, "novelty": 5, "overall": 6, "justification": "j"}),
            raw: String::new(),
            usage: Usage::default(),
            timestamp: Utc::now(),
        };
        assert!(record.is_valid("judge"));
        assert!(!record.is_valid("other-judge"));

        record.response = json!({"clarity": 6});
        assert!(!record.is_valid("judge"));
    }

    #[test]
    fn test_condition_variant_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&Condition::Multi).unwrap(),
            "\"multi\""
        );
        assert_eq!(
            serde_json::to_string(&Variant::Original).unwrap(),
            "\"original\""
        );
    }
}
