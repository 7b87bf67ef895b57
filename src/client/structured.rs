use crate::error::ClientError;
use crate::parser::extract_json;
use serde_json::Value;
use tracing::{debug, warn};

use super::{ChatClient, ChatMessage, ChatRequest, Usage};

const REPAIR_SYSTEM_PROMPT: &str = "You are a JSON repair tool. Return valid JSON only.";

/// Outcome of a structured call. `response` is either the parsed object or
/// the parse-error sentinel; `raw` is the provider text the response came
/// from (the repair text when a repair happened).
#[derive(Debug, Clone)]
pub struct StructuredResponse {
    pub response: Value,
    pub raw: String,
    pub usage: Usage,
}

impl StructuredResponse {
    pub fn is_parse_error(&self) -> bool {
        self.response
            .get("parse_error")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// True when the response is an object containing every named key.
    pub fn has_keys(&self, keys: &[&str]) -> bool {
        match self.response.as_object() {
            Some(map) => keys.iter().all(|k| map.contains_key(*k)),
            None => false,
        }
    }
}

fn parse_error_sentinel(raw: &str) -> Value {
    serde_json::json!({
        "parse_error": true,
        "raw": raw,
    })
}

/// Call the model asking for JSON output; on a malformed response make one
/// repair call at temperature zero. If the repair output still does not
/// parse, degrade to the sentinel object instead of failing — transport
/// errors are the only errors this function returns.
pub async fn call_json(
    client: &dyn ChatClient,
    model: &str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
) -> Result<StructuredResponse, ClientError> {
    let request = ChatRequest {
        model: model.to_string(),
        messages,
        temperature,
        max_tokens,
        json_response: true,
    };
    let output = client.chat(&request).await?;

    if let Ok(parsed) = extract_json(&output.content) {
        return Ok(StructuredResponse {
            response: parsed,
            raw: output.content,
            usage: output.usage,
        });
    }

    debug!(model, "response was not valid JSON; issuing repair call");

    let repair_request = ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(REPAIR_SYSTEM_PROMPT),
            ChatMessage::user(format!("Fix to valid JSON: {}", output.content)),
        ],
        temperature: 0.0,
        max_tokens,
        json_response: true,
    };
    let repair = client.chat(&repair_request).await?;
    let usage = output.usage.merge(&repair.usage);

    let response = match extract_json(&repair.content) {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(model, "repair call did not yield valid JSON; recording parse error");
            let raw = if repair.content.is_empty() {
                &output.content
            } else {
                &repair.content
            };
            parse_error_sentinel(raw)
        }
    };

    Ok(StructuredResponse {
        response,
        raw: repair.content,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ChatClient, ChatOutput};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns canned contents in order; records the requests it saw.
    struct ScriptedClient {
        responses: Mutex<Vec<ChatOutput>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedClient {
        fn new(contents: Vec<&str>) -> Self {
            let responses = contents
                .into_iter()
                .map(|c| ChatOutput {
                    content: c.to_string(),
                    usage: Usage {
                        prompt_tokens: Some(10),
                        completion_tokens: Some(5),
                        total_tokens: Some(15),
                    },
                })
                .collect();
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn chat(&self, request: &ChatRequest) -> Result<ChatOutput, ClientError> {
            self.requests.lock().unwrap().push(request.clone());
            let mut responses = self.responses.lock().unwrap();
            assert!(!responses.is_empty(), "scripted client ran out of responses");
            Ok(responses.remove(0))
        }
    }

    #[tokio::test]
    async fn test_clean_json_needs_no_repair() {
        let client = ScriptedClient::new(vec![r#"{"score": 8}"#]);

        let result = call_json(&client, "m", vec![ChatMessage::user("q")], 0.2, 800)
            .await
            .unwrap();

        assert_eq!(result.response["score"], json!(8));
        assert_eq!(result.usage.total_tokens, Some(15));
        assert_eq!(client.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repair_call_fixes_and_merges_usage() {
        let client = ScriptedClient::new(vec!["not json at all", r#"{"score": 6}"#]);

        let result = call_json(&client, "m", vec![ChatMessage::user("q")], 0.2, 800)
            .await
            .unwrap();

        assert_eq!(result.response["score"], json!(6));
        assert_eq!(result.usage.total_tokens, Some(30));

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].temperature, 0.0);
        assert_eq!(requests[1].messages[0].content, REPAIR_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn test_double_failure_degrades_to_sentinel() {
        let client = ScriptedClient::new(vec!["garbage", "still garbage"]);

        let result = call_json(&client, "m", vec![ChatMessage::user("q")], 0.2, 800)
            .await
            .unwrap();

        assert!(result.is_parse_error());
        assert_eq!(result.response["raw"], json!("still garbage"));
        assert_eq!(result.raw, "still garbage");
    }

    #[tokio::test]
    async fn test_empty_repair_preserves_original_raw() {
        let client = ScriptedClient::new(vec!["garbage", ""]);

        let result = call_json(&client, "m", vec![ChatMessage::user("q")], 0.2, 800)
            .await
            .unwrap();

        assert!(result.is_parse_error());
        assert_eq!(result.response["raw"], json!("garbage"));
    }

    #[test]
    fn test_has_keys() {
        let resp = StructuredResponse {
            response: json!({"score": 8, "strengths": []}),
            raw: String::new(),
            usage: Usage::default(),
        };
        assert!(resp.has_keys(&["score", "strengths"]));
        assert!(!resp.has_keys(&["score", "weaknesses"]));
    }
}
