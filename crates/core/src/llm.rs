//! Remote generative backend using an OpenAI-compatible Responses API

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BackendConfig;

/// Outcome of a generation attempt. Failures are values, not errors: the
/// composer consumes every non-text variant with a local-template fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Text(String),
    QuotaExceeded(String),
    TransientFailure(String),
}

/// Instructions sent to the backend for one reply
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    /// Fixed system instruction
    pub instructions: String,
    /// Task-built user instruction
    pub input: String,
}

/// Anything that can turn a generation request into reply text
pub trait GenerativeBackend {
    fn generate(&self, request: &GenerationRequest) -> Generation;
}

/// Request body for the Responses API (internal)
#[derive(Serialize)]
struct ResponsesApiRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    instructions: &'a str,
}

/// Response from the Responses API
#[derive(Deserialize, Debug)]
struct ResponsesApiResponse {
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    output_text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentItem>,
}

#[derive(Deserialize, Debug)]
struct ContentItem {
    #[serde(default)]
    text: Option<String>,
}

/// Blocking HTTP client for the generative backend
pub struct HttpBackend {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpBackend {
    /// Build a backend from config. The API key is read from the environment
    /// variable named in `api_key_env`, if set.
    pub fn from_config(config: &BackendConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn call(&self, request: &GenerationRequest) -> Result<String, Generation> {
        let body = ResponsesApiRequest {
            model: &self.model,
            input: &request.input,
            instructions: &request.instructions,
        };

        let url = format!("{}/responses", self.base_url);
        debug!(%url, model = %self.model, "calling generative backend");

        let mut builder = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().map_err(|e| {
            if e.is_timeout() {
                Generation::TransientFailure(format!("LLM request timed out: {}", e))
            } else {
                Generation::TransientFailure(format!("LLM request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let resp: ResponsesApiResponse = response.json().map_err(|e| {
            Generation::TransientFailure(format!("Failed to parse LLM response: {}", e))
        })?;

        extract_text_from_response(&resp)
            .ok_or_else(|| Generation::TransientFailure("No text found in LLM response".into()))
    }
}

impl GenerativeBackend for HttpBackend {
    fn generate(&self, request: &GenerationRequest) -> Generation {
        match self.call(request) {
            Ok(text) => Generation::Text(text),
            Err(failure) => failure,
        }
    }
}

/// Map a non-success HTTP status and body to a failure variant.
/// Rate limiting and exhausted quotas are reported distinctly.
pub fn classify_failure(status: StatusCode, body: &str) -> Generation {
    let lower = body.to_lowercase();
    let quota = status == StatusCode::TOO_MANY_REQUESTS
        || lower.contains("quota")
        || lower.contains("rate limit")
        || lower.contains("rate_limit")
        || lower.contains("resource_exhausted");

    let reason = format!("LLM error {}: {}", status, body.trim());
    if quota {
        Generation::QuotaExceeded(reason)
    } else {
        Generation::TransientFailure(reason)
    }
}

/// Extract text content from a Responses API response
fn extract_text_from_response(resp: &ResponsesApiResponse) -> Option<String> {
    let mut chunks: Vec<&str> = resp
        .output
        .iter()
        .flat_map(|item| item.content.iter())
        .filter_map(|content| content.text.as_deref())
        .collect();

    // Fallback to output_text if no content found
    if chunks.is_empty() {
        if let Some(ref text) = resp.output_text {
            chunks.push(text);
        }
    }

    let joined = chunks.join("\n").trim().to_string();
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;

    fn backend_at(base_url: String) -> HttpBackend {
        let config = BackendConfig {
            enabled: true,
            base_url,
            api_key_env: "CHATCAL_TEST_NO_SUCH_KEY".to_string(),
            timeout_secs: 1,
            ..Default::default()
        };
        HttpBackend::from_config(&config).unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            instructions: "be brief".to_string(),
            input: "hello".to_string(),
        }
    }

    #[test]
    fn test_unresponsive_server_is_transient() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            // read the request but never answer
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                thread::sleep(Duration::from_secs(5));
            }
        });

        let outcome = backend_at(format!("http://{}/v1", addr)).generate(&request());
        match outcome {
            Generation::TransientFailure(reason) => assert!(reason.contains("timed out")),
            other => panic!("expected transient failure, got {:?}", other),
        }
    }

    #[test]
    fn test_connection_refused_is_transient() {
        let outcome = backend_at("http://127.0.0.1:1/v1".to_string()).generate(&request());
        assert!(matches!(outcome, Generation::TransientFailure(_)));
    }

    #[test]
    fn test_429_is_quota() {
        let outcome = classify_failure(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(outcome, Generation::QuotaExceeded(_)));
    }

    #[test]
    fn test_quota_body_is_quota() {
        let outcome = classify_failure(
            StatusCode::FORBIDDEN,
            r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#,
        );
        assert!(matches!(outcome, Generation::QuotaExceeded(_)));
    }

    #[test]
    fn test_server_error_is_transient() {
        let outcome = classify_failure(StatusCode::BAD_GATEWAY, "upstream down");
        match outcome {
            Generation::TransientFailure(reason) => assert!(reason.contains("502")),
            other => panic!("expected transient failure, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_text_prefers_content() {
        let resp: ResponsesApiResponse = serde_json::from_str(
            r#"{"output":[{"content":[{"text":"Hello"},{"text":"there"}]}],"output_text":"ignored"}"#,
        )
        .unwrap();
        assert_eq!(extract_text_from_response(&resp).as_deref(), Some("Hello\nthere"));
    }

    #[test]
    fn test_extract_text_falls_back_to_output_text() {
        let resp: ResponsesApiResponse =
            serde_json::from_str(r#"{"output":[],"output_text":"  fallback  "}"#).unwrap();
        assert_eq!(extract_text_from_response(&resp).as_deref(), Some("fallback"));
    }

    #[test]
    fn test_extract_text_empty_is_none() {
        let resp: ResponsesApiResponse = serde_json::from_str(r#"{"output":[]}"#).unwrap();
        assert!(extract_text_from_response(&resp).is_none());
    }

    #[test]
    fn test_request_omits_empty_instructions() {
        let body = ResponsesApiRequest {
            model: "m",
            input: "hi",
            instructions: "",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("instructions").is_none());
    }
}
