//! Reasoning-service client.
//!
//! Speaks the chat-completion wire protocol: POST a model name plus a
//! system/user message pair, read back the first choice's content.
//! Failures are classified into authentication, quota, and empty-response
//! buckets because the narrative generator treats each differently.

use async_trait::async_trait;
use corrsight_core::config::RcaConfig;
use corrsight_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Transport seam for narrative completions.
///
/// The production implementation is `ReasoningClient`; tests swap in a
/// scripted stand-in to drive the live dispatch path without a network.
#[async_trait]
pub trait ReasoningBackend: std::fmt::Debug + Send + Sync {
    async fn narrative(&self, system: &str, user: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for the external reasoning service
#[derive(Clone)]
pub struct ReasoningClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    credential: String,
    max_output_tokens: u32,
    temperature: f64,
    timeout: Duration,
}

// Manual Debug keeps the credential out of logs
impl std::fmt::Debug for ReasoningClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("credential", &"<redacted>")
            .field("max_output_tokens", &self.max_output_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ReasoningClient {
    pub fn from_config(config: &RcaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.reasoning_endpoint.clone(),
            model: config.reasoning_model.clone(),
            credential: config.reasoning_api_key.clone(),
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.reasoning_timeout_secs),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One-time startup probe: a tiny completion at temperature zero.
    pub async fn self_test(&self) -> Result<()> {
        info!("testing reasoning service connectivity");
        let reply = self
            .complete(
                "You are a helpful assistant.",
                "Connectivity test - respond with a short acknowledgement",
                10,
                0.0,
            )
            .await?;
        debug!(reply_len = reply.len(), "reasoning self-test succeeded");
        Ok(())
    }
}

#[async_trait]
impl ReasoningBackend for ReasoningClient {
    /// Full narrative completion at the configured token/temperature
    /// settings.
    async fn narrative(&self, system: &str, user: &str) -> Result<String> {
        self.complete(system, user, self.max_output_tokens, self.temperature)
            .await
    }
}

impl ReasoningClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.endpoint);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens,
            temperature,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.credential)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                metrics::counter!("reasoning_requests_total", "status" => "error").increment(1);
                metrics::counter!("reasoning_errors_total", "error_type" => "transport")
                    .increment(1);
                Error::dependency(format!("reasoning service request: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            metrics::counter!("reasoning_requests_total", "status" => "error").increment(1);
            return Err(classify_failure(status, &body));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            metrics::counter!("reasoning_requests_total", "status" => "error").increment(1);
            metrics::counter!("reasoning_errors_total", "error_type" => "protocol").increment(1);
            Error::protocol(format!("malformed reasoning response: {e}"))
        })?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        match content {
            Some(text) => {
                metrics::counter!("reasoning_requests_total", "status" => "success").increment(1);
                Ok(text)
            }
            None => {
                warn!("reasoning service returned an empty response");
                metrics::counter!("reasoning_requests_total", "status" => "error").increment(1);
                metrics::counter!("reasoning_errors_total", "error_type" => "empty_response")
                    .increment(1);
                Err(Error::Reasoning("empty response".to_string()))
            }
        }
    }
}

/// Map an HTTP failure to the error class the generator dispatches on.
///
/// Status codes are authoritative; the body text is a fallback for
/// gateways that collapse everything to 400/500 with a descriptive
/// message.
fn classify_failure(status: reqwest::StatusCode, body: &str) -> Error {
    let lower = body.to_lowercase();

    if status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
        || lower.contains("authentication")
        || lower.contains("unauthorized")
    {
        metrics::counter!("reasoning_errors_total", "error_type" => "authentication")
            .increment(1);
        Error::ReasoningAuth(format!("HTTP {status}"))
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS || lower.contains("rate limit") {
        metrics::counter!("reasoning_errors_total", "error_type" => "rate_limit").increment(1);
        Error::ReasoningQuota(format!("HTTP {status}"))
    } else {
        metrics::counter!("reasoning_errors_total", "error_type" => "api_error").increment(1);
        Error::dependency(format!("reasoning service returned HTTP {status}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn unauthorized_classifies_as_auth() {
        let err = classify_failure(StatusCode::UNAUTHORIZED, "");
        assert!(matches!(err, Error::ReasoningAuth(_)));
        let err = classify_failure(StatusCode::BAD_REQUEST, "authentication failed");
        assert!(matches!(err, Error::ReasoningAuth(_)));
    }

    #[test]
    fn too_many_requests_classifies_as_quota() {
        let err = classify_failure(StatusCode::TOO_MANY_REQUESTS, "");
        assert!(matches!(err, Error::ReasoningQuota(_)));
        let err = classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "Rate limit exceeded");
        assert!(matches!(err, Error::ReasoningQuota(_)));
    }

    #[test]
    fn other_statuses_classify_as_dependency() {
        let err = classify_failure(StatusCode::BAD_GATEWAY, "upstream unavailable");
        assert!(matches!(err, Error::DependencyUnavailable(_)));
    }

    #[test]
    fn response_with_content_deserializes() {
        let json = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "narrative text"}}
            ]
        }"#;
        let body: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            body.choices[0].message.content.as_deref(),
            Some("narrative text")
        );
    }

    #[test]
    fn response_without_choices_deserializes_empty() {
        let body: ChatResponse = serde_json::from_str(r#"{"id": "chatcmpl-2"}"#).unwrap();
        assert!(body.choices.is_empty());
    }

    #[test]
    fn debug_redacts_credential() {
        let mut config = RcaConfig::default();
        config.reasoning_api_key = "sk-secret".to_string();
        let rendered = format!("{:?}", ReasoningClient::from_config(&config));
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
