//! OpenAI chat-completions client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{CompletionClient, CompletionRequest, LlmError, Message};
use crate::config::LlmConfig;

/// OpenAI LLM client. Credentials come from `LlmConfig`, never from ambient state.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    api_key: String,
    model: String,
    endpoint: String,
    client: Client,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Client(e.to_string()))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            client,
        })
    }

    fn parse_error(status: StatusCode, body: &str) -> LlmError {
        if status == StatusCode::UNAUTHORIZED {
            return LlmError::Api("Authentication failed. Check your OPENAI_API_KEY.".to_string());
        }

        match serde_json::from_str::<OpenAiErrorResponse>(body) {
            Ok(parsed) => LlmError::Api(parsed.error.message),
            Err(_) => LlmError::Api(format!("{} {}", status, body.trim())),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = OpenAiRequest {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(model = %self.model, "Requesting chat completion");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(Self::parse_error(status, &text));
        }

        extract_content(&text)
    }
}

/// Pull the first choice's message content out of a completion body
fn extract_content(body: &str) -> Result<String, LlmError> {
    let parsed: OpenAiResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Malformed(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| LlmError::Malformed("response contained no completion".to_string()))
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_base_url() {
        let config = LlmConfig {
            base_url: "http://localhost:11434/v1/".to_string(),
            ..LlmConfig::default()
        };
        let client = OpenAiClient::new(&config).unwrap();
        assert_eq!(client.endpoint, "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"SELECT 1"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "SELECT 1");
    }

    #[test]
    fn test_extract_content_without_choices() {
        let err = extract_content(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, LlmError::Malformed(_)));
        assert!(matches!(extract_content("<html>"), Err(LlmError::Malformed(_))));
    }

    #[test]
    fn test_parse_error_uses_api_message() {
        let body = r#"{"error":{"message":"You exceeded your current quota","type":"insufficient_quota"}}"#;
        let err = OpenAiClient::parse_error(StatusCode::TOO_MANY_REQUESTS, body);
        assert_eq!(err, LlmError::Api("You exceeded your current quota".to_string()));
    }

    #[test]
    fn test_parse_error_unauthorized() {
        let err = OpenAiClient::parse_error(StatusCode::UNAUTHORIZED, "");
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_request_serialization() {
        let messages = vec![Message::user("hi")];
        let body = OpenAiRequest {
            model: "gpt-3.5-turbo",
            messages: &messages,
            max_tokens: 200,
            temperature: 0.1,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["max_tokens"], 200);
        assert_eq!(json["messages"][0]["content"], "hi");
    }
}
