//! Language model client.
//!
//! One chat completion per analysis run against an OpenAI-compatible
//! endpoint. The wire client hides behind [`LanguageModel`] so the engine
//! and its tests never touch the network.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Seam between the analysis engine and whatever produces narrative text.
pub trait LanguageModel: Send + Sync {
    fn invoke(&self, system_prompt: &str, user_prompt: &str) -> Result<ModelResponse>;

    /// Identifier recorded in reports and payloads.
    fn model_id(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub content: String,
    pub tokens_used: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "gpt-4o".to_string(),
            // Low temperature keeps repeated analyses of the same data close.
            temperature: 0.3,
            max_tokens: 4000,
            timeout_secs: 60,
        }
    }
}

/// OpenAI-compatible chat completions client over `ureq`.
pub struct OpenAiChat {
    agent: ureq::Agent,
    cfg: ModelConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: String,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

impl OpenAiChat {
    pub fn new(cfg: ModelConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(cfg.timeout_secs)))
            .build()
            .into();
        Self { agent, cfg }
    }

    fn call(&self, system_prompt: &str, user_prompt: &str) -> Result<ModelResponse, ureq::Error> {
        let body = ChatRequest {
            model: &self.cfg.model,
            messages: [
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_prompt },
            ],
            temperature: self.cfg.temperature,
            max_tokens: self.cfg.max_tokens,
        };

        let mut res = self
            .agent
            .post(&self.cfg.endpoint)
            .header("Authorization", &format!("Bearer {}", self.cfg.api_key))
            .send_json(&body)?;
        let parsed: ChatResponse = res.body_mut().read_json()?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        let tokens_used = parsed.usage.map(|u| u.total_tokens).unwrap_or(0);

        Ok(ModelResponse { content, tokens_used })
    }
}

/// A status-code response is the server's answer; only transport-level
/// failures (timeout, refused connection, broken stream) warrant a retry.
fn is_transient(err: &ureq::Error) -> bool {
    !matches!(err, ureq::Error::StatusCode(_))
}

impl LanguageModel for OpenAiChat {
    fn invoke(&self, system_prompt: &str, user_prompt: &str) -> Result<ModelResponse> {
        match self.call(system_prompt, user_prompt) {
            Ok(res) => Ok(res),
            Err(err) if is_transient(&err) => {
                log::warn!("model request failed ({err}), retrying once");
                self.call(system_prompt, user_prompt)
                    .context("chat completion (retry)")
            }
            Err(err) => Err(err).context("chat completion"),
        }
    }

    fn model_id(&self) -> &str {
        &self.cfg.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_errors_are_not_transient() {
        assert!(!is_transient(&ureq::Error::StatusCode(401)));
        assert!(!is_transient(&ureq::Error::StatusCode(500)));
    }

    #[test]
    fn chat_request_serializes_both_roles() {
        let req = ChatRequest {
            model: "gpt-4o",
            messages: [
                ChatMessage { role: "system", content: "sys" },
                ChatMessage { role: "user", content: "usr" },
            ],
            temperature: 0.3,
            max_tokens: 4000,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["max_tokens"], 4000);
    }

    #[test]
    fn response_without_usage_reports_zero_tokens() {
        let raw = r#"{"choices":[{"message":{"content":"hello"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.usage.map(|u| u.total_tokens).unwrap_or(0), 0);
        assert_eq!(parsed.choices[0].message.content, "hello");
    }
}
