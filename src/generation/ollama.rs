//! Local Ollama chat tier (`POST /api/chat`, non-streaming).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::prompt::PromptContext;
use super::{endpoint, error_body, GenerationTier, PROBE_TIMEOUT};
use crate::config::TierConfig;
use crate::error::TierFailure;

pub struct OllamaChatTier {
    name: String,
    url: String,
    model: String,
    max_tokens: usize,
    temperature: f32,
    timeout: Duration,
    client: Client,
}

impl OllamaChatTier {
    pub fn new(config: &TierConfig) -> Result<Self> {
        reqwest::Url::parse(&config.url)
            .with_context(|| format!("invalid URL for tier {}: {}", config.name, config.url))?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("failed to build Ollama HTTP client")?;
        Ok(Self {
            name: config.name.clone(),
            url: config.url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.timeout(),
            client,
        })
    }
}

#[async_trait]
impl GenerationTier for OllamaChatTier {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn is_available(&self) -> bool {
        match self.client.get(&self.url).timeout(PROBE_TIMEOUT).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(tier = %self.name, url = %self.url, error = %e, "cannot reach Ollama");
                false
            }
        }
    }

    async fn complete(&self, prompt: &PromptContext) -> Result<String, TierFailure> {
        let system = prompt.system_message();
        let body = ChatRequest {
            model: &self.model,
            stream: false,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user_text,
                },
            ],
            options: ChatOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };
        let resp = self
            .client
            .post(endpoint(&self.url, "api/chat"))
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            return Err(TierFailure::Status {
                status,
                body: error_body(resp).await,
            });
        }
        let parsed: ChatResponse = resp.json().await?;
        let text = parsed
            .message
            .map(|m| m.content.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(TierFailure::EmptyCompletion);
        }
        Ok(text)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatMessage<'a>>,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TierKind;

    #[test]
    fn response_parses_message_content() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"model": "qwen2.5:1.5b", "message": {"role": "assistant", "content": "Hi there!"}, "done": true}"#,
        )
        .unwrap();
        assert_eq!(parsed.message.unwrap().content, "Hi there!");
    }

    #[test]
    fn request_is_non_streaming() {
        let body = ChatRequest {
            model: "qwen2.5:1.5b",
            stream: false,
            messages: vec![],
            options: ChatOptions {
                temperature: 0.7,
                num_predict: 100,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 100);
    }

    #[tokio::test]
    async fn unreachable_server_is_unavailable() {
        let tier = OllamaChatTier::new(&TierConfig {
            name: "local".into(),
            kind: TierKind::Ollama,
            url: "http://127.0.0.1:9".into(),
            model: "qwen2.5:1.5b".into(),
            api_key_env: None,
            timeout_secs: 2,
            max_tokens: 100,
            temperature: 0.7,
        })
        .unwrap();
        assert!(!tier.is_available().await);
    }
}
