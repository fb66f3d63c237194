//! Hosted OpenAI-compatible chat-completions tier.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::prompt::PromptContext;
use super::{endpoint, error_body, GenerationTier, PROBE_TIMEOUT};
use crate::config::TierConfig;
use crate::error::TierFailure;

pub struct ChatCompletionTier {
    name: String,
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_tokens: usize,
    temperature: f32,
    timeout: Duration,
    client: Client,
}

impl ChatCompletionTier {
    pub fn new(config: &TierConfig) -> Result<Self> {
        reqwest::Url::parse(&config.url)
            .with_context(|| format!("invalid URL for tier {}: {}", config.name, config.url))?;
        let api_key = config
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("failed to build chat-completions HTTP client")?;
        Ok(Self {
            name: config.name.clone(),
            base_url: config.url.clone(),
            model: config.model.clone(),
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.timeout(),
            client,
        })
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl GenerationTier for ChatCompletionTier {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_none() {
            tracing::debug!(tier = %self.name, "no API key configured");
            return false;
        }
        let probe = self
            .with_auth(self.client.get(endpoint(&self.base_url, "models")))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;
        match probe {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(tier = %self.name, error = %e, "availability probe failed");
                false
            }
        }
    }

    async fn complete(&self, prompt: &PromptContext) -> Result<String, TierFailure> {
        let system = prompt.system_message();
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
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
        };
        let resp = self
            .with_auth(self.client.post(endpoint(&self.base_url, "chat/completions")))
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
        extract_answer(parsed).ok_or(TierFailure::EmptyCompletion)
    }
}

fn extract_answer(response: ChatResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .find_map(|choice| choice.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
