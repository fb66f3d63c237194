//! Local quantized-model tier served by a llama.cpp server.
//!
//! The model is a GGUF chat model (TinyLlama by default) behind
//! `llama-server`; prompts use the Zephyr-style `<|system|>` template.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::prompt::PromptContext;
use super::{endpoint, error_body, GenerationTier, PROBE_TIMEOUT};
use crate::config::TierConfig;
use crate::error::TierFailure;

const STOP_SEQUENCES: [&str; 3] = ["</s>", "<|user|>", "<|system|>"];
const ASSISTANT_TAG: &str = "<|assistant|>";

pub struct LlamaCppTier {
    name: String,
    url: String,
    max_tokens: usize,
    temperature: f32,
    timeout: Duration,
    client: Client,
}

impl LlamaCppTier {
    pub fn new(config: &TierConfig) -> Result<Self> {
        reqwest::Url::parse(&config.url)
            .with_context(|| format!("invalid URL for tier {}: {}", config.name, config.url))?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("failed to build llama.cpp HTTP client")?;
        Ok(Self {
            name: config.name.clone(),
            url: config.url.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.timeout(),
            client,
        })
    }
}

/// Render the chat template the GGUF chat models expect.
pub fn format_chat_prompt(prompt: &PromptContext) -> String {
    format!(
        "<|system|>\n{}</s>\n<|user|>\n{}</s>\n{ASSISTANT_TAG}\n",
        prompt.system_message(),
        prompt.user_text
    )
}

/// Strip template residue the server may echo back.
fn clean_completion(raw: &str) -> String {
    let mut text = raw.rsplit(ASSISTANT_TAG).next().unwrap_or(raw);
    for stop in STOP_SEQUENCES {
        if let Some(idx) = text.find(stop) {
            text = &text[..idx];
        }
    }
    text.trim().to_string()
}

#[async_trait]
impl GenerationTier for LlamaCppTier {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn is_available(&self) -> bool {
        let probe = self
            .client
            .get(endpoint(&self.url, "health"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;
        matches!(probe, Ok(resp) if resp.status().is_success())
    }

    async fn complete(&self, prompt: &PromptContext) -> Result<String, TierFailure> {
        let rendered = format_chat_prompt(prompt);
        let body = CompletionRequest {
            prompt: &rendered,
            n_predict: self.max_tokens,
            temperature: self.temperature,
            top_p: 0.95,
            stop: &STOP_SEQUENCES,
            stream: false,
        };
        let resp = self
            .client
            .post(endpoint(&self.url, "completion"))
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
        let parsed: CompletionResponse = resp.json().await?;
        let text = clean_completion(&parsed.content);
        if text.is_empty() {
            return Err(TierFailure::EmptyCompletion);
        }
        Ok(text)
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: usize,
    temperature: f32,
    top_p: f32,
    stop: &'a [&'a str],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_wraps_system_and_user() {
        let prompt = PromptContext::new("persona", Some("[a.txt]\nAcorn".into()), "hello");
        let rendered = format_chat_prompt(&prompt);
        assert!(rendered.starts_with("<|system|>\npersona\n\n"));
        assert!(rendered.contains("[a.txt]\nAcorn</s>\n<|user|>\nhello</s>\n"));
        assert!(rendered.ends_with("<|assistant|>\n"));
    }

    #[test]
    fn cleans_echoed_template() {
        assert_eq!(
            clean_completion("<|system|>\nx</s>\n<|assistant|>\n Hello!</s>\n<|user|>\nmore"),
            "Hello!"
        );
        assert_eq!(clean_completion("  plain reply  "), "plain reply");
        assert_eq!(clean_completion("</s>"), "");
    }

    #[test]
    fn response_defaults_missing_content() {
        let parsed: CompletionResponse = serde_json::from_str(r#"{"stop": true}"#).unwrap();
        assert!(parsed.content.is_empty());
    }
}
