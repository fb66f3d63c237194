//! Ollama embedding provider (`POST /api/embed`).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;
use crate::error::EmbeddingError;

pub struct OllamaEmbeddingProvider {
    client: Client,
    url: String,
    model: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

impl OllamaEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build embedding HTTP client")?;
        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let body = EmbedRequest {
            model: &self.model,
            input: [text],
        };
        let request = self
            .client
            .post(format!("{}/api/embed", self.url))
            .json(&body)
            .send();
        let resp = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| EmbeddingError::Timeout(self.timeout))??;

        if !resp.status().is_success() {
            return Err(EmbeddingError::Status(resp.status()));
        }
        let data: Value = resp.json().await?;
        parse_embed_response(&data).ok_or(EmbeddingError::MalformedResponse)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Extract the first vector from an `/api/embed` response.
///
/// Accepts both `{"embeddings": [[...]]}` and the older
/// `{"embedding": [...]}` shape. Empty vectors count as missing.
pub fn parse_embed_response(data: &Value) -> Option<Vec<f32>> {
    let vector = data
        .get("embeddings")
        .and_then(|e| e.as_array())
        .and_then(|e| e.first())
        .or_else(|| data.get("embedding"))?
        .as_array()?;
    let parsed: Option<Vec<f32>> = vector.iter().map(|x| x.as_f64().map(|x| x as f32)).collect();
    parsed.filter(|v| !v.is_empty())
}
