//! Query-text-to-vector embedding.
//!
//! Provides the [`EmbeddingProvider`] trait and an Ollama-backed
//! implementation. The provider is created via [`create_provider`] from
//! configuration; the index must have been built with the same model.

pub mod ollama;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::EmbeddingError;

/// Trait for embedding text into vectors.
///
/// A single call is one synchronous request/response exchange bounded by the
/// provider's timeout; there is no streaming.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Model name, for logs and diagnostics.
    fn model(&self) -> &str;
}

/// Create an embedding provider from config.
///
/// Currently only `"ollama"` is supported.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "ollama" => {
            let provider = ollama::OllamaEmbeddingProvider::new(config)?;
            Ok(Box::new(provider))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: ollama"),
    }
}
