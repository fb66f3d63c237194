//! Tiered text generation.
//!
//! A [`TierController`] walks an ordered list of [`GenerationTier`]s and
//! returns the first non-empty completion. Tiers that report themselves
//! unavailable are skipped without an attempt record; failures and timeouts
//! are recorded and the next tier is tried. When nothing succeeds the
//! configured degraded reply is returned instead of an error.

pub mod llama_cpp;
pub mod ollama;
pub mod openai;
pub mod prompt;

use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::{GenerationConfig, TierConfig, TierKind};
use crate::error::TierFailure;
use prompt::PromptContext;

/// Probe timeout for availability checks against HTTP backends.
pub(crate) const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// One backend able to turn a prompt into a reply.
#[async_trait]
pub trait GenerationTier: Send + Sync {
    fn name(&self) -> &str;

    /// Upper bound on both the availability probe and the completion call.
    fn timeout(&self) -> Duration;

    /// Cheap precondition check, e.g. the service answers at all.
    async fn is_available(&self) -> bool;

    async fn complete(&self, prompt: &PromptContext) -> Result<String, TierFailure>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(String),
    Failure(String),
}

#[derive(Debug, Clone)]
pub struct GenerationAttempt {
    pub tier_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: AttemptOutcome,
}

impl GenerationAttempt {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Success(_))
    }
}

/// Result of one `generate` call.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub reply: String,
    /// Tier that produced `reply`; `None` when degraded.
    pub tier: Option<String>,
    pub attempts: Vec<GenerationAttempt>,
    /// Every tier was unavailable or failed.
    pub degraded: bool,
}

pub struct TierController {
    tiers: Vec<Box<dyn GenerationTier>>,
    degraded_reply: String,
}

impl TierController {
    pub fn new(tiers: Vec<Box<dyn GenerationTier>>, degraded_reply: impl Into<String>) -> Self {
        Self {
            tiers,
            degraded_reply: degraded_reply.into(),
        }
    }

    pub fn tiers(&self) -> &[Box<dyn GenerationTier>] {
        &self.tiers
    }

    pub async fn generate(&self, prompt: &PromptContext) -> GenerationReport {
        let mut attempts = Vec::new();

        for tier in &self.tiers {
            let name = tier.name();
            let limit = tier.timeout();

            match tokio::time::timeout(limit, tier.is_available()).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(tier = name, "tier unavailable, skipping");
                    continue;
                }
                Err(_) => {
                    tracing::warn!(tier = name, ?limit, "tier availability check timed out, skipping");
                    continue;
                }
            }

            let started_at = Utc::now();
            let clock = Instant::now();
            let outcome = match tokio::time::timeout(limit, tier.complete(prompt)).await {
                Ok(Ok(text)) if !text.trim().is_empty() => {
                    AttemptOutcome::Success(text.trim().to_string())
                }
                Ok(Ok(_)) => AttemptOutcome::Failure(TierFailure::EmptyCompletion.to_string()),
                Ok(Err(e)) => AttemptOutcome::Failure(e.to_string()),
                Err(_) => AttemptOutcome::Failure(TierFailure::Timeout(limit).to_string()),
            };
            let elapsed_ms = clock.elapsed().as_millis() as u64;

            match &outcome {
                AttemptOutcome::Success(text) => {
                    tracing::info!(tier = name, elapsed_ms, reply_len = text.len(), "tier succeeded")
                }
                AttemptOutcome::Failure(reason) => {
                    tracing::warn!(tier = name, elapsed_ms, reason = %reason, "tier failed")
                }
            }

            let reply = match &outcome {
                AttemptOutcome::Success(text) => Some(text.clone()),
                AttemptOutcome::Failure(_) => None,
            };
            attempts.push(GenerationAttempt {
                tier_name: name.to_string(),
                started_at,
                finished_at: Utc::now(),
                outcome,
            });

            if let Some(reply) = reply {
                return GenerationReport {
                    reply,
                    tier: Some(name.to_string()),
                    attempts,
                    degraded: false,
                };
            }
        }

        tracing::error!(
            tiers = self.tiers.len(),
            attempts = attempts.len(),
            "all generation tiers exhausted; sending degraded reply"
        );
        GenerationReport {
            reply: self.degraded_reply.clone(),
            tier: None,
            attempts,
            degraded: true,
        }
    }
}

/// Construct one tier from its configuration.
pub fn create_tier(config: &TierConfig) -> Result<Box<dyn GenerationTier>> {
    Ok(match config.kind {
        TierKind::Openai => Box::new(openai::ChatCompletionTier::new(config)?),
        TierKind::Ollama => Box::new(ollama::OllamaChatTier::new(config)?),
        TierKind::LlamaCpp => Box::new(llama_cpp::LlamaCppTier::new(config)?),
    })
}

/// Build the controller from config, skipping tiers that fail to construct.
///
/// Fails only when no tier at all could be built.
pub fn build_controller(config: &GenerationConfig) -> Result<TierController> {
    let mut tiers = Vec::with_capacity(config.tiers.len());
    for tier_config in &config.tiers {
        match create_tier(tier_config) {
            Ok(tier) => {
                tracing::info!(
                    tier = %tier_config.name,
                    kind = %tier_config.kind,
                    model = %tier_config.model,
                    "generation tier configured"
                );
                tiers.push(tier);
            }
            Err(e) => {
                tracing::error!(tier = %tier_config.name, error = %e, "failed to construct generation tier")
            }
        }
    }
    anyhow::ensure!(!tiers.is_empty(), "no generation tier could be constructed");
    Ok(TierController::new(tiers, config.degraded_reply.clone()))
}

/// Join a base URL and a path without doubling slashes.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Read an error body for logging, bounded in length.
pub(crate) async fn error_body(resp: reqwest::Response) -> String {
    let mut body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    if body.len() > 300 {
        let cut = floor_char_boundary(&body, 300);
        body.truncate(cut);
    }
    body
}

fn floor_char_boundary(s: &str, max_bytes: usize) -> usize {
    let mut cut = max_bytes.min(s.len());
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    cut
}
