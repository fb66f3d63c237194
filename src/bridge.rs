//! The bridge loop: serial in, reply out, one message at a time.
//!
//! [`Pipeline`] turns message text into a reply (classify, retrieve,
//! generate). [`Bridge`] owns the transport and the session counters and
//! drives the pipeline from the serial link until shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::classify::{classify, MessageKind};
use crate::config::ArmGptConfig;
use crate::embedding::{self, EmbeddingProvider};
use crate::generation::prompt::{PromptContext, PERSONA};
use crate::generation::{self, GenerationReport, TierController};
use crate::index::retrieve::Retriever;
use crate::index::VectorIndex;
use crate::serial::{InboundMessage, SerialLink, SerialTransport};

/// Counters for one bridge instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    pub busy: bool,
    pub message_count: u64,
    pub error_count: u64,
}

/// Outcome of running one message through the pipeline.
#[derive(Debug, Clone)]
pub struct Response {
    pub kind: MessageKind,
    /// Retrieved context made it into the prompt.
    pub augmented: bool,
    pub report: GenerationReport,
}

impl Response {
    pub fn reply(&self) -> &str {
        &self.report.reply
    }
}

pub struct Pipeline {
    preamble: String,
    top_k: usize,
    retriever: Retriever,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    controller: TierController,
}

impl Pipeline {
    pub fn new(
        preamble: impl Into<String>,
        top_k: usize,
        retriever: Retriever,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        controller: TierController,
    ) -> Self {
        Self {
            preamble: preamble.into(),
            top_k,
            retriever,
            embedder,
            controller,
        }
    }

    /// Wire the pipeline from configuration.
    ///
    /// A missing index only disables retrieval; an invalid embedding
    /// provider or a generation config with no buildable tier is an error.
    pub fn from_config(config: &ArmGptConfig) -> Result<Self> {
        let index_path = config.resolved_index_path();
        let index = match VectorIndex::load(&index_path) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(error = %e, "no index loaded; retrieval context will be unavailable");
                VectorIndex::empty()
            }
        };
        let retriever = Retriever::new(Arc::new(index), config.retrieval.max_chunk_chars);

        let provider = embedding::create_provider(&config.embedding)?;
        let embedder: Arc<dyn EmbeddingProvider> = Arc::from(provider);
        tracing::info!(model = embedder.model(), "embedding provider ready");

        let controller = generation::build_controller(&config.generation)?;
        let preamble = config
            .generation
            .system_prompt
            .clone()
            .unwrap_or_else(|| PERSONA.to_string());

        Ok(Self::new(
            preamble,
            config.retrieval.top_k,
            retriever,
            Some(embedder),
            controller,
        ))
    }

    pub fn controller(&self) -> &TierController {
        &self.controller
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Classify, optionally retrieve, and generate a reply. Never fails:
    /// every failure along the way degrades instead.
    pub async fn respond(&self, text: &str) -> Response {
        let kind = classify(text);
        let context = if kind.needs_retrieval() {
            Some(self.context_for(text).await)
        } else {
            tracing::info!(?kind, "conversational message detected, skipping retrieval");
            None
        };

        let prompt = PromptContext::new(self.preamble.clone(), context, text);
        let augmented = prompt.retrieved_context.is_some();
        let report = self.controller.generate(&prompt).await;
        Response {
            kind,
            augmented,
            report,
        }
    }

    async fn context_for(&self, text: &str) -> String {
        if self.retriever.index().is_empty() {
            return String::new();
        }
        let query = match &self.embedder {
            Some(embedder) => match embedder.embed(text).await {
                Ok(vector) => Some(vector),
                Err(e) => {
                    tracing::warn!(error = %e, "query embedding failed");
                    None
                }
            },
            None => None,
        };
        self.retriever.retrieve(query.as_deref(), self.top_k)
    }
}

#[derive(Debug, Default)]
struct Counters {
    message_count: u64,
    error_count: u64,
}

pub struct Bridge<L: SerialLink> {
    transport: SerialTransport<L>,
    pipeline: Pipeline,
    counters: Counters,
    idle_sleep: Duration,
}

impl<L: SerialLink> Bridge<L> {
    pub fn new(transport: SerialTransport<L>, pipeline: Pipeline, idle_sleep: Duration) -> Self {
        Self {
            transport,
            pipeline,
            counters: Counters::default(),
            idle_sleep,
        }
    }

    pub fn session(&self) -> SessionState {
        SessionState {
            busy: self.transport.is_busy(),
            message_count: self.counters.message_count,
            error_count: self.counters.error_count,
        }
    }

    /// Handle at most one inbound message. Returns whether one was handled.
    pub async fn poll_once(&mut self) -> bool {
        match self.transport.read_message().await {
            Some(message) => {
                self.handle(message).await;
                true
            }
            None => false,
        }
    }

    async fn handle(&mut self, message: InboundMessage) {
        self.counters.message_count += 1;
        tracing::info!(
            message_number = self.counters.message_count,
            received_at = %message.received_at,
            "generating response"
        );
        let started = Instant::now();

        let mut busy = self.transport.begin_busy();
        let response = self.pipeline.respond(&message.text).await;
        if response.report.degraded {
            self.counters.error_count += 1;
            tracing::error!(error_count = self.counters.error_count, "no tier produced a reply");
        }
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            kind = ?response.kind,
            augmented = response.augmented,
            tier = response.report.tier.as_deref().unwrap_or("none"),
            "response generation completed"
        );
        busy.send(response.reply());
    }

    /// Serve until `shutdown` resolves, then close the transport.
    ///
    /// A message being processed when shutdown fires is abandoned; its busy
    /// guard is released before the transport closes.
    pub async fn run<F>(mut self, shutdown: F) -> SessionState
    where
        F: Future<Output = ()>,
    {
        tracing::info!("listening for messages");
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    tracing::info!("shutting down");
                    break;
                }
                () = self.tick() => {}
            }
        }

        let session = self.session();
        tracing::info!(
            messages = session.message_count,
            errors = session.error_count,
            "session summary"
        );
        self.transport.close();
        session
    }

    async fn tick(&mut self) {
        self.poll_once().await;
        tokio::time::sleep(self.idle_sleep).await;
    }
}
