#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use armgpt::bridge::Pipeline;
use armgpt::embedding::EmbeddingProvider;
use armgpt::error::{EmbeddingError, TierFailure};
use armgpt::generation::prompt::PromptContext;
use armgpt::generation::{GenerationTier, TierController};
use armgpt::index::build::write_index;
use armgpt::index::retrieve::Retriever;
use armgpt::index::types::IndexRecord;
use armgpt::index::VectorIndex;
use armgpt::serial::{FramingOptions, SerialLink, SerialTransport};

pub const DEGRADED: &str = "Sorry, I couldn't generate a response right now. Please try again!";

/// In-memory serial link. Clones share the same buffers, so a test keeps
/// one clone to feed input and inspect output.
#[derive(Clone, Default)]
pub struct MemLink {
    input: Arc<Mutex<VecDeque<u8>>>,
    output: Arc<Mutex<Vec<u8>>>,
}

impl MemLink {
    pub fn push(&self, bytes: &[u8]) {
        self.input.lock().unwrap().extend(bytes);
    }

    pub fn output(&self) -> Vec<u8> {
        self.output.lock().unwrap().clone()
    }

    pub fn output_text(&self) -> String {
        String::from_utf8(self.output()).unwrap()
    }

    pub fn pending_len(&self) -> usize {
        self.input.lock().unwrap().len()
    }
}

impl Read for MemLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut input = self.input.lock().unwrap();
        let n = buf.len().min(input.len());
        for slot in buf.iter_mut().take(n) {
            *slot = input.pop_front().unwrap();
        }
        Ok(n)
    }
}

impl Write for MemLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SerialLink for MemLink {
    fn pending(&mut self) -> io::Result<usize> {
        Ok(self.input.lock().unwrap().len())
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.input.lock().unwrap().clear();
        Ok(())
    }
}

pub fn mem_transport(link: &MemLink) -> SerialTransport<MemLink> {
    SerialTransport::new(
        link.clone(),
        FramingOptions {
            read_timeout: Duration::from_millis(50),
            settle: Duration::ZERO,
            max_line_bytes: 256,
        },
    )
}

#[derive(Clone)]
pub enum Script {
    Reply(String),
    Fail,
    Hang,
}

/// Tier with a fixed availability and behavior. Records the system
/// message of every prompt it is asked to complete.
#[derive(Clone)]
pub struct ScriptedTier {
    pub name: String,
    pub available: bool,
    pub script: Script,
    pub timeout: Duration,
    pub seen: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTier {
    pub fn new(name: &str, available: bool, script: Script) -> Self {
        Self {
            name: name.into(),
            available,
            script,
            timeout: Duration::from_millis(200),
            seen: Arc::default(),
        }
    }

    pub fn replying(name: &str, reply: &str) -> Self {
        Self::new(name, true, Script::Reply(reply.into()))
    }

    pub fn failing(name: &str) -> Self {
        Self::new(name, true, Script::Fail)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationTier for ScriptedTier {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn complete(&self, prompt: &PromptContext) -> Result<String, TierFailure> {
        self.seen.lock().unwrap().push(prompt.system_message());
        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::Fail => Err(TierFailure::Backend("scripted failure".into())),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(TierFailure::Backend("unreachable".into()))
            }
        }
    }
}

/// Embedder that returns the same vector for every text, or fails.
pub struct FixedEmbedder {
    pub vector: Option<Vec<f32>>,
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.vector.clone().ok_or(EmbeddingError::MalformedResponse)
    }

    fn model(&self) -> &str {
        "fixed"
    }
}

/// A 4-dim unit vector along axis `axis`.
pub fn axis(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; 4];
    v[axis % 4] = 1.0;
    v
}

pub fn record(id: u64, source: &str, text: &str, embedding: Vec<f32>) -> IndexRecord {
    IndexRecord {
        id,
        document_id: source.trim_end_matches(".txt").into(),
        chunk_id: 0,
        source: source.into(),
        text: text.into(),
        embedding,
    }
}

/// Small corpus: one chunk per axis.
pub fn corpus() -> Vec<IndexRecord> {
    vec![
        record(0, "acorn.txt", "Acorn Computers designed the first ARM chip.", axis(0)),
        record(1, "arm1.txt", "The ARM1 ran for the first time in 1985.", axis(1)),
        record(2, "thumb.txt", "Thumb is a compressed 16-bit instruction set.", axis(2)),
        record(3, "risc.txt", "RISC keeps instructions simple and regular.", axis(3)),
    ]
}

pub fn write_jsonl(dir: &Path, records: &[IndexRecord]) -> PathBuf {
    let path = dir.join("index.jsonl");
    write_index(&path, records).unwrap();
    path
}

pub fn pipeline(
    records: Vec<IndexRecord>,
    embedder: Option<Vec<f32>>,
    tiers: Vec<ScriptedTier>,
) -> Pipeline {
    let index = VectorIndex::from_records(records);
    let retriever = Retriever::new(Arc::new(index), 800);
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(FixedEmbedder { vector: embedder });
    let tiers: Vec<Box<dyn GenerationTier>> = tiers
        .into_iter()
        .map(|t| Box::new(t) as Box<dyn GenerationTier>)
        .collect();
    Pipeline::new(
        "You are ArmGPT.",
        5,
        retriever,
        Some(embedder),
        TierController::new(tiers, DEGRADED),
    )
}
