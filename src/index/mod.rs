//! In-memory vector index loaded from a JSON-lines file.
//!
//! The index is read once at startup and never mutated. Similarity search is
//! a full linear scan; the record counts this serves are in the hundreds to
//! low thousands.

pub mod build;
pub mod retrieve;
pub mod types;

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use crate::error::IndexLoadError;
use types::{IndexRecord, ScoredRecord};

/// Ordered, immutable collection of index records.
#[derive(Debug, Default)]
pub struct VectorIndex {
    records: Vec<IndexRecord>,
    dimensions: Option<usize>,
}

impl VectorIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load an index file, skipping lines that fail to parse.
    ///
    /// Only a missing or unreadable file is an error; a partially corrupt
    /// file yields the records that did parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IndexLoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => IndexLoadError::NotFound(path.to_path_buf()),
            _ => IndexLoadError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    tracing::warn!(line = lineno + 1, "skipping index line with invalid UTF-8");
                    skipped += 1;
                    continue;
                }
                Err(e) => {
                    return Err(IndexLoadError::Io {
                        path: path.to_path_buf(),
                        source: e,
                    })
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<IndexRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(line = lineno + 1, error = %e, "skipping malformed index line");
                    skipped += 1;
                }
            }
        }

        let index = Self::from_records(records);
        tracing::info!(
            path = %path.display(),
            records = index.len(),
            embedded = index.embedded_count(),
            dimensions = ?index.dimensions(),
            skipped,
            "index loaded"
        );
        Ok(index)
    }

    /// Build an index from records, enforcing a single embedding dimension.
    ///
    /// The first embedded record fixes the dimension; later records with a
    /// different non-zero length are dropped.
    pub fn from_records(records: Vec<IndexRecord>) -> Self {
        let mut dimensions: Option<usize> = None;
        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            if record.is_embedded() {
                let dim = record.embedding.len();
                match dimensions {
                    None => dimensions = Some(dim),
                    Some(expected) if expected != dim => {
                        tracing::warn!(
                            id = record.id,
                            expected,
                            actual = dim,
                            "skipping index record with mismatched embedding dimension"
                        );
                        continue;
                    }
                    Some(_) => {}
                }
            }
            kept.push(record);
        }
        Self {
            records: kept,
            dimensions,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Embedding dimension shared by every embedded record, if any.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn embedded_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_embedded()).count()
    }

    pub fn records(&self) -> &[IndexRecord] {
        &self.records
    }

    /// The first `k` records in storage order.
    pub fn prefix(&self, k: usize) -> &[IndexRecord] {
        &self.records[..k.min(self.records.len())]
    }

    /// Rank embedded records by cosine similarity, highest first.
    ///
    /// Equal scores keep storage order.
    pub fn top_k(&self, query: &[f32], k: usize) -> Vec<ScoredRecord<'_>> {
        if k == 0 {
            return Vec::new();
        }
        let mut scored: Vec<ScoredRecord<'_>> = self
            .records
            .iter()
            .filter(|r| r.is_embedded())
            .map(|record| ScoredRecord {
                score: cosine_similarity(query, &record.embedding),
                record,
            })
            .collect();
        // sort_by is stable
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        scored
    }
}

/// Cosine similarity `dot(a,b) / (|a||b|)`.
///
/// Returns 0.0 when either vector has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    if sim.is_nan() {
        return 0.0;
    }
    sim.clamp(-1.0, 1.0) as f32
}
