use std::sync::Arc;

use super::types::{IndexRecord, ScoredRecord};
use super::VectorIndex;

/// Records picked for a query.
#[derive(Debug)]
pub enum Selection<'a> {
    /// Ranked by similarity to the query embedding.
    Ranked(Vec<ScoredRecord<'a>>),
    /// Storage-order prefix, used when no usable query embedding exists.
    Fallback(&'a [IndexRecord]),
}

impl<'a> Selection<'a> {
    pub fn records(&self) -> Vec<&'a IndexRecord> {
        match self {
            Self::Ranked(scored) => scored.iter().map(|s| s.record).collect(),
            Self::Fallback(records) => records.iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Ranked(scored) => scored.len(),
            Self::Fallback(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Turns a query embedding into a context string from the shared index.
#[derive(Debug, Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    max_chunk_chars: usize,
}

impl Retriever {
    /// `max_chunk_chars` caps each chunk's text; 0 leaves chunks whole.
    pub fn new(index: Arc<VectorIndex>, max_chunk_chars: usize) -> Self {
        Self {
            index,
            max_chunk_chars,
        }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Pick up to `k` records for a query.
    ///
    /// Without a query embedding, or with one whose dimension does not match
    /// the index, this degrades to the first `k` records in storage order.
    pub fn select(&self, query: Option<&[f32]>, k: usize) -> Selection<'_> {
        match query {
            Some(query) => match self.index.dimensions() {
                Some(dim) if dim != query.len() => {
                    tracing::warn!(
                        index_dim = dim,
                        query_dim = query.len(),
                        k,
                        "query embedding dimension mismatch; falling back to first chunks"
                    );
                    Selection::Fallback(self.index.prefix(k))
                }
                _ => Selection::Ranked(self.index.top_k(query, k)),
            },
            None => {
                tracing::warn!(k, "no query embedding; falling back to first chunks");
                Selection::Fallback(self.index.prefix(k))
            }
        }
    }

    /// Build the context text for a query. Empty means "no augmentation".
    pub fn retrieve(&self, query: Option<&[f32]>, k: usize) -> String {
        if self.index.is_empty() {
            return String::new();
        }
        let selection = self.select(query, k);
        if let Selection::Ranked(scored) = &selection {
            for s in scored {
                tracing::debug!(id = s.record.id, source = %s.record.source, score = s.score, "retrieved chunk");
            }
        }
        format_context(&selection.records(), self.max_chunk_chars)
    }
}

/// Render records as `[source]\ntext` blocks separated by a blank line.
pub fn format_context(records: &[&IndexRecord], max_chunk_chars: usize) -> String {
    records
        .iter()
        .map(|r| format!("[{}]\n{}", r.source, truncate_chars(&r.text, max_chunk_chars)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// First `max_chars` characters of `text`; the whole string when `max_chars` is 0.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return text;
    }
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
