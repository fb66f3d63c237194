//! Offline index construction: chunk `.txt` documents and write JSON lines.
//!
//! Embedding happens in the CLI layer, which owns the progress bar; this
//! module only deals with files and text.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::types::IndexRecord;

/// Word-based chunking with overlap between consecutive chunks.
pub fn chunk_words(text: &str, max_words: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || max_words == 0 {
        return Vec::new();
    }
    let step = if max_words > overlap {
        max_words - overlap
    } else {
        max_words
    };

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + max_words).min(words.len());
        chunks.push(words[start..end].join(" "));
        start += step;
    }
    chunks
}

/// `*.txt` files directly inside `docs_dir`, sorted by path.
pub fn collect_documents(docs_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(docs_dir)
        .with_context(|| format!("failed to read docs dir {}", docs_dir.display()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Read and chunk every document into unembedded records.
///
/// `id` runs across the whole index; `chunk_id` restarts per document.
pub fn chunk_documents(
    paths: &[PathBuf],
    max_words: usize,
    overlap: usize,
) -> Result<Vec<IndexRecord>> {
    let mut records = Vec::new();
    let mut next_id = 0u64;
    for path in paths {
        let bytes =
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let text = String::from_utf8_lossy(&bytes);
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let document_id = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let chunks = chunk_words(&text, max_words, overlap);
        tracing::info!(source = %source, chunks = chunks.len(), "chunked document");
        for (chunk_id, text) in chunks.into_iter().enumerate() {
            records.push(IndexRecord {
                id: next_id,
                document_id: document_id.clone(),
                chunk_id: chunk_id as u32,
                source: source.clone(),
                text,
                embedding: Vec::new(),
            });
            next_id += 1;
        }
    }
    Ok(records)
}

/// Write records as JSON lines, one record per line.
pub fn write_index(path: &Path, records: &[IndexRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush().context("failed to flush index file")?;
    Ok(())
}
