//! Index record definitions.
//!
//! [`IndexRecord`] mirrors one line of the JSON-lines index file written by
//! `armgpt index build`. [`ScoredRecord`] pairs a record with its similarity
//! to a query.

use serde::{Deserialize, Deserializer, Serialize};

/// One retrievable chunk of source text plus its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Global, monotonic chunk number across the whole index.
    pub id: u64,
    /// Stem of the source file. Written as `doc_id`.
    #[serde(rename = "doc_id", alias = "document_id", default)]
    pub document_id: String,
    /// Position of this chunk within its document.
    #[serde(default)]
    pub chunk_id: u32,
    /// File name shown as the block label in retrieved context.
    #[serde(default = "unknown_source")]
    pub source: String,
    pub text: String,
    /// Empty when the chunk was never embedded. Such records are skipped by
    /// similarity ranking but still eligible for the prefix fallback.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub embedding: Vec<f32>,
}

impl IndexRecord {
    pub fn is_embedded(&self) -> bool {
        !self.embedding.is_empty()
    }
}

/// A record and its cosine similarity to the query, in `[-1, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct ScoredRecord<'a> {
    pub score: f32,
    pub record: &'a IndexRecord,
}

fn unknown_source() -> String {
    "unknown".into()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<f32>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_builder_output_line() {
        let line = r#"{"id": 3, "doc_id": "acorn", "chunk_id": 1, "source": "acorn.txt", "text": "The ARM1 ran first in 1985.", "embedding": [0.5, -0.5]}"#;
        let record: IndexRecord = serde_json::from_str(line).unwrap();
        assert_eq!(record.id, 3);
        assert_eq!(record.document_id, "acorn");
        assert_eq!(record.chunk_id, 1);
        assert_eq!(record.source, "acorn.txt");
        assert_eq!(record.embedding, vec![0.5, -0.5]);
        assert!(record.is_embedded());
    }

    #[test]
    fn null_embedding_means_unembedded() {
        let line = r#"{"id": 0, "document_id": "x", "chunk_id": 0, "source": "x.txt", "text": "t", "embedding": null}"#;
        let record: IndexRecord = serde_json::from_str(line).unwrap();
        assert_eq!(record.document_id, "x");
        assert!(record.embedding.is_empty());
        assert!(!record.is_embedded());
    }

    #[test]
    fn missing_source_defaults_to_unknown() {
        let record: IndexRecord = serde_json::from_str(r#"{"id": 1, "text": "t"}"#).unwrap();
        assert_eq!(record.source, "unknown");
        assert!(record.embedding.is_empty());
    }

    #[test]
    fn serializes_with_doc_id_field() {
        let record = IndexRecord {
            id: 7,
            document_id: "risc".into(),
            chunk_id: 2,
            source: "risc.txt".into(),
            text: "text".into(),
            embedding: vec![],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["doc_id"], "risc");
        assert!(json.get("document_id").is_none());
    }
}
