mod helpers;

use std::sync::Arc;

use helpers::{axis, corpus, record, write_jsonl};
use armgpt::index::retrieve::{Retriever, Selection};
use armgpt::index::VectorIndex;

#[test]
fn index_file_round_trips_through_loader() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_jsonl(dir.path(), &corpus());

    let index = VectorIndex::load(&path).unwrap();
    assert_eq!(index.len(), 4);
    assert_eq!(index.embedded_count(), 4);
    assert_eq!(index.dimensions(), Some(4));
    assert_eq!(index.records()[2].source, "thumb.txt");
}

#[test]
fn top_k_larger_than_index_returns_everything() {
    let index = VectorIndex::from_records(corpus()[..3].to_vec());
    let retriever = Retriever::new(Arc::new(index), 0);

    let selection = retriever.select(Some(&axis(1)), 5);
    assert!(!selection.is_fallback());
    assert_eq!(selection.len(), 3);
    assert_eq!(selection.records()[0].source, "arm1.txt");
}

#[test]
fn ranking_puts_the_closest_chunk_first() {
    let index = VectorIndex::from_records(corpus());
    let retriever = Retriever::new(Arc::new(index), 0);

    let query = [0.1, 0.0, 0.9, 0.2];
    let Selection::Ranked(scored) = retriever.select(Some(&query), 2) else {
        panic!("expected ranked selection");
    };
    assert_eq!(scored.len(), 2);
    assert_eq!(scored[0].record.source, "thumb.txt");
    assert_eq!(scored[1].record.source, "risc.txt");
    assert!(scored[0].score >= scored[1].score);
}

#[test]
fn missing_query_embedding_uses_storage_order() {
    let index = VectorIndex::from_records(corpus());
    let retriever = Retriever::new(Arc::new(index), 0);

    let context = retriever.retrieve(None, 2);
    assert_eq!(
        context,
        "[acorn.txt]\nAcorn Computers designed the first ARM chip.\n\n\
         [arm1.txt]\nThe ARM1 ran for the first time in 1985."
    );
}

#[test]
fn query_of_wrong_dimension_falls_back() {
    let index = VectorIndex::from_records(corpus());
    let retriever = Retriever::new(Arc::new(index), 0);

    let selection = retriever.select(Some(&[1.0, 0.0]), 3);
    assert!(selection.is_fallback());
    let sources: Vec<_> = selection.records().iter().map(|r| r.source.as_str()).collect();
    assert_eq!(sources, ["acorn.txt", "arm1.txt", "thumb.txt"]);
}

#[test]
fn empty_index_yields_no_context() {
    let retriever = Retriever::new(Arc::new(VectorIndex::empty()), 800);
    assert_eq!(retriever.retrieve(Some(&axis(0)), 5), "");
    assert_eq!(retriever.retrieve(None, 5), "");
}

#[test]
fn long_chunks_are_truncated_in_context() {
    let long = "x".repeat(50);
    let index = VectorIndex::from_records(vec![record(0, "long.txt", &long, axis(0))]);
    let retriever = Retriever::new(Arc::new(index), 10);

    assert_eq!(retriever.retrieve(Some(&axis(0)), 1), format!("[long.txt]\n{}", "x".repeat(10)));
}

#[test]
fn missing_index_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(VectorIndex::load(dir.path().join("absent.jsonl")).is_err());
}

#[test]
fn corrupt_lines_are_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.jsonl");
    let mut bytes = Vec::new();
    bytes.extend_from_slice(
        br#"{"id": 0, "doc_id": "acorn", "chunk_id": 0, "source": "acorn.txt", "text": "Acorn", "embedding": [1.0, 0.0]}"#,
    );
    bytes.extend_from_slice(b"\nthis is not json\n");
    bytes.extend_from_slice(b"\xff\xfe{\"id\": 9}\n");
    bytes.extend_from_slice(b"\n   \n");
    bytes.extend_from_slice(
        br#"{"id": 1, "doc_id": "arm1", "chunk_id": 0, "source": "arm1.txt", "text": "ARM1", "embedding": [0.0, 1.0]}"#,
    );
    bytes.push(b'\n');
    std::fs::write(&path, bytes).unwrap();

    let index = VectorIndex::load(&path).unwrap();
    let ids: Vec<u64> = index.records().iter().map(|r| r.id).collect();
    assert_eq!(ids, [0, 1]);
    assert_eq!(index.dimensions(), Some(2));
}
