use std::sync::Arc;

use anyhow::{Context, Result};

use armgpt::config::ArmGptConfig;
use armgpt::embedding;
use armgpt::index::retrieve::{truncate_chars, Retriever, Selection};
use armgpt::index::VectorIndex;

const PREVIEW_CHARS: usize = 120;

/// Show which chunks a query would pull into the prompt.
pub async fn search(config: &ArmGptConfig, query: &str, k: usize) -> Result<()> {
    let index_path = config.resolved_index_path();
    let index = VectorIndex::load(&index_path)
        .with_context(|| format!("failed to load index {}", index_path.display()))?;

    let provider = embedding::create_provider(&config.embedding)?;
    let query_embedding = match provider.embed(query).await {
        Ok(vector) => Some(vector),
        Err(e) => {
            println!("Embedding failed ({e}); showing the fallback selection.\n");
            None
        }
    };

    let retriever = Retriever::new(Arc::new(index), config.retrieval.max_chunk_chars);
    let selection = retriever.select(query_embedding.as_deref(), k);

    if selection.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    match &selection {
        Selection::Ranked(scored) => {
            println!("Top {} result(s)\n", scored.len());
            for (i, hit) in scored.iter().enumerate() {
                println!(
                    "  {}. [{}] chunk {} (score: {:.4})",
                    i + 1,
                    hit.record.source,
                    hit.record.id,
                    hit.score
                );
                println!("     {}", preview(&hit.record.text));
                println!();
            }
        }
        Selection::Fallback(records) => {
            println!("First {} chunk(s), unranked\n", records.len());
            for (i, record) in records.iter().enumerate() {
                println!("  {}. [{}] chunk {}", i + 1, record.source, record.id);
                println!("     {}", preview(&record.text));
                println!();
            }
        }
    }

    Ok(())
}

fn preview(text: &str) -> String {
    let cut = truncate_chars(text, PREVIEW_CHARS);
    if cut.len() < text.len() {
        format!("{cut}...")
    } else {
        cut.to_string()
    }
}
