//! CLI `index build`: chunk a docs directory, embed each chunk, write JSONL.

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use armgpt::config::ArmGptConfig;
use armgpt::embedding;
use armgpt::index::build::{chunk_documents, collect_documents, write_index};

pub async fn build(config: &ArmGptConfig, docs_dir: &Path, output: &Path) -> Result<()> {
    let paths = collect_documents(docs_dir)?;
    if paths.is_empty() {
        println!("No .txt documents found in {}", docs_dir.display());
        return Ok(());
    }
    println!("Found {} document(s) in {}", paths.len(), docs_dir.display());

    let mut records = chunk_documents(
        &paths,
        config.index.chunk_words,
        config.index.overlap_words,
    )?;
    if records.is_empty() {
        println!("Documents contained no text; nothing to index.");
        return Ok(());
    }

    let provider = embedding::create_provider(&config.embedding)?;
    println!(
        "Embedding {} chunk(s) with {}...",
        records.len(),
        provider.model()
    );

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("invalid progress template")?
            .progress_chars("##-"),
    );

    let mut failed = 0usize;
    for record in &mut records {
        pb.set_message(record.source.clone());
        match provider.embed(&record.text).await {
            Ok(vector) => record.embedding = vector,
            Err(e) => {
                failed += 1;
                tracing::warn!(id = record.id, source = %record.source, error = %e, "chunk left unembedded");
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    write_index(output, &records)?;

    let embedded = records.len() - failed;
    println!(
        "Wrote {} chunk(s) to {} ({} embedded)",
        records.len(),
        output.display(),
        embedded
    );
    if failed > 0 {
        println!(
            "WARNING: {failed} chunk(s) have no embedding; they are only used when similarity search is unavailable."
        );
    }
    Ok(())
}
