//! CLI `doctor`: check each dependency of the bridge and print a report.

use std::path::Path;

use anyhow::Result;

use armgpt::config::ArmGptConfig;
use armgpt::embedding;
use armgpt::generation;
use armgpt::index::VectorIndex;
use armgpt::serial::port;

pub async fn doctor(config: &ArmGptConfig, config_path: &Path) -> Result<()> {
    println!("ArmGPT Health Report");
    println!("====================");
    println!();
    println!(
        "Config:            {}{}",
        config_path.display(),
        if config_path.exists() { "" } else { " (not found, using defaults)" }
    );
    println!();

    let index_path = config.resolved_index_path();
    println!("Index:             {}", index_path.display());
    let index_dims = match VectorIndex::load(&index_path) {
        Ok(index) => {
            let file_size = std::fs::metadata(&index_path).map(|m| m.len()).unwrap_or(0);
            println!("  File size:       {}", format_bytes(file_size));
            println!("  Records:         {}", index.len());
            println!("  Embedded:        {}", index.embedded_count());
            match index.dimensions() {
                Some(dims) => println!("  Dimensions:      {dims}"),
                None => println!("  Dimensions:      (none, similarity search disabled)"),
            }
            index.dimensions()
        }
        Err(e) => {
            println!("  Status:          {e}");
            println!("  Run `armgpt index build` to create it.");
            None
        }
    };
    println!();

    println!("Embedding:         {} ({})", config.embedding.model, config.embedding.url);
    match embedding::create_provider(&config.embedding) {
        Ok(provider) => match provider.embed("ping").await {
            Ok(vector) => {
                println!("  Status:          OK ({} dimensions)", vector.len());
                if let Some(dims) = index_dims.filter(|&d| d != vector.len()) {
                    println!(
                        "  WARNING: index has {dims} dimensions; rebuild it with this model."
                    );
                }
            }
            Err(e) => println!("  Status:          FAILED ({e})"),
        },
        Err(e) => println!("  Status:          FAILED ({e})"),
    }
    println!();

    println!("Generation tiers:");
    for tier_config in &config.generation.tiers {
        let status = match generation::create_tier(tier_config) {
            Ok(tier) => {
                let reachable = tokio::time::timeout(tier.timeout(), tier.is_available())
                    .await
                    .unwrap_or(false);
                let status = if reachable { "available" } else { "unreachable" };
                status.to_string()
            }
            Err(e) => format!("misconfigured ({e})"),
        };
        println!(
            "  {:<10} {:<10} {:<24} {status}",
            tier_config.name,
            tier_config.kind.as_str(),
            tier_config.model
        );
    }
    if config.generation.tiers.is_empty() {
        println!("  (none configured; `armgpt serve` will refuse to start)");
    }
    println!();

    let device = port::resolve_port(&config.serial.port);
    println!("Serial port:       {} @ {} baud", device, config.serial.baud_rate);
    println!(
        "  Device:          {}",
        if Path::new(device).exists() { "present" } else { "missing" }
    );
    let ports = port::available_ports();
    if ports.is_empty() {
        println!("  Available:       (none detected)");
    } else {
        println!("  Available:       {}", ports.join(", "));
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
