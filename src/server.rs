//! Serial bridge startup and shutdown.
//!
//! [`serve`] wires the pipeline (index, embedding provider, generation
//! tiers) to the configured serial port and runs until Ctrl-C.

use anyhow::{Context, Result};

use armgpt::bridge::{Bridge, Pipeline};
use armgpt::config::ArmGptConfig;
use armgpt::serial::port;

/// Start the bridge on the configured serial port.
pub async fn serve(config: ArmGptConfig) -> Result<()> {
    tracing::info!(
        port = %config.serial.port,
        baud = config.serial.baud_rate,
        index = %config.resolved_index_path().display(),
        "starting ArmGPT serial bridge"
    );

    let pipeline = Pipeline::from_config(&config)?;
    tracing::info!(
        records = pipeline.retriever().index().len(),
        embedded = pipeline.retriever().index().embedded_count(),
        "retrieval ready"
    );
    log_tier_availability(&pipeline).await;

    let serial_config = config.serial.clone();
    let transport = tokio::task::spawn_blocking(move || port::open(&serial_config))
        .await
        .context("serial open task panicked")?
        .context("failed to initialize serial port")?;

    let bridge = Bridge::new(transport, pipeline, config.idle_sleep());
    tracing::info!("ArmGPT server ready");
    let session = bridge.run(shutdown_signal()).await;

    tracing::info!(
        messages = session.message_count,
        errors = session.error_count,
        "server stopped"
    );
    Ok(())
}

/// Probe each tier once so the operator sees what is reachable. A tier
/// that is down now is still tried per message.
async fn log_tier_availability(pipeline: &Pipeline) {
    for tier in pipeline.controller().tiers() {
        let available = tokio::time::timeout(tier.timeout(), tier.is_available())
            .await
            .unwrap_or(false);
        if available {
            tracing::info!(tier = tier.name(), "generation tier available");
        } else {
            tracing::warn!(tier = tier.name(), "generation tier not reachable");
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}
