//! CLI `ask`: run one message through the pipeline and print the reply.

use anyhow::Result;

use armgpt::bridge::Pipeline;
use armgpt::config::ArmGptConfig;
use armgpt::generation::AttemptOutcome;

pub async fn ask(config: &ArmGptConfig, message: &str) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let response = pipeline.respond(message).await;

    println!("{}", response.reply());
    println!();
    println!("Kind:       {:?}", response.kind);
    println!("Context:    {}", if response.augmented { "retrieved" } else { "none" });
    println!(
        "Tier:       {}",
        response.report.tier.as_deref().unwrap_or("(degraded reply)")
    );
    for attempt in &response.report.attempts {
        let elapsed = attempt.finished_at - attempt.started_at;
        match &attempt.outcome {
            AttemptOutcome::Success(_) => {
                println!("  {:<10} ok in {} ms", attempt.tier_name, elapsed.num_milliseconds())
            }
            AttemptOutcome::Failure(reason) => println!(
                "  {:<10} failed after {} ms: {reason}",
                attempt.tier_name,
                elapsed.num_milliseconds()
            ),
        }
    }
    Ok(())
}
