//! Ask command handler.
//!
//! Runs one question through the full routing pipeline and prints the fused
//! answer. Total source failure degrades to an explanation of what was
//! attempted, never a bare error string.

use clap::Args;
use fathom_core::{config::AppConfig, AppError, AppResult};
use fathom_routing::QueryEngine;
use fathom_sources::build_adapters;

/// Ask a question across the configured sources
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Short continuation hint from a prior exchange
    #[arg(long)]
    pub hint: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let adapters = build_adapters(&config.sources);
        let engine = QueryEngine::new(config.clone(), adapters);

        match engine.answer(&self.query, self.hint.as_deref()).await {
            Ok(fused) => {
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&fused)?);
                    return Ok(());
                }

                println!("{}", fused.content);
                println!();

                if fused.partial {
                    println!("_Some sources did not respond; this answer may be incomplete._");
                    println!();
                }

                println!("Sources:");
                for attribution in &fused.attributions {
                    println!(
                        "  - {} (weight {:.0}%, confidence {:.0}%)",
                        attribution.source,
                        attribution.weight * 100.0,
                        attribution.confidence * 100.0
                    );
                }
                println!("Overall confidence: {:.0}%", fused.overall_confidence * 100.0);

                Ok(())
            }
            Err(AppError::AllSourcesFailed(report)) => {
                // Degraded but explainable: say what was tried and why it failed
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    return Ok(());
                }

                println!("No source could answer this question.");
                println!();
                println!("Attempted:");
                for attempt in &report.attempts {
                    println!("  - {} ({}): {}", attempt.source, attempt.kind, attempt.detail);
                }

                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
