//! Health command handler.
//!
//! Prints per-source circuit and latency state plus result cache
//! statistics. A fresh process reports defaults; the command is mainly
//! useful against a long-running deployment exposing the same snapshot.

use clap::Args;
use fathom_core::{config::AppConfig, AppResult};
use fathom_routing::QueryEngine;
use fathom_sources::build_adapters;

/// Show source health and cache statistics
#[derive(Args, Debug)]
pub struct HealthCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl HealthCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing health command");

        let adapters = build_adapters(&config.sources);
        let engine = QueryEngine::new(config.clone(), adapters);

        let snapshot = engine.health_snapshot();
        let stats = engine.cache_stats();

        if self.json {
            let payload = serde_json::json!({
                "sources": snapshot,
                "result_cache": stats,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
            return Ok(());
        }

        println!("Sources:");
        for entry in &snapshot {
            println!(
                "  {:<16} circuit={:<9} error_rate={:.2} latency={:.0}ms samples={}",
                entry.source.to_string(),
                entry.circuit.to_string(),
                entry.error_rate,
                entry.mean_latency_ms,
                entry.samples
            );
        }

        println!();
        println!(
            "Result cache: {} entries ({} valid, {} expired), capacity {}, ttl {}s",
            stats.entries, stats.valid, stats.expired, stats.capacity, stats.ttl_secs
        );

        Ok(())
    }
}
