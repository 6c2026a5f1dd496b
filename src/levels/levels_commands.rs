use super::config;
use super::models::AnalysisRequest;
use super::orchestrator::{AnalysisOrchestrator, AnalysisReport};
use super::source::CachingSource;
use super::yahoo_client::YahooClient;
use crate::api_server_axum;
use crate::utility::timed_async;

use anyhow::Result;
use colored::Colorize;
use std::sync::Arc;

/// Command handler for the batch and server modes
pub struct LevelsCommands;

impl LevelsCommands {
    /// Generate the script once for the configured tickers and write it to disk
    pub async fn run_batch() -> Result<()> {
        println!("{}", "=".repeat(60).blue());
        println!("{}", "OI Levels Batch Generator".green().bold());
        println!("{}", "=".repeat(60).blue());
        println!();

        let request = AnalysisRequest::parse(
            &config::get_tickers(),
            &config::get_target_date(),
            config::get_num_expirations(),
            config::get_num_strikes(),
        )?;

        let source = Arc::new(CachingSource::new(YahooClient::new()?));
        let orchestrator = AnalysisOrchestrator::from_env(source);

        println!("{} Tickers: {}", "→".cyan(), request.symbols.join(",").yellow());
        println!("{} Target date: {}", "→".cyan(), request.target_date.to_string().yellow());
        println!(
            "{} Using {} nearest expirations, top {} strikes by open interest",
            "→".cyan(),
            request.num_expirations,
            request.num_strikes
        );
        println!("{} Max concurrent symbols: {}", "ℹ".blue(), orchestrator.max_concurrent());
        if let Some(timeout) = orchestrator.run_timeout() {
            println!("{} Run deadline: {} seconds", "⏱".yellow(), timeout.as_secs());
        }
        println!();

        let report = timed_async("batch generation", || orchestrator.run_report(&request)).await?;

        let output_path = config::get_output_path();
        std::fs::write(&output_path, &report.artifact.script_text)?;

        Self::display_summary(&report, request.symbols.len(), &output_path);

        println!();
        println!("{}", "=".repeat(60).blue());
        println!("{}", "Done!".green().bold());
        println!("{}", "=".repeat(60).blue());

        Ok(())
    }

    /// Run API server mode
    pub async fn run_server(port: u16) -> Result<()> {
        println!("{}", "=".repeat(60).blue());
        println!("{}", "OI Levels API Server".green().bold());
        println!("{}", "=".repeat(60).blue());
        println!();

        api_server_axum::start_server(port).await
    }

    fn display_summary(report: &AnalysisReport, requested: usize, output_path: &str) {
        let skipped: Vec<_> = report
            .diagnostics
            .events()
            .iter()
            .filter(|event| event.is_skip())
            .collect();

        println!("{}", "=".repeat(60).blue());
        println!("{}", "Summary".cyan().bold());
        println!("{}", "=".repeat(60).blue());
        println!("{} Requested: {}", "ℹ".blue(), requested);
        println!("{} Emitted: {}", "✓".green(), requested.saturating_sub(skipped.len()));
        println!("{} Skipped: {}", "✗".red(), skipped.len());
        println!("{} Generated at: {}", "✓".green(), report.artifact.generated_at.to_rfc3339());
        println!("{} Saved script to {}", "✓".green(), output_path.yellow());
        println!();

        if !skipped.is_empty() {
            println!("{}", "Skipped Symbols:".red());
            for event in skipped.iter().take(10) {
                println!("  {} {}", "✗".red(), event);
            }
            if skipped.len() > 10 {
                println!("  ... and {} more", skipped.len() - 10);
            }
        }
    }

    /// Print usage instructions
    pub fn print_usage() {
        eprintln!("Set LEVELS_MODE environment variable to control execution mode");
        eprintln!("Examples:");
        eprintln!("  LEVELS_MODE=server LEVELS_PORT=5000 cargo run       # Start API server on port 5000");
        eprintln!("  LEVELS_MODE=batch LEVELS_TICKERS=QQQ,SPY cargo run  # Write oi_levels.ts");
        eprintln!("Optional: LEVELS_TARGET_DATE, LEVELS_NUM_EXPIRATIONS, LEVELS_NUM_STRIKES,");
        eprintln!("          LEVELS_MAX_CONCURRENT, LEVELS_RUN_TIMEOUT_SECS, LEVELS_OUTPUT");
    }
}
