use crate::levels::config;
use anyhow::{Result, bail};
use colored::Colorize;
use std::time::Duration;

/// Application configuration handler
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mode: String,
    pub port: u16,
    pub max_concurrent: usize,
    pub run_timeout: Option<Duration>,
    pub log_dir: String,
}

impl AppConfig {
    /// Create new configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            mode: config::get_execution_mode(),
            port: config::get_port(),
            max_concurrent: config::get_max_concurrent(),
            run_timeout: config::get_run_timeout(),
            log_dir: config::get_log_dir(),
        }
    }

    /// Print the effective configuration
    pub fn log_config(&self) {
        println!("{} Mode: {}", "→".cyan(), self.mode.yellow());
        if self.mode == "server" {
            println!("{} Port: {}", "→".cyan(), self.port);
        }
        println!("{} Max concurrent symbols: {}", "→".cyan(), self.max_concurrent);
        match self.run_timeout {
            Some(timeout) => println!("{} Run deadline: {}s", "→".cyan(), timeout.as_secs()),
            None => println!("{} Run deadline: disabled", "→".cyan()),
        }
        println!();
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.mode.as_str(), "batch" | "server") {
            bail!("Invalid mode '{}'. Use 'batch' or 'server'", self.mode);
        }
        if self.mode == "server" && self.port == 0 {
            bail!("LEVELS_PORT must be a non-zero port");
        }
        Ok(())
    }
}
