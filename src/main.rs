use anyhow::Result;
use colored::Colorize;
use oi_levels::app_config::AppConfig;
use oi_levels::levels::levels_commands::LevelsCommands;
use oi_levels::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // ========================================
    // CONFIGURATION - from environment
    // ========================================
    let app_config = AppConfig::from_env();
    logging::init_logging(&app_config.log_dir)?;

    println!("{}", "OI Levels".green().bold());
    app_config.log_config();

    if let Err(e) = app_config.validate() {
        eprintln!("{} {}", "✗".red(), e);
        LevelsCommands::print_usage();
        std::process::exit(1);
    }

    match app_config.mode.as_str() {
        "server" => LevelsCommands::run_server(app_config.port).await?,
        _ => LevelsCommands::run_batch().await?,
    }

    Ok(())
}
