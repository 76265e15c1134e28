use chrono::Utc;
use clap::Parser;
use market_refresh::cli::{open_cache, Cli, Commands, RunArgs};
use market_refresh::config::Config;
use market_refresh::market::MarketClock;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration; a missing file means built-in defaults
    let config_found = Path::new(&cli.config).exists();
    let mut config = if config_found {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };
    config.apply_env();
    config.validate()?;

    // Initialize telemetry
    let _telemetry = market_refresh::telemetry::init_telemetry(&config.telemetry)?;
    if !config_found {
        tracing::info!(path = %cli.config, "No config file found, using defaults");
    }

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => {
            args.execute(&config).await?;
        }
        Commands::Watch(args) => {
            args.execute(&config).await?;
        }
        Commands::Status => {
            let clock = MarketClock::new(config.market.window()?);
            let now = Utc::now();
            let local = now.with_timezone(&clock.window().time_zone);

            println!("market-refresh status");
            println!("  Exchange time: {}", local.format("%a %Y-%m-%d %H:%M:%S %Z"));
            println!(
                "  Market: {}",
                if clock.is_active(now) { "open" } else { "closed" }
            );
            if let Some(next) = clock.next_open(now) {
                println!(
                    "  Next open: {}",
                    next.with_timezone(&clock.window().time_zone)
                        .format("%a %Y-%m-%d %H:%M %Z")
                );
            }
            match open_cache(&config)?.entries().await {
                Ok(entries) => {
                    println!("  Cached tickers: {}", entries.len());
                    if let Some(latest) = entries.iter().map(|e| e.updated_at).max() {
                        println!("  Last update: {}", latest.to_rfc3339());
                    }
                }
                Err(e) => println!("  Cache: unavailable ({})", e),
            }
        }
        Commands::Config => {
            println!("Current configuration:");
            print!("{}", toml::to_string_pretty(&config)?);
            println!(
                "# provider api key: {}",
                if config.provider.api_key.is_some() { "set" } else { "not set" }
            );
        }
    }

    Ok(())
}
