use anyhow::Result;
use clap::Parser;
use tracing::warn;

// mimalloc keeps memory from ballooning under many concurrent workers
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use politecrawl::cli::{Cli, Commands};
use politecrawl::commands;
use politecrawl::crawl::run_crawl;
use politecrawl_core::AppConfig;

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config_file).unwrap_or_else(|_| {
        warn!(path = %cli.config_file, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let config: AppConfig = toml::from_str(&config_str)?;
    config.validate()?;

    match cli.command {
        Commands::Crawl { restart } => run_crawl(config, restart).await?,
        Commands::Status => commands::status::run(config)?,
    }

    Ok(())
}
