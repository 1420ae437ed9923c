use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "politecrawl", about = "Polite breadth-first web crawler")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    pub config_file: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start crawling from the seed URLs
    Crawl {
        /// Wipe all persisted state before starting; pass `--restart false`
        /// to resume from the save file
        #[arg(
            long,
            action = ArgAction::Set,
            default_value_t = true,
            num_args = 0..=1,
            default_missing_value = "true"
        )]
        restart: bool,
    },
    /// Show crawl progress from the persisted state
    Status,
}
