use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use anyhow::Result;

use politecrawl_core::AppConfig;
use politecrawl_frontier::badurls::BadUrlSnapshot;
use politecrawl_frontier::index::DiscoveryIndex;
use politecrawl_frontier::{snapshot, BAD_URLS_FILE, SIMILARITY_FILE, SUBDOMAINS_FILE};

pub fn run(config: AppConfig) -> Result<()> {
    let index_path = PathBuf::from(format!("{}.redb", config.crawler.save_file));
    if !index_path.exists() {
        println!("No save file at {}", index_path.display());
        return Ok(());
    }

    let index = DiscoveryIndex::open(&index_path, false)?;
    let (total, completed) = index.counts()?;

    let snapshot_dir = PathBuf::from(&config.frontier.snapshot_dir);
    let subdomains: HashMap<String, HashSet<String>> =
        snapshot::load_json(&snapshot_dir, SUBDOMAINS_FILE).unwrap_or_default();
    let bad: BadUrlSnapshot =
        snapshot::load_json(&snapshot_dir, BAD_URLS_FILE).unwrap_or_default();
    let fingerprints: HashMap<u64, String> =
        snapshot::load_json(&snapshot_dir, SIMILARITY_FILE).unwrap_or_default();

    println!("\n╔══════════════════════════════════════════════╗");
    println!("║           politecrawl Status                 ║");
    println!("╠══════════════════════════════════════════════╣");
    println!("║ URLs discovered:    {:>20}    ║", total);
    println!("║ URLs completed:     {:>20}    ║", completed);
    println!("║ URLs open:          {:>20}    ║", total - completed);
    println!("║ Subdomains seen:    {:>20}    ║", subdomains.len());
    println!("║ Low-data URLs:      {:>20}    ║", bad.low_data.len());
    println!("║ Error URLs:         {:>20}    ║", bad.errors.len());
    println!("║ Page fingerprints:  {:>20}    ║", fingerprints.len());
    println!("╚══════════════════════════════════════════════╝\n");

    Ok(())
}
