pub mod badurls;
pub mod index;
pub mod robots;
pub mod scheduler;
pub mod simhash;
pub mod snapshot;
pub mod traps;
pub mod url_norm;
pub mod validity;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use url::Url;

use politecrawl_core::{
    AppConfig, BadKind, CrawlError, CrawlTask, Fetcher, Fingerprint, FrontierPort, WordCounts,
};
use politecrawl_parser::sitemap::{parse_sitemap, SitemapEntry};

use badurls::BadUrlRegistry;
use index::{DiscoveryIndex, UrlRecord};
use robots::RobotsPolicy;
use scheduler::{HostQueues, NextOutcome};
use simhash::SimilarityIndex;
use validity::ValidityFilter;

pub const SUBDOMAINS_FILE: &str = "subdomains.json";
pub const LAST_REQUEST_FILE: &str = "last_request.json";
pub const BAD_URLS_FILE: &str = "bad_urls.json";
pub const SIMILARITY_FILE: &str = "similarity.json";
pub const WORD_COUNT_FILE: &str = "word_count.json";

/// How long a concurrent `add` waits before re-checking whether another task
/// has finished first-contact initialization of the same host.
const HOST_INIT_POLL: Duration = Duration::from_millis(25);

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// State behind the scheduler lock: host queues, the discovery index and
/// the auxiliary maps that ride along with it.
struct SchedState {
    queues: HostQueues,
    index: DiscoveryIndex,
    subdomains: HashMap<String, HashSet<String>>,
    bad_urls: BadUrlRegistry,
    word_count: WordCounts,
    known_hosts: HashSet<String>,
    initializing_hosts: HashSet<String>,
    last_backup_ms: i64,
}

/// State behind the robots lock.
#[derive(Default)]
struct RobotsState {
    policies: HashMap<String, RobotsPolicy>,
    ingested_sitemaps: HashMap<String, HashSet<String>>,
}

/// The set of URLs known to the crawler: per-host FIFOs, the persistent
/// discovery index, robots policies, and the duplicate detectors. Shared
/// state is split over three locks acquired only in the order
/// {sched, robots, sim}.
pub struct Frontier {
    sched: Mutex<SchedState>,
    robots: Mutex<RobotsState>,
    sim: Mutex<SimilarityIndex>,
    fetcher: Arc<dyn Fetcher>,
    validity: ValidityFilter,
    user_agent: String,
    politeness_ms: i64,
    backup_interval_ms: i64,
    snapshot_dir: PathBuf,
}

impl Frontier {
    /// Open (or wipe, on restart) the persistent state and seed the host
    /// queues: from `seed_urls` on restart, from the open records of the
    /// save file otherwise.
    pub async fn open(
        config: &AppConfig,
        restart: bool,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, CrawlError> {
        let validity = ValidityFilter::new(&config.frontier.allowed_domains)?;
        let index_path = PathBuf::from(format!("{}.redb", config.crawler.save_file));
        let snapshot_dir = PathBuf::from(&config.frontier.snapshot_dir);

        if restart {
            if index_path.exists() {
                info!(path = %index_path.display(), "found save file, deleting it");
            }
            if snapshot_dir.exists() {
                let _ = std::fs::remove_dir_all(&snapshot_dir);
            }
        } else if !index_path.exists() {
            info!(path = %index_path.display(), "did not find save file, starting from seeds");
        }

        let index = DiscoveryIndex::open(&index_path, restart)?;

        let mut queues = HostQueues::default();
        let mut subdomains: HashMap<String, HashSet<String>> = HashMap::new();
        let mut bad_urls = BadUrlRegistry::new(
            config.limits.bad_jaccard_threshold,
            config.limits.bad_min_neighbors,
        );
        let mut word_count = WordCounts::new();
        let mut similarity = SimilarityIndex::new(config.limits.similarity_threshold);

        if !restart {
            if let Some(last_request) = snapshot::load_json(&snapshot_dir, LAST_REQUEST_FILE) {
                queues.load_last_request(last_request);
            }
            if let Some(loaded) = snapshot::load_json(&snapshot_dir, SUBDOMAINS_FILE) {
                subdomains = loaded;
            }
            if let Some(loaded) = snapshot::load_json(&snapshot_dir, BAD_URLS_FILE) {
                bad_urls.load(loaded);
            }
            if let Some(loaded) = snapshot::load_json(&snapshot_dir, WORD_COUNT_FILE) {
                word_count = loaded;
            }
            if let Some(entries) = snapshot::load_json(&snapshot_dir, SIMILARITY_FILE) {
                similarity =
                    SimilarityIndex::from_entries(entries, config.limits.similarity_threshold);
            }
        }

        let frontier = Self {
            sched: Mutex::new(SchedState {
                queues,
                index,
                subdomains,
                bad_urls,
                word_count,
                known_hosts: HashSet::new(),
                initializing_hosts: HashSet::new(),
                last_backup_ms: now_ms(),
            }),
            robots: Mutex::new(RobotsState::default()),
            sim: Mutex::new(similarity),
            fetcher,
            validity,
            user_agent: config.crawler.user_agent.clone(),
            politeness_ms: (config.crawler.politeness_delay * 1000.0).round() as i64,
            backup_interval_ms: (config.frontier.backup_interval_seconds * 1000) as i64,
            snapshot_dir,
        };

        let resumed = if restart {
            0
        } else {
            frontier.resume_from_index().await?
        };
        if restart || resumed == 0 {
            for seed in &config.crawler.seed_urls {
                frontier.add_url(seed, 0).await?;
            }
        }

        Ok(frontier)
    }

    /// Requeue every open record of the save file, filtered through the
    /// validity rules. Returns how many URLs were requeued; the caller
    /// falls back to the seeds when the save file held nothing at all.
    async fn resume_from_index(&self) -> Result<usize, CrawlError> {
        let mut s = self.sched.lock().await;
        let total = s.index.len()?;
        if total == 0 {
            return Ok(0);
        }

        let mut requeued = 0usize;
        for record in s.index.iter_open()? {
            let Some(url) = url_norm::normalize(&record.url) else {
                continue;
            };
            if !self.validity.is_valid(&url) {
                continue;
            }
            if let Some(host) = url.host_str() {
                s.queues.push(host, record.url.clone(), record.depth);
                requeued += 1;
            }
        }
        info!(
            to_download = requeued,
            total, "resumed frontier from save file"
        );
        // the save file was non-empty, so never fall back to seeds
        Ok(requeued.max(1))
    }

    async fn add_url(&self, raw: &str, depth: u32) -> Result<(), CrawlError> {
        let Some(url) = url_norm::normalize(raw) else {
            return Ok(());
        };
        if !self.validity.is_valid(&url) {
            return Ok(());
        }
        let Some(host) = url.host_str().map(str::to_string) else {
            return Ok(());
        };
        let hash = url_norm::urlhash(&url);

        {
            let s = self.sched.lock().await;
            if s.index.has(&hash)? {
                return Ok(());
            }
        }

        // first contact with a host fetches its robots policy
        let new_host_sitemaps = self.init_host(&url, &host).await;

        {
            let mut s = self.sched.lock().await;
            if !s.index.has(&hash)? {
                s.subdomains
                    .entry(host.clone())
                    .or_default()
                    .insert(url.to_string());

                if traps::is_trap(&url) {
                    debug!(url = %url, "rejected by trap heuristics");
                } else if !self.robots_allows(&host, url.path()).await {
                    debug!(url = %url, "denied by robots policy");
                } else {
                    s.index.put(
                        &hash,
                        &UrlRecord {
                            url: url.to_string(),
                            depth,
                            completed: false,
                        },
                    )?;
                    s.queues.push(&host, url.to_string(), depth);
                }
            }
        }

        if let Some(sitemaps) = new_host_sitemaps {
            let pages = self.ingest_sitemaps(&host, sitemaps).await;
            if !pages.is_empty() {
                info!(host = %host, count = pages.len(), "sitemap URLs discovered");
            }
            for page in pages {
                Box::pin(self.add_url(&page, 1)).await?;
            }
        }

        Ok(())
    }

    async fn robots_allows(&self, host: &str, path: &str) -> bool {
        let r = self.robots.lock().await;
        r.policies
            .get(host)
            .map(|policy| policy.can_fetch(path))
            .unwrap_or(true)
    }

    /// First-contact initialization: fetch and cache the robots policy,
    /// exactly once per host per process. No lock is held across the
    /// network fetch; concurrent adders for the same host wait until the
    /// initializer commits. Returns the host's sitemap URLs when this call
    /// did the initialization.
    async fn init_host(&self, url: &Url, host: &str) -> Option<Vec<String>> {
        loop {
            {
                let mut s = self.sched.lock().await;
                if s.known_hosts.contains(host) {
                    return None;
                }
                if !s.initializing_hosts.contains(host) {
                    s.initializing_hosts.insert(host.to_string());
                    break;
                }
            }
            tokio::time::sleep(HOST_INIT_POLL).await;
        }

        let policy = match robots::fetch_policy(
            self.fetcher.as_ref(),
            url.scheme(),
            host,
            &self.user_agent,
        )
        .await
        {
            Ok(policy) => policy,
            Err(e) => {
                warn!(host, error = %e, "robots fetch failed");
                RobotsPolicy::empty()
            }
        };
        let sitemaps = policy.sitemaps().to_vec();
        info!(
            host,
            denied = policy.deny_count(),
            sitemaps = sitemaps.len(),
            "robots policy loaded"
        );

        {
            let mut r = self.robots.lock().await;
            r.policies.insert(host.to_string(), policy);
        }
        {
            let mut s = self.sched.lock().await;
            s.initializing_hosts.remove(host);
            s.known_hosts.insert(host.to_string());
        }

        Some(sitemaps)
    }

    /// Walk sitemap and sitemap-index documents, each visited at most once
    /// per host, and collect the page URLs they list.
    async fn ingest_sitemaps(&self, host: &str, seeds: Vec<String>) -> Vec<String> {
        let mut stack = seeds;
        let mut pages = Vec::new();

        while let Some(sitemap_url) = stack.pop() {
            {
                let mut r = self.robots.lock().await;
                let visited = r.ingested_sitemaps.entry(host.to_string()).or_default();
                if !visited.insert(sitemap_url.clone()) {
                    continue;
                }
            }

            let Ok(url) = Url::parse(&sitemap_url) else {
                continue;
            };
            let resp = match self.fetcher.fetch(&url).await {
                Ok(resp) if resp.status == 200 => resp,
                Ok(resp) => {
                    debug!(url = %url, status = resp.status, "sitemap fetch returned non-200");
                    continue;
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "sitemap fetch failed");
                    continue;
                }
            };

            let body = String::from_utf8_lossy(&resp.body);
            for entry in parse_sitemap(&body) {
                match entry {
                    SitemapEntry::Sitemap(loc) => stack.push(loc),
                    SitemapEntry::Page(loc) => pages.push(loc),
                }
            }
        }

        pages
    }

    async fn next_task(&self) -> Result<Option<CrawlTask>, CrawlError> {
        loop {
            self.maybe_snapshot().await;

            let outcome = {
                let mut s = self.sched.lock().await;
                s.queues.next_ready(self.politeness_ms, now_ms())
            };

            match outcome {
                NextOutcome::Ready((url, depth)) => match Url::parse(&url) {
                    Ok(url) => return Ok(Some(CrawlTask { url, depth })),
                    Err(_) => continue,
                },
                NextOutcome::Drained => return Ok(None),
                NextOutcome::Waiting => {
                    tokio::time::sleep(Duration::from_millis(self.politeness_ms.max(1) as u64))
                        .await
                }
            }
        }
    }

    async fn mark_complete_inner(&self, raw: &str, depth: u32) -> Result<(), CrawlError> {
        let Some(url) = url_norm::normalize(raw) else {
            error!(url = raw, "completed an unparseable URL");
            return Ok(());
        };
        let hash = url_norm::urlhash(&url);

        let s = self.sched.lock().await;
        if !s.index.set_completed(&hash, url.as_str(), depth)? {
            error!(url = %url, "completed URL was never discovered");
        }
        Ok(())
    }

    async fn maybe_snapshot(&self) {
        let due = {
            let mut s = self.sched.lock().await;
            let now = now_ms();
            if now - s.last_backup_ms < self.backup_interval_ms {
                false
            } else {
                s.last_backup_ms = now;
                true
            }
        };
        if due {
            self.write_snapshot().await;
        }
    }

    /// Snapshot the auxiliary maps. Best-effort: failures are logged, never
    /// fatal, and each file is atomically replaced.
    pub async fn write_snapshot(&self) {
        let (subdomains, last_request, bad, words) = {
            let s = self.sched.lock().await;
            (
                s.subdomains.clone(),
                s.queues.last_request_snapshot(),
                s.bad_urls.to_snapshot(),
                s.word_count.clone(),
            )
        };
        let fingerprints = {
            let sim = self.sim.lock().await;
            sim.entries().clone()
        };

        if let Err(e) = snapshot::save_json(&self.snapshot_dir, SUBDOMAINS_FILE, &subdomains) {
            warn!(error = %e, file = SUBDOMAINS_FILE, "snapshot write failed");
        }
        if let Err(e) = snapshot::save_json(&self.snapshot_dir, LAST_REQUEST_FILE, &last_request) {
            warn!(error = %e, file = LAST_REQUEST_FILE, "snapshot write failed");
        }
        if let Err(e) = snapshot::save_json(&self.snapshot_dir, BAD_URLS_FILE, &bad) {
            warn!(error = %e, file = BAD_URLS_FILE, "snapshot write failed");
        }
        if let Err(e) = snapshot::save_json(&self.snapshot_dir, SIMILARITY_FILE, &fingerprints) {
            warn!(error = %e, file = SIMILARITY_FILE, "snapshot write failed");
        }
        if let Err(e) = snapshot::save_json(&self.snapshot_dir, WORD_COUNT_FILE, &words) {
            warn!(error = %e, file = WORD_COUNT_FILE, "snapshot write failed");
        }
    }

    /// How many URLs are currently queued across all hosts.
    pub async fn queued(&self) -> usize {
        self.sched.lock().await.queues.total_len()
    }

    /// (total, completed) counts from the discovery index.
    pub async fn counts(&self) -> Result<(u64, u64), CrawlError> {
        self.sched.lock().await.index.counts()
    }
}

#[async_trait]
impl FrontierPort for Frontier {
    async fn next(&self) -> Result<Option<CrawlTask>, CrawlError> {
        self.next_task().await
    }

    async fn add(&self, url: &str, depth: u32) -> Result<(), CrawlError> {
        self.add_url(url, depth).await
    }

    async fn mark_complete(&self, url: &str, depth: u32) -> Result<(), CrawlError> {
        self.mark_complete_inner(url, depth).await
    }

    async fn record_bad(&self, url: &Url, kind: BadKind) {
        let mut s = self.sched.lock().await;
        s.bad_urls.record(url, kind);
    }

    async fn is_bad_similar(&self, url: &Url) -> bool {
        let s = self.sched.lock().await;
        s.bad_urls.is_similar_to_bad(url)
    }

    async fn is_similar_known(&self, fingerprint: Fingerprint) -> bool {
        let sim = self.sim.lock().await;
        sim.is_similar(fingerprint)
    }

    async fn record_fingerprint(&self, fingerprint: Fingerprint, url: &str) {
        let mut sim = self.sim.lock().await;
        sim.record(fingerprint, url);
    }

    async fn add_words(&self, words: &WordCounts) {
        let mut s = self.sched.lock().await;
        for (word, count) in words {
            *s.word_count.entry(word.clone()).or_insert(0) += count;
        }
    }
}
