use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use politecrawl_core::{AppConfig, BadKind, CrawlError, Fetcher, FrontierPort, LimitsConfig};
use politecrawl_fetch::HttpFetcher;
use politecrawl_frontier::{simhash, traps, Frontier};

pub async fn run_crawl(config: AppConfig, restart: bool) -> Result<()> {
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&config)?);
    crawl_with_fetcher(config, restart, fetcher).await
}

/// Construct the frontier, run `threads_count` workers until it drains,
/// then force a final snapshot. Split from [`run_crawl`] so tests can
/// substitute the fetcher.
pub async fn crawl_with_fetcher(
    config: AppConfig,
    restart: bool,
    fetcher: Arc<dyn Fetcher>,
) -> Result<()> {
    let frontier = Arc::new(Frontier::open(&config, restart, Arc::clone(&fetcher)).await?);

    let queued = frontier.queued().await;
    info!(
        workers = config.crawler.threads_count,
        queued, "spawning crawl workers"
    );
    let mut handles = Vec::new();
    for worker_id in 0..config.crawler.threads_count {
        let port: Arc<dyn FrontierPort> = frontier.clone();
        let fetcher = Arc::clone(&fetcher);
        let limits = config.limits.clone();
        handles.push(tokio::spawn(async move {
            worker_loop(worker_id, port, fetcher, limits).await
        }));
    }

    let mut failure = None;
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(error = %e, "worker aborted");
                failure.get_or_insert(e);
            }
            Err(e) => error!(error = %e, "worker panicked"),
        }
    }

    frontier.write_snapshot().await;
    let (total, completed) = frontier.counts().await?;
    info!(total, completed, "crawl finished");

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// One worker: dequeue, fetch, extract, enqueue outlinks, mark complete.
/// Every per-URL failure is absorbed here; only discovery-index I/O errors
/// escape, because the crawl cannot keep its books without the index.
async fn worker_loop(
    worker_id: usize,
    port: Arc<dyn FrontierPort>,
    fetcher: Arc<dyn Fetcher>,
    limits: LimitsConfig,
) -> Result<(), CrawlError> {
    loop {
        let Some(task) = port.next().await? else {
            info!(worker_id, "frontier is empty, stopping");
            return Ok(());
        };
        let url = task.url;
        let depth = task.depth;

        if depth > limits.max_depth {
            debug!(worker_id, url = %url, depth, "past depth limit");
            port.mark_complete(url.as_str(), depth).await?;
            continue;
        }

        if port.is_bad_similar(&url).await {
            debug!(worker_id, url = %url, "resembles known bad URLs, skipping fetch");
            port.record_bad(&url, BadKind::LowData).await;
            port.mark_complete(url.as_str(), depth).await?;
            continue;
        }

        if traps::is_trap(&url) {
            port.mark_complete(url.as_str(), depth).await?;
            continue;
        }

        let resp = match fetcher.fetch(&url).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(worker_id, url = %url, error = %e, "fetch failed");
                port.mark_complete(url.as_str(), depth).await?;
                continue;
            }
        };
        info!(worker_id, url = %url, status = resp.status, depth, "downloaded");

        if (300..400).contains(&resp.status) {
            match resp.header("location") {
                Some(location) => {
                    if let Ok(target) = url.join(location) {
                        port.add(target.as_str(), depth).await?;
                    }
                }
                None => warn!(worker_id, url = %url, status = resp.status, "redirect without location"),
            }
            port.mark_complete(url.as_str(), depth).await?;
            continue;
        }

        if resp.status != 200 {
            port.record_bad(&url, BadKind::Error(resp.status)).await;
            port.mark_complete(url.as_str(), depth).await?;
            continue;
        }

        if resp.body.is_empty() || !resp.is_html() {
            port.mark_complete(url.as_str(), depth).await?;
            continue;
        }

        let page = match politecrawl_parser::extract(&url, &resp.body) {
            Ok(page) => page,
            Err(e) => {
                warn!(worker_id, url = %url, error = %e, "extract failed");
                port.mark_complete(url.as_str(), depth).await?;
                continue;
            }
        };

        if page.word_total < limits.min_words {
            debug!(worker_id, url = %url, words = page.word_total, "too little text");
            port.record_bad(&url, BadKind::LowData).await;
            port.mark_complete(url.as_str(), depth).await?;
            continue;
        }

        let fingerprint = simhash::fingerprint(&page.words);
        if port.is_similar_known(fingerprint).await {
            debug!(worker_id, url = %url, "near-duplicate content, dropping outlinks");
            port.mark_complete(url.as_str(), depth).await?;
            continue;
        }
        port.record_fingerprint(fingerprint, url.as_str()).await;
        port.add_words(&page.words).await;

        for outlink in &page.outlinks {
            port.add(outlink, depth + 1).await?;
        }
        port.mark_complete(url.as_str(), depth).await?;
    }
}
