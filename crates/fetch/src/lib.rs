use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use politecrawl_core::{AppConfig, CrawlError, FetchResponse, Fetcher};

/// Plain HTTP fetcher. Redirects are never followed here: the worker decides
/// what to do with a 3xx, so the redirect target goes through the same
/// filters as any other discovered URL.
pub struct HttpFetcher {
    client: reqwest::Client,
    max_body_size: usize,
}

impl HttpFetcher {
    pub fn new(config: &AppConfig) -> Result<Self, CrawlError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.crawler.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(config.limits.connect_timeout_seconds))
            .timeout(Duration::from_secs(config.limits.request_timeout_seconds));

        if let Some(cache) = &config.cache_server {
            let proxy_url = format!("http://{}:{}", cache.host, cache.port);
            let proxy = reqwest::Proxy::http(&proxy_url)
                .map_err(|e| CrawlError::Network(format!("cache server {proxy_url}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| CrawlError::Network(e.to_string()))?;

        Ok(Self {
            client,
            max_body_size: config.limits.max_body_size_mb * 1024 * 1024,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, CrawlError> {
        let start = Instant::now();
        debug!(url = %url, "fetching");

        let resp = self.client.get(url.as_str()).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "fetch failed");
            CrawlError::Network(e.to_string())
        })?;

        let status = resp.status().as_u16();

        let mut headers = HashMap::new();
        for (k, v) in resp.headers() {
            if let Ok(val) = v.to_str() {
                headers.insert(k.as_str().to_ascii_lowercase(), val.to_string());
            }
        }
        let content_type = headers.get("content-type").cloned();

        let body = resp
            .bytes()
            .await
            .map_err(|e| CrawlError::Network(e.to_string()))?;

        if body.len() > self.max_body_size {
            return Err(CrawlError::BodyTooLarge {
                size: body.len(),
                max: self.max_body_size,
            });
        }

        Ok(FetchResponse {
            url: url.clone(),
            status,
            headers,
            body: body.to_vec(),
            content_type,
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
