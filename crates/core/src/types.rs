use async_trait::async_trait;
use std::collections::HashMap;
use url::Url;

use crate::error::CrawlError;

/// Token -> occurrence count over the stopword-filtered page text.
pub type WordCounts = HashMap<String, u64>;

/// Anything that can turn a URL into an HTTP response.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, CrawlError>;
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: Url,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub response_time_ms: u64,
}

impl FetchResponse {
    /// Case-insensitive header lookup; headers are stored lowercased.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|v| v.as_str())
    }

    /// Missing content-type is assumed to be HTML.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(true)
    }

    pub fn is_plain_text(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.contains("text/plain"))
            .unwrap_or(false)
    }
}

/// A dequeued unit of work: one URL and the depth it was discovered at.
#[derive(Debug, Clone)]
pub struct CrawlTask {
    pub url: Url,
    pub depth: u32,
}

/// Why a URL was shelved into the bad-URL registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadKind {
    LowData,
    /// HTTP status >= 400.
    Error(u16),
}

/// 64-bit SimHash content fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    pub const BITS: u32 = 64;

    /// Fraction of matching bits, in [0, 1].
    pub fn similarity(self, other: Fingerprint) -> f64 {
        let differing = (self.0 ^ other.0).count_ones();
        f64::from(Self::BITS - differing) / f64::from(Self::BITS)
    }
}

/// The narrow surface workers see of the frontier. Workers hold an
/// `Arc<dyn FrontierPort>` and never reach into frontier internals.
#[async_trait]
pub trait FrontierPort: Send + Sync + 'static {
    /// Next URL ready under the politeness schedule, or `None` once every
    /// host queue has drained.
    async fn next(&self) -> Result<Option<CrawlTask>, CrawlError>;

    /// Register a discovered URL. Invalid, already-known, trapped and
    /// robots-denied URLs are absorbed silently.
    async fn add(&self, url: &str, depth: u32) -> Result<(), CrawlError>;

    async fn mark_complete(&self, url: &str, depth: u32) -> Result<(), CrawlError>;

    async fn record_bad(&self, url: &Url, kind: BadKind);

    /// True when the URL scores as near-identical to enough already-bad
    /// URLs on the same host to not be worth fetching.
    async fn is_bad_similar(&self, url: &Url) -> bool;

    async fn is_similar_known(&self, fingerprint: Fingerprint) -> bool;

    async fn record_fingerprint(&self, fingerprint: Fingerprint, url: &str);

    async fn add_words(&self, words: &WordCounts);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_similarity_bounds() {
        let a = Fingerprint(u64::MAX);
        assert_eq!(a.similarity(a), 1.0);
        assert_eq!(a.similarity(Fingerprint(0)), 0.0);
    }

    #[test]
    fn fingerprint_similarity_counts_bits() {
        let a = Fingerprint(0);
        let b = Fingerprint(0b111);
        assert_eq!(a.similarity(b), 61.0 / 64.0);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("location".to_string(), "/moved".to_string());
        let resp = FetchResponse {
            url: Url::parse("http://www.ics.uci.edu/old").unwrap(),
            status: 301,
            headers,
            body: Vec::new(),
            content_type: None,
            response_time_ms: 0,
        };
        assert_eq!(resp.header("Location"), Some("/moved"));
    }
}
