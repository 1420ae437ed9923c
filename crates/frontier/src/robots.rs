use tracing::{debug, warn};
use url::Url;

use politecrawl_core::{CrawlError, Fetcher};

/// Parsed robots.txt rules for one host, restricted to the sections that
/// apply to our user agent (exact match or `*`). Sitemap directives are
/// global and collected regardless of section.
#[derive(Debug, Clone, Default)]
pub struct RobotsPolicy {
    allowed: Vec<String>,
    disallowed: Vec<String>,
    sitemaps: Vec<String>,
}

impl RobotsPolicy {
    /// The all-allowing policy used when robots.txt is missing or unreadable.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn parse(user_agent: &str, content: &str) -> Self {
        let mut policy = Self::default();
        let mut current_agent: Option<String> = None;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => current_agent = Some(value.to_string()),
                "sitemap" => {
                    if !value.is_empty() {
                        policy.sitemaps.push(value.to_string());
                    }
                }
                "allow" | "disallow" => {
                    let in_section = matches!(
                        current_agent.as_deref(),
                        Some(agent) if agent == user_agent || agent == "*"
                    );
                    if in_section && !value.is_empty() {
                        if directive == "allow" {
                            policy.allowed.push(value.to_string());
                        } else {
                            policy.disallowed.push(value.to_string());
                        }
                    }
                }
                _ => {}
            }
        }

        policy
    }

    /// Prefix-based decision: a matching Disallow prefix denies unless some
    /// Allow prefix also matches.
    pub fn can_fetch(&self, path: &str) -> bool {
        for disallowed in &self.disallowed {
            if path.starts_with(disallowed.as_str()) {
                return self.allowed.iter().any(|a| path.starts_with(a.as_str()));
            }
        }
        true
    }

    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    pub fn deny_count(&self) -> usize {
        self.disallowed.len()
    }
}

/// Fetch and parse `{scheme}://{host}/robots.txt`. Anything other than a
/// 200 text/plain response collapses to the empty (all-allow) policy.
pub async fn fetch_policy(
    fetcher: &dyn Fetcher,
    scheme: &str,
    host: &str,
    user_agent: &str,
) -> Result<RobotsPolicy, CrawlError> {
    let raw = format!("{scheme}://{host}/robots.txt");
    let Ok(url) = Url::parse(&raw) else {
        return Err(CrawlError::InvalidUrl(raw));
    };

    match fetcher.fetch(&url).await {
        Ok(resp) if resp.status == 200 && resp.is_plain_text() => {
            let body = String::from_utf8_lossy(&resp.body);
            Ok(RobotsPolicy::parse(user_agent, &body))
        }
        Ok(resp) => {
            debug!(host, status = resp.status, "robots.txt unavailable, allowing all");
            Ok(RobotsPolicy::empty())
        }
        Err(e) => {
            warn!(host, error = %e, "robots.txt fetch failed, allowing all");
            Ok(RobotsPolicy::empty())
        }
    }
}
