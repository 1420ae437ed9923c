use serde::Deserialize;

use crate::error::CrawlError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub cache_server: Option<CacheServerConfig>,
    #[serde(default)]
    pub limits: LimitsConfig,
    pub frontier: FrontierConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrawlerConfig {
    pub user_agent: String,
    pub threads_count: usize,
    pub save_file: String,
    pub seed_urls: Vec<String>,
    /// Minimum gap between two requests to the same host, in seconds.
    pub politeness_delay: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default = "default_min_words")]
    pub min_words: u64,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_bad_jaccard_threshold")]
    pub bad_jaccard_threshold: f64,
    #[serde(default = "default_bad_min_neighbors")]
    pub bad_min_neighbors: usize,
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            min_words: default_min_words(),
            similarity_threshold: default_similarity_threshold(),
            bad_jaccard_threshold: default_bad_jaccard_threshold(),
            bad_min_neighbors: default_bad_min_neighbors(),
            max_body_size_mb: default_max_body_size_mb(),
            connect_timeout_seconds: default_connect_timeout(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FrontierConfig {
    pub allowed_domains: Vec<String>,
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: String,
    #[serde(default = "default_backup_interval")]
    pub backup_interval_seconds: u64,
}

fn default_max_depth() -> u32 { 28 }
fn default_min_words() -> u64 { 30 }
fn default_similarity_threshold() -> f64 { 0.95 }
fn default_bad_jaccard_threshold() -> f64 { 0.95 }
fn default_bad_min_neighbors() -> usize { 5 }
fn default_max_body_size_mb() -> usize { 10 }
fn default_connect_timeout() -> u64 { 10 }
fn default_request_timeout() -> u64 { 30 }
fn default_snapshot_dir() -> String { "snapshots".to_string() }
fn default_backup_interval() -> u64 { 60 }

impl AppConfig {
    /// Reject configs the crawler cannot run with. The user agent charset
    /// matters: it is sent on the wire and matched against robots sections.
    pub fn validate(&self) -> Result<(), CrawlError> {
        let ua_ok = !self.crawler.user_agent.is_empty()
            && self
                .crawler
                .user_agent
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ' || c == ',');
        if !ua_ok {
            return Err(CrawlError::Config(format!(
                "user_agent {:?} may only contain [A-Za-z0-9_ ,]",
                self.crawler.user_agent
            )));
        }
        if self.crawler.threads_count == 0 {
            return Err(CrawlError::Config("threads_count must be positive".into()));
        }
        if self.crawler.seed_urls.is_empty() {
            return Err(CrawlError::Config("seed_urls must not be empty".into()));
        }
        if self.crawler.politeness_delay < 0.0 {
            return Err(CrawlError::Config(
                "politeness_delay must be non-negative".into(),
            ));
        }
        if self.frontier.allowed_domains.is_empty() {
            return Err(CrawlError::Config(
                "allowed_domains must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            crawler: CrawlerConfig {
                user_agent: "IR UW23 12345678".to_string(),
                threads_count: 4,
                save_file: "frontier".to_string(),
                seed_urls: vec!["https://www.ics.uci.edu".to_string()],
                politeness_delay: 0.5,
            },
            cache_server: None,
            limits: LimitsConfig::default(),
            frontier: FrontierConfig {
                allowed_domains: vec![r".*\.ics\.uci\.edu".to_string()],
                snapshot_dir: "snapshots".to_string(),
                backup_interval_seconds: 60,
            },
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn user_agent_charset_is_enforced() {
        let mut config = base_config();
        config.crawler.user_agent = "bad/agent".to_string();
        assert!(config.validate().is_err());

        config.crawler.user_agent = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_threads_rejected() {
        let mut config = base_config();
        config.crawler.threads_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn limits_defaults_match_tuning() {
        let limits = LimitsConfig::default();
        assert_eq!(limits.max_depth, 28);
        assert_eq!(limits.min_words, 30);
        assert_eq!(limits.similarity_threshold, 0.95);
        assert_eq!(limits.bad_min_neighbors, 5);
    }
}
