pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, CacheServerConfig, CrawlerConfig, FrontierConfig, LimitsConfig};
pub use error::CrawlError;
pub use types::*;
