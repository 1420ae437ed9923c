use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use politecrawl_core::CrawlError;

/// Non-HTML file extensions that are never worth fetching.
static DISALLOWED_EXTENSIONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\.(css|js|bmp|gif|jpe?g|ico|png|tiff?|mid|mp2|mp3|mp4",
        r"|wav|avi|mov|mpeg|ram|m4v|mkv|ogg|ogv|pdf",
        r"|ps|eps|tex|ppt|pptx|doc|docx|xls|xlsx|names",
        r"|data|dat|exe|bz2|tar|msi|bin|7z|psd|dmg|iso",
        r"|epub|dll|cnf|tgz|sha1",
        r"|thmx|mso|arff|rtf|jar|csv",
        r"|rm|smil|wmv|swf|wma|zip|rar|gz)$",
    ))
    .unwrap()
});

/// Decides whether a URL is inside the crawl's allowed domain family and not
/// an obviously non-HTML resource.
pub struct ValidityFilter {
    domains: Vec<Regex>,
}

impl ValidityFilter {
    pub fn new(patterns: &[String]) -> Result<Self, CrawlError> {
        let domains = patterns
            .iter()
            .map(|p| {
                Regex::new(&format!("^(?:{p})$"))
                    .map_err(|e| CrawlError::Config(format!("allowed_domains pattern {p:?}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { domains })
    }

    pub fn is_valid(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        if !self.domains.iter().any(|re| re.is_match(host)) {
            return false;
        }
        !DISALLOWED_EXTENSIONS.is_match(url.path())
    }
}
