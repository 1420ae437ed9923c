pub mod html;
pub mod sitemap;
pub mod stopwords;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use politecrawl_core::{CrawlError, WordCounts};

/// Max bytes to parse (5 MB). Larger pages are truncated before parsing.
const MAX_PARSE_SIZE: usize = 5 * 1024 * 1024;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

/// Everything the worker needs from one HTML page.
pub struct PageExtract {
    pub outlinks: Vec<String>,
    pub text: String,
    pub words: WordCounts,
    /// Total token count after stopword filtering.
    pub word_total: u64,
}

pub fn extract(url: &Url, body: &[u8]) -> Result<PageExtract, CrawlError> {
    let body = if body.len() > MAX_PARSE_SIZE {
        &body[..MAX_PARSE_SIZE]
    } else {
        body
    };
    let body_str = String::from_utf8_lossy(body);

    let html_result = html::parse_html(&body_str, url);
    let (words, word_total) = count_words(&html_result.body_text);

    Ok(PageExtract {
        outlinks: html_result.outlinks,
        text: html_result.body_text,
        words,
        word_total,
    })
}

/// Lowercased `\w+` tokens minus stopwords, counted.
pub fn count_words(text: &str) -> (WordCounts, u64) {
    let mut words = WordCounts::new();
    let mut total = 0u64;
    let lowered = text.to_lowercase();
    for token in WORD_RE.find_iter(&lowered) {
        let token = token.as_str();
        if stopwords::is_stopword(token) {
            continue;
        }
        *words.entry(token.to_string()).or_insert(0) += 1;
        total += 1;
    }
    (words, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_words_filters_stopwords() {
        let (words, total) = count_words("The crawler visits the frontier and the crawler waits");
        assert_eq!(words.get("crawler"), Some(&2));
        assert_eq!(words.get("frontier"), Some(&1));
        assert!(!words.contains_key("the"));
        assert!(!words.contains_key("and"));
        assert_eq!(total, 5);
    }

    #[test]
    fn count_words_is_case_insensitive() {
        let (words, _) = count_words("Crawler CRAWLER crawler");
        assert_eq!(words.get("crawler"), Some(&3));
    }

    #[test]
    fn extract_returns_links_and_counter() {
        let url = Url::parse("http://www.ics.uci.edu/").unwrap();
        let body = br#"<html><body>
            <p>Informatics research happens here, research every day.</p>
            <a href="/research">research</a>
        </body></html>"#;

        let page = extract(&url, body).unwrap();
        assert_eq!(page.outlinks, vec!["http://www.ics.uci.edu/research"]);
        assert_eq!(page.words.get("research"), Some(&3));
        assert!(page.word_total >= 5);
    }
}
