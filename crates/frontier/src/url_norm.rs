use sha2::{Digest, Sha256};
use url::Url;

/// Canonicalize a raw URL string: drop the fragment, strip trailing slashes
/// from the path. The `url` crate already lowercases the host. Returns `None`
/// for anything that does not parse as an absolute URL.
pub fn normalize(raw: &str) -> Option<Url> {
    let mut url = Url::parse(raw.trim()).ok()?;
    url.set_fragment(None);
    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }
    Some(url)
}

/// Identity hash of a canonical URL: SHA-256 over netloc/path/params/query,
/// hex-encoded. The scheme is excluded on purpose so the http and https
/// variants of a resource collapse to one discovery-index entry.
pub fn urlhash(url: &Url) -> String {
    let netloc = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };
    let path = url.path();
    let params = "";
    let query = url.query().unwrap_or("");

    let mut hasher = Sha256::new();
    hasher.update(format!("{netloc}/{path}/{params}/{query}").as_bytes());
    format!("{:x}", hasher.finalize())
}
