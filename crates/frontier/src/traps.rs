use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Patterns that generate effectively infinite distinct URLs with
/// near-identical content. The check is disjunctive, so order is irrelevant.
static TRAP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // calendar-style year/month/day path segments
        r"/(19|20)\d{2}/\d{1,2}/\d{1,2}([/?]|$)",
        // session identifiers
        r"(?i)[?&](sessionid|phpsessid|jsessionid|sid)=",
        // state-permuting query keys
        r"(?i)[?&]view=table",
        r"(?i)[?&](action|format|order|sort|filter|limit)=",
        // social-media mirrors living under a path segment
        r"(?i)/(twitter|facebook|instagram|linkedin|youtube|reddit)\.com",
        // large numeric directories
        r"/\d{5,}([/?]|$)",
        // server-script endpoints
        r"(?i)\.(aspx|jsp|cgi)([/?]|$)",
        r"(?i)/cgi-bin/",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const MAX_PATH_LEN: usize = 400;
const MAX_QUERY_PARAMS: usize = 3;

pub fn is_trap(url: &Url) -> bool {
    if url.path().len() > MAX_PATH_LEN {
        return true;
    }
    if url.query_pairs().count() > MAX_QUERY_PARAMS {
        return true;
    }
    let s = url.as_str();
    TRAP_PATTERNS.iter().any(|re| re.is_match(s))
}
