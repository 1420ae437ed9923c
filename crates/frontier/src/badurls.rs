use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use url::Url;

use politecrawl_core::BadKind;

/// URLs that produced too little content or an HTTP error. New URLs that
/// look like enough already-shelved ones on the same host are skipped
/// without fetching.
pub struct BadUrlRegistry {
    low_data: HashSet<String>,
    errors: HashSet<String>,
    features_by_host: HashMap<String, Vec<HashMap<String, u32>>>,
    jaccard_threshold: f64,
    min_neighbors: usize,
}

/// Persisted form; the per-host feature buckets are rebuilt on load.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BadUrlSnapshot {
    pub low_data: Vec<String>,
    pub errors: Vec<String>,
}

/// Multiset of path segments plus `key=v1,v2` pairs (values sorted), the
/// shape that calendar and filter traps permute.
pub fn url_features(url: &Url) -> HashMap<String, u32> {
    let mut features = HashMap::new();
    for segment in url.path().split('/').filter(|s| !s.is_empty()) {
        *features.entry(segment.to_string()).or_insert(0) += 1;
    }

    let mut by_key: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in url.query_pairs() {
        by_key.entry(key.into_owned()).or_default().push(value.into_owned());
    }
    for (key, mut values) in by_key {
        values.sort();
        *features
            .entry(format!("{key}={}", values.join(",")))
            .or_insert(0) += 1;
    }

    features
}

/// Multiset Jaccard: sum of per-key min counts over sum of per-key max.
fn jaccard(a: &HashMap<String, u32>, b: &HashMap<String, u32>) -> f64 {
    let mut intersection = 0u64;
    let mut union = 0u64;
    for (key, &count_a) in a {
        let count_b = b.get(key).copied().unwrap_or(0);
        intersection += u64::from(count_a.min(count_b));
        union += u64::from(count_a.max(count_b));
    }
    for (key, &count_b) in b {
        if !a.contains_key(key) {
            union += u64::from(count_b);
        }
    }
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

impl BadUrlRegistry {
    pub fn new(jaccard_threshold: f64, min_neighbors: usize) -> Self {
        Self {
            low_data: HashSet::new(),
            errors: HashSet::new(),
            features_by_host: HashMap::new(),
            jaccard_threshold,
            min_neighbors,
        }
    }

    pub fn record(&mut self, url: &Url, kind: BadKind) {
        let key = url.to_string();
        let inserted = match kind {
            BadKind::LowData => self.low_data.insert(key),
            BadKind::Error(_) => self.errors.insert(key),
        };
        if inserted {
            if let Some(host) = url.host_str() {
                self.features_by_host
                    .entry(host.to_string())
                    .or_default()
                    .push(url_features(url));
            }
        }
    }

    /// True when at least `min_neighbors` bad URLs on the same host score
    /// `jaccard_threshold` or better against this URL.
    pub fn is_similar_to_bad(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let Some(bucket) = self.features_by_host.get(host) else {
            return false;
        };
        if bucket.len() < self.min_neighbors {
            return false;
        }

        let features = url_features(url);
        let mut neighbors = 0;
        for other in bucket {
            if jaccard(&features, other) >= self.jaccard_threshold {
                neighbors += 1;
                if neighbors >= self.min_neighbors {
                    return true;
                }
            }
        }
        false
    }

    /// (low_data, errors) counts.
    pub fn counts(&self) -> (usize, usize) {
        (self.low_data.len(), self.errors.len())
    }

    pub fn to_snapshot(&self) -> BadUrlSnapshot {
        BadUrlSnapshot {
            low_data: self.low_data.iter().cloned().collect(),
            errors: self.errors.iter().cloned().collect(),
        }
    }

    pub fn load(&mut self, snapshot: BadUrlSnapshot) {
        for raw in snapshot.low_data {
            if let Ok(url) = Url::parse(&raw) {
                self.record(&url, BadKind::LowData);
            }
        }
        for raw in snapshot.errors {
            if let Ok(url) = Url::parse(&raw) {
                self.record(&url, BadKind::Error(0));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn features_cover_path_and_query() {
        let features = url_features(&url("http://a.ics.uci.edu/events/list?day=5&day=3&tag=x"));
        assert_eq!(features.get("events"), Some(&1));
        assert_eq!(features.get("list"), Some(&1));
        assert_eq!(features.get("day=3,5"), Some(&1));
        assert_eq!(features.get("tag=x"), Some(&1));
    }

    #[test]
    fn jaccard_of_identical_is_one() {
        let a = url_features(&url("http://a.ics.uci.edu/x/y?q=1"));
        assert_eq!(jaccard(&a, &a), 1.0);
    }

    #[test]
    fn jaccard_of_disjoint_is_zero() {
        let a = url_features(&url("http://a.ics.uci.edu/x"));
        let b = url_features(&url("http://a.ics.uci.edu/y"));
        assert_eq!(jaccard(&a, &b), 0.0);
    }

    #[test]
    fn needs_min_neighbors_to_trigger() {
        // 39 shared path segments, one differing: jaccard = 39/41 > 0.95
        let base: String = (0..39)
            .map(|i| format!("s{i}"))
            .collect::<Vec<_>>()
            .join("/");
        let mut registry = BadUrlRegistry::new(0.95, 5);

        // four near-identical bad URLs: one short of the neighbor floor
        for i in 0..4 {
            registry.record(
                &url(&format!("http://a.ics.uci.edu/{base}/{i}")),
                BadKind::LowData,
            );
        }
        let probe = url(&format!("http://a.ics.uci.edu/{base}/99"));
        assert!(!registry.is_similar_to_bad(&probe));

        registry.record(
            &url(&format!("http://a.ics.uci.edu/{base}/4")),
            BadKind::LowData,
        );
        assert!(registry.is_similar_to_bad(&probe));
    }

    #[test]
    fn other_hosts_do_not_count() {
        let mut registry = BadUrlRegistry::new(0.5, 1);
        registry.record(&url("http://a.ics.uci.edu/x/y/z"), BadKind::Error(404));
        assert!(!registry.is_similar_to_bad(&url("http://b.ics.uci.edu/x/y/z")));
    }

    #[test]
    fn duplicate_records_are_ignored() {
        let mut registry = BadUrlRegistry::new(0.95, 5);
        for _ in 0..10 {
            registry.record(&url("http://a.ics.uci.edu/x/y/z"), BadKind::LowData);
        }
        let (low_data, _) = registry.counts();
        assert_eq!(low_data, 1);
        // one distinct bad URL cannot supply five neighbors
        assert!(!registry.is_similar_to_bad(&url("http://a.ics.uci.edu/x/y/z")));
    }

    #[test]
    fn snapshot_roundtrip_rebuilds_buckets() {
        let mut registry = BadUrlRegistry::new(0.5, 1);
        registry.record(&url("http://a.ics.uci.edu/x/y"), BadKind::LowData);
        registry.record(&url("http://a.ics.uci.edu/err"), BadKind::Error(500));

        let snapshot = registry.to_snapshot();
        let mut restored = BadUrlRegistry::new(0.5, 1);
        restored.load(snapshot);

        assert_eq!(restored.counts(), (1, 1));
        assert!(restored.is_similar_to_bad(&url("http://a.ics.uci.edu/x/y")));
    }
}
