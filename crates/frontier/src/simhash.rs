use std::collections::HashMap;

use sha2::{Digest, Sha256};

use politecrawl_core::{Fingerprint, WordCounts};

/// 64-bit SimHash over a token-frequency counter. For every token, each bit
/// of its hash votes the token's weight up or down; the fingerprint bit is
/// set where the tally is non-negative. An empty counter therefore yields
/// the all-ones fingerprint.
pub fn fingerprint(words: &WordCounts) -> Fingerprint {
    let mut weights = [0i64; Fingerprint::BITS as usize];

    for (token, &count) in words {
        let h = token_hash(token);
        for (i, weight) in weights.iter_mut().enumerate() {
            if h & (1u64 << i) != 0 {
                *weight += count as i64;
            } else {
                *weight -= count as i64;
            }
        }
    }

    let mut bits = 0u64;
    for (i, weight) in weights.iter().enumerate() {
        if *weight >= 0 {
            bits |= 1u64 << i;
        }
    }
    Fingerprint(bits)
}

/// Stable token hash: must not vary between process runs, so no randomized
/// hasher. First eight bytes of SHA-256 over the UTF-8 bytes.
fn token_hash(token: &str) -> u64 {
    let digest = Sha256::digest(token.as_bytes());
    u64::from_le_bytes(digest[..8].try_into().unwrap())
}

/// Fingerprint -> first URL that exhibited it. Later near-duplicates are
/// detected against every stored fingerprint.
pub struct SimilarityIndex {
    by_fingerprint: HashMap<u64, String>,
    threshold: f64,
}

impl SimilarityIndex {
    pub fn new(threshold: f64) -> Self {
        Self {
            by_fingerprint: HashMap::new(),
            threshold,
        }
    }

    pub fn from_entries(entries: HashMap<u64, String>, threshold: f64) -> Self {
        Self {
            by_fingerprint: entries,
            threshold,
        }
    }

    /// True when any stored fingerprint matches in more than
    /// `threshold * 64` bits.
    pub fn is_similar(&self, fingerprint: Fingerprint) -> bool {
        self.by_fingerprint
            .keys()
            .any(|&stored| Fingerprint(stored).similarity(fingerprint) > self.threshold)
    }

    /// First writer wins; re-recording an existing fingerprint is a no-op.
    pub fn record(&mut self, fingerprint: Fingerprint, url: &str) {
        self.by_fingerprint
            .entry(fingerprint.0)
            .or_insert_with(|| url.to_string());
    }

    pub fn entries(&self) -> &HashMap<u64, String> {
        &self.by_fingerprint
    }
}
