//! Result cache
//!
//! In-process TTL cache from the exact URL string to its computed verdict.
//! Keys are not normalized: case or whitespace variants of a URL are distinct
//! entries. Expired entries are dropped lazily on lookup. Caching is an
//! optimization only; nothing in the serving path depends on a `put` being
//! observable afterwards.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::classifier::Verdict;

struct Entry {
    verdict: Verdict,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct ResultCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Look up a URL; an expired entry is removed and reported as a miss
    pub fn get(&self, url: &str) -> Option<Verdict> {
        {
            let entries = self.entries.read();
            match entries.get(url) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.verdict.clone());
                }
                Some(_) => {} // expired, evict below
                None => return None,
            }
        }

        self.entries.write().remove(url);
        None
    }

    /// Store a verdict for the fixed TTL, replacing any previous entry
    pub fn put(&self, url: &str, verdict: Verdict) {
        let expires_at = Instant::now() + self.ttl;
        self.entries
            .write()
            .insert(url.to_string(), Entry { verdict, expires_at });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(prob: f64) -> Verdict {
        Verdict {
            malicious_prob: prob,
            malicious: prob >= 0.5,
            model_version: "test-model".to_string(),
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let cache = ResultCache::new(Duration::from_secs(60));
        cache.put("http://example.com", verdict(0.9));

        let hit = cache.get("http://example.com").expect("expected a hit");
        assert_eq!(hit.malicious_prob, 0.9);
        assert!(hit.malicious);
        assert_eq!(hit.model_version, "test-model");
    }

    #[test]
    fn keys_are_exact_strings() {
        let cache = ResultCache::new(Duration::from_secs(60));
        cache.put("http://example.com", verdict(0.9));

        assert!(cache.get("http://EXAMPLE.com").is_none());
        assert!(cache.get("http://example.com ").is_none());
    }

    #[test]
    fn expired_entries_miss_and_are_evicted() {
        let cache = ResultCache::new(Duration::from_millis(10));
        cache.put("http://example.com", verdict(0.2));

        std::thread::sleep(Duration::from_millis(25));
        assert!(cache.get("http://example.com").is_none());
        assert!(cache.entries.read().is_empty());
    }

    #[test]
    fn put_replaces_previous_entry() {
        let cache = ResultCache::new(Duration::from_secs(60));
        cache.put("http://example.com", verdict(0.2));
        cache.put("http://example.com", verdict(0.8));

        let hit = cache.get("http://example.com").unwrap();
        assert_eq!(hit.malicious_prob, 0.8);
    }
}
