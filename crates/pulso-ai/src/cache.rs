//! Private response cache keyed by SHA-256 of comment text.
//!
//! Batches within a run are submitted sequentially, so at-most-one-in-flight
//! per key reduces to deduplicating identical texts inside a batch (done by
//! the client) plus this mutex-guarded map across batches.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use sha2::{Digest, Sha256};

use pulso_core::RawAnalysis;

/// Cache key for a comment text.
pub(crate) fn cache_key(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

#[derive(Debug, Default)]
pub(crate) struct ResponseCache {
    entries: Mutex<HashMap<String, RawAnalysis>>,
}

impl ResponseCache {
    pub(crate) fn get(&self, key: &str) -> Option<RawAnalysis> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub(crate) fn insert(&self, key: String, value: RawAnalysis) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawAnalysis {
        RawAnalysis {
            sentiment: "positive".to_string(),
            confidence: 0.9,
            themes: vec![],
            pain_points: vec![],
            emotions: vec![],
            language: None,
            translation: None,
        }
    }

    #[test]
    fn keys_are_stable_and_distinct() {
        assert_eq!(cache_key("hola"), cache_key("hola"));
        assert_ne!(cache_key("hola"), cache_key("hola "));
    }

    #[test]
    fn insert_then_get_round_trips() {
        let cache = ResponseCache::default();
        let key = cache_key("buen servicio");
        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), sample());
        assert_eq!(cache.get(&key), Some(sample()));
    }
}
