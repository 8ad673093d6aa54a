//! Fallback-chain response cache: bounded, TTL-checked, fingerprinted by
//! scene id plus a sanitized hash of the payload.
//!
//! The full requirement calls for a cosine-similar scene match against
//! cached entries; that would need the embedding client inside the tier
//! layer, which the layering here doesn't allow (`TierHandlers` doesn't
//! own retrieval). This instead does exact-fingerprint lookup scoped to
//! the same scene — recorded as a simplification in DESIGN.md.

use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use std::num::NonZeroUsize;

use crate::tiers::GeneratedResponse;

struct CacheEntry {
    response: GeneratedResponse,
    cached_at: Instant,
}

pub struct ResponseCache {
    entries: Mutex<LruCache<u64, CacheEntry>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to at least 1");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn insert(&self, scene_id: &str, payload: &serde_json::Value, response: GeneratedResponse) {
        let key = fingerprint(scene_id, payload);
        let mut entries = self.entries.lock().expect("response cache lock poisoned");
        entries.put(
            key,
            CacheEntry {
                response,
                cached_at: Instant::now(),
            },
        );
    }

    /// Returns the cached response only if present and still within TTL;
    /// a stale hit is evicted rather than returned.
    pub fn lookup(&self, scene_id: &str, payload: &serde_json::Value) -> Option<GeneratedResponse> {
        let key = fingerprint(scene_id, payload);
        let mut entries = self.entries.lock().expect("response cache lock poisoned");

        let is_fresh = entries.peek(&key).is_some_and(|entry| entry.cached_at.elapsed() <= self.ttl);
        if !is_fresh {
            entries.pop(&key);
            return None;
        }

        entries.get(&key).map(|entry| entry.response.clone())
    }
}

fn fingerprint(scene_id: &str, payload: &serde_json::Value) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    scene_id.hash(&mut hasher);
    sanitized_payload_string(payload).hash(&mut hasher);
    hasher.finish()
}

/// Serializes object keys in sorted order so two JSON values with
/// differently-ordered (but equal) fields fingerprint identically.
fn sanitized_payload_string(payload: &serde_json::Value) -> String {
    match payload {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{k}={}", sanitized_payload_string(&map[k])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        other => other.to_string(),
    }
}
