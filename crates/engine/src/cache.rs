//! In-process query cache.
//!
//! Keys are normalized-query fingerprints plus a mode-specific qualifier,
//! so "What is X?" and "  what is   x? " hit the same entry while the same
//! question at a different top-k (or against a different table) does not.
//! Session-scoped: no TTL, no eviction beyond `clear()`, never persisted.

use crate::types::QueryMode;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

/// Cache key: query mode, normalized-query fingerprint, and a qualifier
/// (top-k for document queries, table name for tabular queries).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub mode: QueryMode,
    pub fingerprint: String,
    pub qualifier: String,
}

impl CacheKey {
    /// Key for a document question at a given top-k.
    pub fn pdf(query: &str, top_k: usize) -> Self {
        Self {
            mode: QueryMode::Pdf,
            fingerprint: fingerprint(query),
            qualifier: top_k.to_string(),
        }
    }

    /// Key for a tabular question against a given table.
    pub fn csv(query: &str, table: &str) -> Self {
        Self {
            mode: QueryMode::Csv,
            fingerprint: fingerprint(query),
            qualifier: table.to_string(),
        }
    }
}

/// A cached answer payload with bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub created_at: DateTime<Utc>,
    pub hit_count: u64,
}

/// Normalize a query for fingerprinting: trim, lower-case, collapse
/// inner whitespace runs to single spaces.
pub fn normalize_query(query: &str) -> String {
    query
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// SHA-256 hex digest of the normalized query.
fn fingerprint(query: &str) -> String {
    let normalized = normalize_query(query);
    let digest = Sha256::digest(normalized.as_bytes());
    format!("{:x}", digest)
}

/// In-process query cache over a mutex-guarded map.
///
/// Callers on the query path treat cache failures as misses; operations
/// here never propagate errors.
pub struct QueryCache<T> {
    entries: Mutex<HashMap<CacheKey, CacheEntry<T>>>,
}

impl<T: Clone> QueryCache<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a cached payload, bumping the entry's hit count.
    pub fn get(&self, key: &CacheKey) -> Option<T> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get_mut(key).map(|entry| {
            entry.hit_count += 1;
            tracing::debug!(
                "Cache hit ({} hits): {} [{}]",
                entry.hit_count,
                key.fingerprint,
                key.mode
            );
            entry.payload.clone()
        })
    }

    /// Store or overwrite a payload.
    pub fn put(&self, key: CacheKey, payload: T) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key,
            CacheEntry {
                payload,
                created_at: Utc::now(),
                hit_count: 0,
            },
        );
    }

    /// Drop every entry. The only form of eviction.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let dropped = entries.len();
        entries.clear();
        tracing::info!("Cleared query cache ({} entries)", dropped);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Default for QueryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
