//! In-memory reference implementations of [`AuditStore`] and [`WitnessLog`].
//! Persistent storage is explicitly out of scope (spec §1); these exist so
//! the orchestrator can be exercised end to end and serve as a usable
//! default for callers with no external store.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sha3::{digest::{ExtendableOutput, Update, XofReader}, Shake256};

use crate::error::Result;

use super::types::{AuditStore, WitnessEntry, WitnessLog, WitnessStatus};

#[derive(Default)]
pub struct InMemoryAuditStore {
    entries: Mutex<Vec<(String, String, JsonValue)>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<JsonValue> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(n, k, _)| n == namespace && k == key)
            .map(|(_, _, v)| v.clone())
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn put(&self, namespace: &str, key: &str, value: JsonValue) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .push((namespace.to_string(), key.to_string(), value));
        Ok(())
    }
}

/// Hash-links entries with a SHAKE256 absorb of `prev_link || action_hash`
/// (spec §6), grounded on the enrichment repo's witness entry-hashing idiom.
pub struct InMemoryWitnessLog {
    entries: Mutex<Vec<WitnessEntry>>,
}

impl InMemoryWitnessLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn genesis_link() -> String {
        hex::encode([0u8; 32])
    }

    fn link(prev_link: &str, action_hash: &str) -> String {
        let mut hasher = Shake256::default();
        hasher.update(prev_link.as_bytes());
        hasher.update(action_hash.as_bytes());
        let mut reader = hasher.finalize_xof();
        let mut out = [0u8; 32];
        reader.read(&mut out);
        hex::encode(out)
    }

    pub fn entries(&self) -> Vec<WitnessEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl Default for InMemoryWitnessLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WitnessLog for InMemoryWitnessLog {
    async fn record(&self, mut entry: WitnessEntry) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let prev = entries
            .last()
            .map(|e| e.prev_link.clone())
            .unwrap_or_else(Self::genesis_link);
        entry.prev_link = Self::link(&prev, &entry.action_hash);
        entries.push(entry);
        Ok(())
    }

    async fn get_status(&self) -> Result<WitnessStatus> {
        let count = self.entries.lock().unwrap().len() as u64;
        Ok(WitnessStatus {
            vector_count: count,
            segment_count: (count / 1000) + 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::types::WitnessType;
    use serde_json::json;

    #[tokio::test]
    async fn audit_store_roundtrips_latest_value() {
        let store = InMemoryAuditStore::new();
        store.put("ns", "k", json!({"a": 1})).await.unwrap();
        store.put("ns", "k", json!({"a": 2})).await.unwrap();
        assert_eq!(store.get("ns", "k"), Some(json!({"a": 2})));
    }

    #[tokio::test]
    async fn witness_entries_chain_distinct_links() {
        let log = InMemoryWitnessLog::new();
        log.record(WitnessEntry {
            entry_type: WitnessType::Provenance,
            action_hash: "hash1".into(),
            metadata: json!({}),
            prev_link: String::new(),
        })
        .await
        .unwrap();
        log.record(WitnessEntry {
            entry_type: WitnessType::Provenance,
            action_hash: "hash2".into(),
            metadata: json!({}),
            prev_link: String::new(),
        })
        .await
        .unwrap();

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_ne!(entries[0].prev_link, entries[1].prev_link);
    }

    #[tokio::test]
    async fn status_tracks_entry_count() {
        let log = InMemoryWitnessLog::new();
        let status = log.get_status().await.unwrap();
        assert_eq!(status.vector_count, 0);
        log.record(WitnessEntry {
            entry_type: WitnessType::Computation,
            action_hash: "h".into(),
            metadata: json!({}),
            prev_link: String::new(),
        })
        .await
        .unwrap();
        let status = log.get_status().await.unwrap();
        assert_eq!(status.vector_count, 1);
    }
}
