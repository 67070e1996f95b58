//! Data model for the Handoff Orchestrator (spec §3, §4.7, §6).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::gate::DefenceResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handoff {
    pub message_id: String,
    pub from_role: String,
    pub to_role: String,
    pub delivered_text: String,
    pub content_hash: String,
    pub defence_result: DefenceResultSummary,
    pub timestamp: i64,
    pub witness_recorded: bool,
}

/// A JSON-friendly projection of [`DefenceResult`] for persistence; the full
/// `DefenceResult` carries `Duration`s that serialize awkwardly as ledger
/// entries, so only the fields the ledger schema (spec §6) names are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefenceResultSummary {
    pub verdict: String,
    pub is_blocked: bool,
}

impl From<&DefenceResult> for DefenceResultSummary {
    fn from(result: &DefenceResult) -> Self {
        Self {
            verdict: format!("{:?}", result.verdict),
            is_blocked: result.is_blocked,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WitnessType {
    Provenance,
    Computation,
    Search,
    Deletion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessEntry {
    pub entry_type: WitnessType,
    pub action_hash: String,
    pub metadata: JsonValue,
    pub prev_link: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WitnessStatus {
    pub vector_count: u64,
    pub segment_count: u64,
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn put(&self, namespace: &str, key: &str, value: JsonValue) -> Result<()>;
}

#[async_trait]
pub trait WitnessLog: Send + Sync {
    async fn record(&self, entry: WitnessEntry) -> Result<()>;
    async fn get_status(&self) -> Result<WitnessStatus>;
}

/// Bounded `role -> agent` mapping (spec §3: size ≤ `maxAgents`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: String,
    pub status: String,
    pub spawned_at: i64,
}
