//! Handoff Orchestrator (spec §4.7): dispatches every inter-agent message
//! through the Gate Pipeline, writes a content-addressed ledger entry, and
//! records a provenance witness. Grounded on the teacher's
//! `content_addressing::calculate_sha256` hashing idiom and its
//! swarm-audit/ledger naming conventions.

mod memory;
mod types;

pub use memory::{InMemoryAuditStore, InMemoryWitnessLog};
pub use types::{AgentInfo, AuditStore, DefenceResultSummary, Handoff, WitnessEntry, WitnessLog, WitnessStatus, WitnessType};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use crate::auditor::ThreatState;
use crate::error::{Error, Result};
use crate::gate::GatePipeline;

const DEFAULT_MAX_AGENTS: usize = 10;

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

struct Registry {
    agents: HashMap<String, AgentInfo>,
    last_message_by_role: HashMap<String, String>,
    max_agents: usize,
}

/// Dispatches handoffs through a [`GatePipeline`] and fans out best-effort
/// ledger/audit/witness writes. Owns a single logical session's agent
/// registry (spec §3: bounded by `maxAgents`).
pub struct Orchestrator {
    pipeline: GatePipeline,
    audit_store: Arc<dyn AuditStore>,
    witness_log: Arc<dyn WitnessLog>,
    registry: Mutex<Registry>,
    enable_audit: bool,
    threat_state: Option<Arc<ThreatState>>,
}

impl Orchestrator {
    pub fn new(
        pipeline: GatePipeline,
        audit_store: Arc<dyn AuditStore>,
        witness_log: Arc<dyn WitnessLog>,
        max_agents: Option<usize>,
        enable_audit: bool,
    ) -> Self {
        Self {
            pipeline,
            audit_store,
            witness_log,
            registry: Mutex::new(Registry {
                agents: HashMap::new(),
                last_message_by_role: HashMap::new(),
                max_agents: max_agents.unwrap_or(DEFAULT_MAX_AGENTS),
            }),
            enable_audit,
            threat_state: None,
        }
    }

    /// Wires the orchestrator to the async auditor's shared escalation flag
    /// (spec §5): every `dispatch` checks it at the phase boundary before
    /// the message is considered delivered.
    pub fn with_threat_state(mut self, threat_state: Arc<ThreatState>) -> Self {
        self.threat_state = Some(threat_state);
        self
    }

    pub fn register_agent(&self, id: &str, role: &str) -> Result<()> {
        let mut registry = self.registry.lock().unwrap();
        if registry.agents.len() >= registry.max_agents && !registry.agents.contains_key(role) {
            return Err(Error::Internal(format!(
                "agent registry full (max_agents={})",
                registry.max_agents
            )));
        }
        registry.agents.insert(
            role.to_string(),
            AgentInfo {
                id: id.to_string(),
                status: "active".to_string(),
                spawned_at: now_millis(),
            },
        );
        Ok(())
    }

    pub fn last_message(&self, role: &str) -> Option<String> {
        self.registry.lock().unwrap().last_message_by_role.get(role).cloned()
    }

    pub fn shutdown(&self) {
        let mut registry = self.registry.lock().unwrap();
        registry.agents.clear();
        registry.last_message_by_role.clear();
    }

    /// Runs `text` through the Gate Pipeline. On BLOCKED, raises
    /// `Error::SecurityViolation` and delivers nothing. On SAFE/FLAGGED,
    /// builds a `Handoff` and fires the three best-effort writes.
    pub async fn dispatch(&self, from_role: &str, to_role: &str, text: &str) -> Result<Handoff> {
        if let Some(threat_state) = &self.threat_state {
            if threat_state.is_escalated() {
                return Err(Error::ConsensusEscalation(
                    threat_state.reason().unwrap_or_else(|| "escalated".to_string()),
                ));
            }
        }

        let result = self.pipeline.process(text).await;

        if result.is_blocked {
            return Err(Error::SecurityViolation(
                result.block_reason.clone().unwrap_or_else(|| "blocked".to_string()),
            ));
        }

        if let Some(threat_state) = &self.threat_state {
            if threat_state.is_escalated() {
                return Err(Error::ConsensusEscalation(
                    threat_state.reason().unwrap_or_else(|| "escalated".to_string()),
                ));
            }
        }

        let message_id = Uuid::new_v4().to_string();
        let content_hash = sha256_hex(&result.safe_text);

        {
            let mut registry = self.registry.lock().unwrap();
            registry
                .last_message_by_role
                .insert(from_role.to_string(), message_id.clone());
        }

        let handoff = Handoff {
            message_id: message_id.clone(),
            from_role: from_role.to_string(),
            to_role: to_role.to_string(),
            delivered_text: result.safe_text.clone(),
            content_hash: content_hash.clone(),
            defence_result: DefenceResultSummary::from(&result),
            timestamp: now_millis(),
            witness_recorded: false,
        };

        if self.enable_audit {
            self.fire_ledger_write(&content_hash, &handoff);
            self.fire_swarm_audit_write(&message_id, &handoff);
            self.fire_witness_write(&content_hash);
        }

        Ok(handoff)
    }

    fn fire_ledger_write(&self, content_hash: &str, handoff: &Handoff) {
        let value = serde_json::json!({
            "messageId": handoff.message_id,
            "from": handoff.from_role,
            "to": handoff.to_role,
            "contentHash": content_hash,
            "verdict": handoff.defence_result.verdict,
            "timestamp": handoff.timestamp,
        });
        let key = format!("ledger:{content_hash}");
        let store = Arc::clone(&self.audit_store);
        tokio::spawn(async move {
            if let Err(e) = store.put("decision_ledger", &key, value).await {
                warn!(error = %e, "ledger write failed");
            }
        });
    }

    fn fire_swarm_audit_write(&self, message_id: &str, handoff: &Handoff) {
        let value = serde_json::to_value(handoff).unwrap_or(serde_json::Value::Null);
        let key = format!("handoff:{message_id}");
        let store = Arc::clone(&self.audit_store);
        tokio::spawn(async move {
            if let Err(e) = store.put("swarm_audit", &key, value).await {
                warn!(error = %e, "swarm audit write failed");
            }
        });
    }

    fn fire_witness_write(&self, content_hash: &str) {
        let entry = WitnessEntry {
            entry_type: WitnessType::Provenance,
            action_hash: content_hash.to_string(),
            metadata: serde_json::json!({}),
            prev_link: String::new(),
        };
        let log = Arc::clone(&self.witness_log);
        tokio::spawn(async move {
            if let Err(e) = log.record(entry).await {
                warn!(error = %e, "witness write failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use crate::error::Result as CrateResult;
    use crate::transport::{Tool, Transport};
    use async_trait::async_trait;
    use serde_json::{json, Value as JsonValue};
    use std::sync::Arc;

    struct BenignTransport;
    #[async_trait]
    impl Transport for BenignTransport {
        async fn call(&self, tool: Tool, _args: JsonValue) -> CrateResult<JsonValue> {
            match tool {
                Tool::Safe => Ok(json!({ "score": 0.0 })),
                Tool::Pii => Ok(json!({ "redacted_text": "hi", "entities": [] })),
                _ => Ok(json!({})),
            }
        }
        fn is_healthy(&self) -> bool {
            true
        }
    }

    struct BlockingTransport;
    #[async_trait]
    impl Transport for BlockingTransport {
        async fn call(&self, tool: Tool, _args: JsonValue) -> CrateResult<JsonValue> {
            match tool {
                Tool::Safe => Ok(json!({ "score": 0.99 })),
                Tool::Pii => Ok(json!({ "redacted_text": "", "entities": [] })),
                _ => Ok(json!({})),
            }
        }
        fn is_healthy(&self) -> bool {
            true
        }
    }

    fn orchestrator(transport: Arc<dyn Transport>) -> Orchestrator {
        let pipeline = GatePipeline::new(GateConfig::default(), transport, None, None, None);
        Orchestrator::new(
            pipeline,
            Arc::new(InMemoryAuditStore::new()),
            Arc::new(InMemoryWitnessLog::new()),
            Some(2),
            true,
        )
    }

    #[tokio::test]
    async fn safe_dispatch_returns_handoff_with_content_hash() {
        let orch = orchestrator(Arc::new(BenignTransport));
        let handoff = orch.dispatch("planner", "executor", "hi").await.unwrap();
        assert_eq!(handoff.content_hash, sha256_hex("hi"));
        assert_eq!(orch.last_message("planner"), Some(handoff.message_id));
    }

    #[tokio::test]
    async fn blocked_dispatch_raises_security_violation() {
        let orch = orchestrator(Arc::new(BlockingTransport));
        let result = orch.dispatch("planner", "executor", "anything").await;
        assert!(matches!(result, Err(Error::SecurityViolation(_))));
    }

    #[tokio::test]
    async fn escalated_threat_state_aborts_dispatch() {
        let pipeline = GatePipeline::new(GateConfig::default(), Arc::new(BenignTransport), None, None, None);
        let threat_state = Arc::new(ThreatState::new());
        threat_state.escalate("async auditor consensus");
        let orch = Orchestrator::new(
            pipeline,
            Arc::new(InMemoryAuditStore::new()),
            Arc::new(InMemoryWitnessLog::new()),
            None,
            true,
        )
        .with_threat_state(Arc::clone(&threat_state));

        let result = orch.dispatch("planner", "executor", "hi").await;
        assert!(matches!(result, Err(Error::ConsensusEscalation(_))));
    }

    #[test]
    fn register_agent_respects_max_agents() {
        let orch = orchestrator(Arc::new(BenignTransport));
        orch.register_agent("a1", "role1").unwrap();
        orch.register_agent("a2", "role2").unwrap();
        assert!(orch.register_agent("a3", "role3").is_err());
    }

    #[test]
    fn shutdown_clears_registry() {
        let orch = orchestrator(Arc::new(BenignTransport));
        orch.register_agent("a1", "role1").unwrap();
        orch.shutdown();
        assert!(orch.register_agent("a2", "role2").is_ok());
    }
}
