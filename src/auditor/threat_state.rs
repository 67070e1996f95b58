//! Shared escalation flag for one logical session (spec §3, §5). First
//! escalation wins and the state never de-escalates. Grounded on the
//! teacher's single-writer idiom from the wasm security gate enrichment
//! repo, adapted from thread-local `RefCell` to a `Send + Sync` shared
//! value since this crate is multi-threaded via tokio.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub struct ThreatState {
    escalated: AtomicBool,
    reason: Mutex<Option<String>>,
}

impl ThreatState {
    pub fn new() -> Self {
        Self {
            escalated: AtomicBool::new(false),
            reason: Mutex::new(None),
        }
    }

    pub fn is_escalated(&self) -> bool {
        self.escalated.load(Ordering::SeqCst)
    }

    pub fn reason(&self) -> Option<String> {
        self.reason.lock().unwrap().clone()
    }

    /// Records an escalation. A no-op if one was already recorded; the
    /// stored reason is always the first escalation's.
    pub fn escalate(&self, reason: impl Into<String>) {
        let already_escalated = self
            .escalated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err();
        if !already_escalated {
            *self.reason.lock().unwrap() = Some(reason.into());
        }
    }
}

impl Default for ThreatState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn first_escalation_wins() {
        let state = ThreatState::new();
        state.escalate("first");
        state.escalate("second");
        assert!(state.is_escalated());
        assert_eq!(state.reason(), Some("first".to_string()));
    }

    #[test]
    fn never_de_escalates() {
        let state = ThreatState::new();
        assert!(!state.is_escalated());
        state.escalate("threat");
        assert!(state.is_escalated());
    }

    #[test]
    fn concurrent_escalation_keeps_exactly_one_reason() {
        let state = Arc::new(ThreatState::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let state = Arc::clone(&state);
            handles.push(std::thread::spawn(move || {
                state.escalate(format!("reason-{i}"));
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert!(state.is_escalated());
        assert!(state.reason().is_some());
    }
}
