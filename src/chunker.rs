//! Semantic Chunker (spec §4.9): recursive decontamination. Splits
//! paragraph -> sentence, re-auditing each piece, and redacts wholesale
//! once `MAX_DEPTH` is reached. Bounds total `audit_fn` calls by
//! `2^MAX_DEPTH` regardless of how many pieces a split produces.

use regex::Regex;
use std::cell::Cell;
use std::sync::OnceLock;

/// Caps the total number of `audit_fn` invocations across the whole
/// recursion at `2^max_depth`. A paragraph/sentence split is n-ary, not
/// binary, so without this the call count tracks piece count rather than
/// depth; once the budget is spent, remaining chunks are treated as dirty
/// without inspecting them.
struct AuditBudget {
    remaining: Cell<u32>,
}

impl AuditBudget {
    fn new(max_depth: u32) -> Self {
        Self {
            remaining: Cell::new(2u32.saturating_pow(max_depth)),
        }
    }

    fn exhausted(&self) -> bool {
        self.remaining.get() == 0
    }

    /// Calls `audit_fn` if budget remains; otherwise conservatively reports
    /// the chunk as dirty without calling it.
    fn check(&self, chunk: &str, audit_fn: &dyn Fn(&str) -> bool) -> bool {
        let remaining = self.remaining.get();
        if remaining == 0 {
            return false;
        }
        self.remaining.set(remaining - 1);
        audit_fn(chunk)
    }
}

#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub chunk: String,
    pub depth: u32,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ChunkResult {
    pub clean: bool,
    pub clean_text: String,
    pub manifest: Vec<ManifestEntry>,
}

fn sentence_boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.?!]\s+").unwrap())
}

fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\n+|\n").unwrap())
}

fn split_paragraph(text: &str) -> Vec<String> {
    paragraph_re().split(text).map(str::to_string).filter(|s| !s.is_empty()).collect()
}

/// The `regex` crate has no lookbehind, so the terminator is kept attached
/// to the preceding sentence by hand rather than split on a zero-width match.
fn split_sentence(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut last_end = 0;
    for m in sentence_boundary_re().find_iter(text) {
        let terminator_end = m.start() + 1;
        pieces.push(text[last_end..terminator_end].to_string());
        last_end = m.end();
    }
    if last_end < text.len() {
        pieces.push(text[last_end..].to_string());
    }
    pieces.into_iter().filter(|s| !s.is_empty()).collect()
}

/// `audit_fn` returns `true` when the given chunk is clean.
pub fn decontaminate(text: &str, max_depth: u32, audit_fn: &dyn Fn(&str) -> bool) -> ChunkResult {
    let budget = AuditBudget::new(max_depth);
    if budget.check(text, audit_fn) {
        return ChunkResult {
            clean: true,
            clean_text: text.to_string(),
            manifest: Vec::new(),
        };
    }
    recurse(text, 0, max_depth, audit_fn, &budget)
}

fn redact_wholesale(text: &str, depth: u32, reason: &str) -> ChunkResult {
    ChunkResult {
        clean: false,
        clean_text: String::new(),
        manifest: vec![ManifestEntry {
            chunk: text.to_string(),
            depth,
            reason: reason.to_string(),
        }],
    }
}

fn recurse(text: &str, depth: u32, max_depth: u32, audit_fn: &dyn Fn(&str) -> bool, budget: &AuditBudget) -> ChunkResult {
    if depth >= max_depth {
        return redact_wholesale(text, depth, "max depth reached, redacted wholesale");
    }
    if budget.exhausted() {
        return redact_wholesale(text, depth, "audit budget exhausted, redacted wholesale");
    }

    let mut pieces = if depth == 0 {
        split_paragraph(text)
    } else {
        split_sentence(text)
    };

    // A split that produces exactly one piece makes no progress; descend a
    // depth instead of looping forever on the same text.
    if pieces.len() == 1 {
        return recurse(text, depth + 1, max_depth, audit_fn, budget);
    }
    if pieces.is_empty() {
        pieces.push(text.to_string());
    }

    let separator = if depth == 0 { "\n\n" } else { " " };
    let mut clean_parts = Vec::new();
    let mut manifest = Vec::new();

    for piece in pieces {
        if budget.check(&piece, audit_fn) {
            clean_parts.push(piece);
        } else {
            let sub = recurse(&piece, depth + 1, max_depth, audit_fn, budget);
            if !sub.clean_text.is_empty() {
                clean_parts.push(sub.clean_text);
            }
            manifest.extend(sub.manifest);
        }
    }

    ChunkResult {
        clean: manifest.is_empty(),
        clean_text: clean_parts.join(separator),
        manifest,
    }
}
