use std::cmp::Ordering;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{env_var, lookup_bool, Lookup};
use crate::heuristics::{
    keyword_spans, pick_strong_spans, time_hint_spans, truncate_chars, verify_span,
    STRONG_SPAN_LIMIT,
};
use crate::models::{CandidateLabel, EvidenceKind, EvidenceSpan, Label, ValidatedLabel};

const QUOTE_CHARS: usize = 60;
const WHY_CHARS: usize = 80;

/// Configuration for Stage 3
#[derive(Debug, Clone)]
pub struct Stage3Config {
    /// Drop labels left with zero strong spans instead of passing them on
    pub require_span: bool,
    /// Accept weekday/month/relative-date hints as weak evidence for scheduling
    pub allow_time_hints: bool,
    pub strong_span_limit: usize,
}

impl Default for Stage3Config {
    fn default() -> Self {
        Self {
            require_span: false,
            allow_time_hints: true,
            strong_span_limit: STRONG_SPAN_LIMIT,
        }
    }
}

impl Stage3Config {
    /// Defaults overlaid with `VALIDATION_REQUIRE_SPAN` and `VALIDATION_ALLOW_TIME_HINTS`
    pub fn from_env() -> Self {
        Self::from_lookup(&env_var)
    }

    pub fn from_lookup(get: Lookup<'_>) -> Self {
        let defaults = Self::default();
        Self {
            require_span: lookup_bool(get, "VALIDATION_REQUIRE_SPAN", defaults.require_span),
            allow_time_hints: lookup_bool(
                get,
                "VALIDATION_ALLOW_TIME_HINTS",
                defaults.allow_time_hints,
            ),
            ..defaults
        }
    }
}

/// Result of Stage 3 validation
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationOutput {
    /// One entry per label, best score first
    pub validated: Vec<ValidatedLabel>,
    /// Generic labels removed in favour of a more specific one
    pub conflicts_resolved: Vec<Label>,
    /// Labels removed by the strict span gate
    pub dropped_without_evidence: Vec<Label>,
}

/// Recalibrate a classifier baseline by how much evidence backs it
pub fn adjust_score(base: f64, span_count: usize, had_keyword: bool) -> f64 {
    let base = if base.is_finite() { base } else { 0.0 };
    let mut score = base
        + match span_count {
            0 => -0.25,
            1 => -0.05,
            _ => 0.05,
        };
    if had_keyword {
        score += 0.05;
    }
    score.clamp(0.0, 1.0)
}

fn rationale(kind: EvidenceKind, spans: &[EvidenceSpan], why: Option<&str>) -> String {
    let quote = match spans.first().and_then(|s| s.text.as_deref()) {
        Some(text) if !text.is_empty() => format!("“{}”", truncate_chars(text, QUOTE_CHARS)),
        _ => "supported phrase".to_string(),
    };
    let mut line = format!("{}: {}", kind.describe(), quote);
    if let Some(why) = why.map(str::trim).filter(|w| !w.is_empty()) {
        line.push_str(" - ");
        line.push_str(&truncate_chars(why, WHY_CHARS));
    }
    line
}

fn validate_candidate(
    candidate: &CandidateLabel,
    transcript: &str,
    config: &Stage3Config,
) -> Option<ValidatedLabel> {
    let mut evidence: Vec<EvidenceSpan> = candidate
        .spans
        .iter()
        .filter(|s| verify_span(s, transcript))
        .cloned()
        .collect();
    let mut kind = if evidence.is_empty() {
        EvidenceKind::None
    } else {
        EvidenceKind::Text
    };

    if evidence.is_empty() {
        evidence = keyword_spans(candidate.label, transcript);
        if !evidence.is_empty() {
            kind = EvidenceKind::Keyword;
        }
    }

    if evidence.is_empty() && config.allow_time_hints && candidate.label == Label::ScheduleMeeting {
        evidence = time_hint_spans(transcript);
        if !evidence.is_empty() {
            kind = EvidenceKind::Time;
        }
    }

    let spans = pick_strong_spans(&evidence, config.strong_span_limit);
    if config.require_span && spans.is_empty() {
        return None;
    }

    let score_adj = adjust_score(candidate.score, spans.len(), kind == EvidenceKind::Keyword);
    debug!(
        "Stage 3: {} {:?} {} spans, {:.2} -> {:.2}",
        candidate.label,
        kind,
        spans.len(),
        candidate.score,
        score_adj
    );

    Some(ValidatedLabel {
        label: candidate.label,
        score_adj,
        rationale: rationale(kind, &spans, candidate.why.as_deref()),
        spans,
        evidence: kind,
    })
}

/// Score descending, then label id ascending
fn by_score_then_label(a: &ValidatedLabel, b: &ValidatedLabel) -> Ordering {
    b.score_adj
        .total_cmp(&a.score_adj)
        .then_with(|| a.label.as_str().cmp(b.label.as_str()))
}

/// Execute Stage 3: the evidence gate
///
/// Pure: malformed spans count as missing evidence, nothing here fails.
pub fn execute_stage3(
    candidates: &[CandidateLabel],
    transcript: &str,
    config: &Stage3Config,
) -> ValidationOutput {
    let mut validated: Vec<ValidatedLabel> = Vec::new();
    let mut dropped_without_evidence = Vec::new();

    for candidate in candidates {
        let Some(v) = validate_candidate(candidate, transcript, config) else {
            dropped_without_evidence.push(candidate.label);
            continue;
        };
        match validated.iter_mut().find(|existing| existing.label == v.label) {
            Some(existing) if existing.score_adj < v.score_adj => *existing = v,
            Some(_) => {}
            None => validated.push(v),
        }
    }

    // the specific label always wins over the generic one
    let mut conflicts_resolved = Vec::new();
    if validated.iter().any(|v| v.label == Label::ScheduleMeeting) {
        let before = validated.len();
        validated.retain(|v| v.label != Label::PlanContact);
        if validated.len() < before {
            conflicts_resolved.push(Label::PlanContact);
        }
    }

    validated.sort_by(by_score_then_label);

    info!(
        "Stage 3: {} of {} candidates validated ({} conflicts, {} without evidence)",
        validated.len(),
        candidates.len(),
        conflicts_resolved.len(),
        dropped_without_evidence.len()
    );

    ValidationOutput {
        validated,
        conflicts_resolved,
        dropped_without_evidence,
    }
}
