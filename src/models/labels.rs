use serde::{Deserialize, Serialize};

use super::{EvidenceSpan, Label};

/// Neutral confidence assigned to every classifier candidate
pub const BASELINE_SCORE: f64 = 0.50;

/// Unverified, classifier-proposed label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateLabel {
    pub label: Label,
    /// Baseline confidence (0-1)
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why: Option<String>,
    #[serde(default)]
    pub spans: Vec<EvidenceSpan>,
}

/// Where a validated label's evidence came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    /// Candidate-supplied span that survived verification
    Text,
    /// Backfilled from the label keyword registry
    Keyword,
    /// Backfilled from weekday/month/relative-date hints
    Time,
    None,
}

impl EvidenceKind {
    pub fn describe(&self) -> &'static str {
        match self {
            EvidenceKind::Text => "text quote",
            EvidenceKind::Keyword => "keyword match",
            EvidenceKind::Time => "time/date hint",
            EvidenceKind::None => "no direct evidence",
        }
    }
}

/// Label whose evidence has been re-verified and whose score was recalibrated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedLabel {
    pub label: Label,
    /// Recalibrated confidence (0-1)
    pub score_adj: f64,
    pub rationale: String,
    /// At most two strong spans
    pub spans: Vec<EvidenceSpan>,
    pub evidence: EvidenceKind,
}

/// Audit record for a label that made it into the final output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMeta {
    pub label: Label,
    pub score_final: f64,
    /// Threshold the score was compared against
    pub threshold: f64,
    pub spans: Vec<EvidenceSpan>,
    pub rationale: String,
}
