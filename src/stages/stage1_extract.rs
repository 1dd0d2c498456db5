use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use super::PreprocessOutput;
use crate::heuristics::{extract_entities, find_span};
use crate::llm::{
    build_requests_prompt, complete_within, decode_requests, CompletionOptions, CompletionProvider,
};
use crate::models::{Entities, EvidenceSpan};

/// Sentences that look like they ask for an action
static ACTION_HINTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(schedule|meeting|update|change|address|email|kyc|origin|call|contact|appointment|termin|adresse|erbschaft|inheritance|finden|vereinbaren)\b",
    )
    .unwrap()
});

static LEADING_FILLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:i'?d like to|i would like to|ich möchte|vorrei)\b").unwrap()
});

static CLAUSE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]\s+").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static LEADING_DASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-+\s*").unwrap());

/// Configuration for Stage 1
#[derive(Debug, Clone)]
pub struct Stage1Config {
    pub options: CompletionOptions,
    /// Upper bound on the completion round-trip
    pub timeout: Duration,
    /// Requests longer than this many characters are cut
    pub max_request_chars: usize,
    /// Cap on rule-based requests
    pub max_fallback_requests: usize,
}

impl Default for Stage1Config {
    fn default() -> Self {
        Self {
            options: CompletionOptions {
                temperature: 0.2,
                max_tokens: 400,
            },
            timeout: Duration::from_secs(30),
            max_request_chars: 120,
            max_fallback_requests: 10,
        }
    }
}

/// Which path produced the request list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestSource {
    Model,
    Fallback,
}

/// Result of Stage 1 extraction
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutput {
    /// Deduplicated atomic client requests
    pub requests: Vec<String>,
    pub request_source: RequestSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub entities: Entities,
    pub entity_spans: Vec<EvidenceSpan>,
    /// Spans for requests found verbatim (case-insensitive) in the transcript
    pub request_spans: Vec<EvidenceSpan>,
}

impl ExtractionOutput {
    /// Entity spans followed by request spans
    pub fn evidence_spans(&self) -> Vec<EvidenceSpan> {
        [self.entity_spans.as_slice(), self.request_spans.as_slice()].concat()
    }
}

/// Execute Stage 1: rule-based entities plus model-backed atomic requests
///
/// Never fails: a failed, slow or malformed completion switches to the
/// rule-based request fallback.
pub async fn execute_stage1(
    provider: &dyn CompletionProvider,
    prep: &PreprocessOutput,
    config: &Stage1Config,
) -> ExtractionOutput {
    let transcript = prep.transcript_clean.as_str();
    let extraction = extract_entities(transcript);

    let prompt = build_requests_prompt(transcript);
    let input = serde_json::json!({});
    let response =
        complete_within(provider, &prompt, &input, &config.options, config.timeout).await;

    let (requests, request_source, notes) =
        match response.map_err(|e| e.to_string()).and_then(|raw| {
            decode_requests(&raw).map_err(|e| format!("malformed requests JSON: {}", e))
        }) {
            Ok(payload) => (
                ensure_unique_short(payload.requests, config.max_request_chars),
                RequestSource::Model,
                payload.notes,
            ),
            Err(e) => {
                warn!("Stage 1: request extraction fell back to rules: {}", e);
                let fallback = fallback_requests(&prep.sentences, transcript, config);
                (
                    ensure_unique_short(fallback, config.max_request_chars),
                    RequestSource::Fallback,
                    None,
                )
            }
        };

    let request_spans: Vec<EvidenceSpan> = requests
        .iter()
        .filter_map(|r| find_span(transcript, r))
        .collect();

    info!(
        "Stage 1: {} entities, {} requests ({:?}), {} located",
        extraction.entities.total(),
        requests.len(),
        request_source,
        request_spans.len()
    );

    ExtractionOutput {
        requests,
        request_source,
        notes,
        entities: extraction.entities,
        entity_spans: extraction.spans,
        request_spans,
    }
}

/// Rule-based requests: action-bearing sentences, leading filler stripped, lower-cased
fn fallback_requests(sentences: &[String], transcript: &str, config: &Stage1Config) -> Vec<String> {
    let source: Vec<&str> = if sentences.is_empty() {
        CLAUSE_BREAK.split(transcript).collect()
    } else {
        sentences.iter().map(String::as_str).collect()
    };

    source
        .into_iter()
        .map(str::trim)
        .filter(|s| ACTION_HINTS.is_match(s))
        .map(|s| LEADING_FILLER.replace(s, "").trim().to_string())
        .map(|s| WHITESPACE.replace_all(&s, " ").to_lowercase())
        .map(|s| LEADING_DASHES.replace(&s, "").into_owned())
        .take(config.max_fallback_requests)
        .collect()
}

/// Trim, cut to `max_chars`, drop empties and case-insensitive duplicates
fn ensure_unique_short(items: Vec<String>, max_chars: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let value: String = item.trim().chars().take(max_chars).collect();
        if value.is_empty() {
            continue;
        }
        if seen.insert(value.to_lowercase()) {
            out.push(value);
        }
    }
    out
}
