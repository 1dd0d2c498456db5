use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::heuristics::first_keyword_span;
use crate::llm::{
    complete_within, decode_labels, wrap_classifier_prompt, CompletionOptions, CompletionProvider,
    LabelDecoding, PromptRepository,
};
use crate::models::{CandidateLabel, Label, BASELINE_SCORE};

const CLASSIFIER_WHY: &str = "returned by classifier prompt";

/// Configuration for Stage 2
#[derive(Debug, Clone)]
pub struct Stage2Config {
    pub options: CompletionOptions,
    pub timeout: Duration,
}

impl Default for Stage2Config {
    fn default() -> Self {
        Self {
            options: CompletionOptions {
                temperature: 0.0,
                max_tokens: 600,
            },
            timeout: Duration::from_secs(30),
        }
    }
}

/// Result of Stage 2 classification
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassificationOutput {
    /// Whitelisted, deduplicated, in classifier order
    pub candidates: Vec<CandidateLabel>,
    /// `None` when the completion itself failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoding: Option<LabelDecoding>,
    /// Strings the classifier returned that are not label ids
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<String>,
}

/// Execute Stage 2: template-driven multi-label classification
///
/// Only a missing or unreadable template is an error. A failed completion
/// yields no candidates.
pub async fn execute_stage2(
    provider: &dyn CompletionProvider,
    prompts: &PromptRepository,
    prompt_path: &Path,
    transcript: &str,
    requests: &[String],
    config: &Stage2Config,
) -> Result<ClassificationOutput> {
    let template = prompts.load(prompt_path).await?;
    let prompt = wrap_classifier_prompt(&template, transcript, requests);
    let input = serde_json::json!({});

    let raw = match complete_within(provider, &prompt, &input, &config.options, config.timeout)
        .await
    {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Stage 2: classifier call failed, no candidates: {}", e);
            return Ok(ClassificationOutput::default());
        }
    };

    let decoded = decode_labels(&raw);
    debug!(
        "Stage 2: decoded {} raw labels via {:?}",
        decoded.labels.len(),
        decoded.strategy
    );

    let mut candidates: Vec<CandidateLabel> = Vec::new();
    let mut rejected = Vec::new();
    for raw_label in decoded.labels {
        let Some(label) = Label::parse(&raw_label) else {
            rejected.push(raw_label);
            continue;
        };
        if candidates.iter().any(|c| c.label == label) {
            continue;
        }
        candidates.push(CandidateLabel {
            label,
            score: BASELINE_SCORE,
            why: Some(CLASSIFIER_WHY.to_string()),
            spans: first_keyword_span(label, transcript).into_iter().collect(),
        });
    }

    if !rejected.is_empty() {
        warn!("Stage 2: ignored non-whitelisted labels {:?}", rejected);
    }
    info!(
        "Stage 2: {} candidates ({} with keyword hint)",
        candidates.len(),
        candidates.iter().filter(|c| !c.spans.is_empty()).count()
    );

    Ok(ClassificationOutput {
        candidates,
        decoding: Some(decoded.strategy),
        rejected,
    })
}
