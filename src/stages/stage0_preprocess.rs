use serde::Serialize;
use tracing::debug;

use crate::heuristics::{detect_language, normalize_whitespace, remove_fillers, split_sentences};

/// Result of Stage 0 preprocessing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreprocessOutput {
    /// Sentences rejoined with single spaces; all span offsets point into this
    pub transcript_clean: String,
    /// ISO-639-1 code when detected, otherwise `"auto"`
    pub lang: String,
    pub sentences: Vec<String>,
}

/// Perform Stage 0: normalization, filler removal, sentence split, language detection
///
/// Pure and best-effort: empty or garbage input yields an empty transcript, never an error.
pub fn preprocess(raw: &str, lang_hint: Option<&str>) -> PreprocessOutput {
    let normalized = normalize_whitespace(raw);
    let deflated = remove_fillers(&normalized);
    let sentences = split_sentences(&deflated);
    let lang = detect_language(&deflated, lang_hint);

    let transcript_clean = if sentences.is_empty() {
        deflated.trim().to_string()
    } else {
        sentences.join(" ")
    };

    debug!(
        "Stage 0: {} -> {} chars, {} sentences, lang={}",
        raw.len(),
        transcript_clean.len(),
        sentences.len(),
        lang
    );

    PreprocessOutput {
        transcript_clean,
        lang,
        sentences,
    }
}
