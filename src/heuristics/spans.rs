use regex::RegexBuilder;

use super::text::fold;
use crate::models::EvidenceSpan;

/// Strong spans kept per label
pub const STRONG_SPAN_LIMIT: usize = 2;

/// Locate the first case-insensitive occurrence of `needle` in `haystack`
///
/// The returned span carries the live haystack slice, not the needle.
pub fn find_span(haystack: &str, needle: &str) -> Option<EvidenceSpan> {
    let needle = needle.trim();
    if needle.is_empty() {
        return None;
    }
    let re = RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
        .ok()?;
    re.find(haystack)
        .and_then(|m| EvidenceSpan::snapshot(haystack, m.start(), m.end()))
}

/// A span is valid when it is non-empty, in bounds, on char boundaries and,
/// if it carries a snapshot, the snapshot still matches the live text
pub fn verify_span(span: &EvidenceSpan, transcript: &str) -> bool {
    if span.end <= span.start || span.end > transcript.len() {
        return false;
    }
    let Some(slice) = transcript.get(span.start..span.end) else {
        return false;
    };
    match span.text.as_deref() {
        None | Some("") => true,
        Some(snapshot) => fold(slice) == fold(snapshot),
    }
}

/// Rank by length descending then earliest start, keep the first `limit`
pub fn pick_strong_spans(spans: &[EvidenceSpan], limit: usize) -> Vec<EvidenceSpan> {
    let mut ranked = spans.to_vec();
    ranked.sort_by(|a, b| b.len().cmp(&a.len()).then(a.start.cmp(&b.start)));
    ranked.truncate(limit);
    ranked
}
