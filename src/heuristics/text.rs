use std::sync::LazyLock;

use regex::Regex;

/// Language code used when detection is inconclusive
pub const AUTO_LANG: &str = "auto";

static HORIZONTAL_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\n\s*").unwrap());
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());
static ANY_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Low-signal fillers in EN/DE/IT
static FILLERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(uhm+|ehm+|ähm+|äh+|erm+|mmm+|you know|so to speak|diciamo|cioè)\b").unwrap()
});

/// Per-language cue words, including weekday and month names
static LANGUAGE_CUES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        (
            "de",
            Regex::new(
                r"(?i)\b(und|ich|nicht|danke|bitte|gern|termin|montag|dienstag|mittwoch|donnerstag|freitag|januar|februar|märz|oktober|dezember)\b",
            )
            .unwrap(),
        ),
        (
            "it",
            Regex::new(
                r"(?i)\b(ecco|ciao|grazie|prego|appuntamento|vorrei|buongiorno|lunedì|martedì|mercoledì|giovedì|venerdì|gennaio|febbraio|marzo|aprile|maggio|giugno|luglio|settembre|ottobre|dicembre)\b",
            )
            .unwrap(),
        ),
        (
            "en",
            Regex::new(
                r"(?i)\b(and|the|please|thanks|meeting|monday|tuesday|wednesday|thursday|friday|january|february|march|june|july|october|december)\b",
            )
            .unwrap(),
        ),
    ]
});

/// Normalize typographic quotes, collapse horizontal whitespace and trim,
/// keeping single line breaks between paragraphs
pub fn normalize_whitespace(input: &str) -> String {
    let quoted: String = input
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect();
    let collapsed = HORIZONTAL_WHITESPACE.replace_all(&quoted, " ");
    let paragraphs = LINE_BREAK.replace_all(&collapsed, "\n");
    paragraphs.trim().to_string()
}

/// Drop filler words, leaving every other character untouched
pub fn remove_fillers(input: &str) -> String {
    let stripped = FILLERS.replace_all(input, "");
    WHITESPACE_RUN.replace_all(&stripped, " ").into_owned()
}

/// Collapse every whitespace run to one space, trim and lower-case
pub fn fold(input: &str) -> String {
    ANY_WHITESPACE.replace_all(input, " ").trim().to_lowercase()
}

fn starts_sentence(c: char) -> bool {
    matches!(c, 'A'..='Z' | 'À'..='Ö' | 'Ø'..='Ý')
}

/// Heuristic sentence split: cut after `.`, `?` or `!` when whitespace and a
/// capitalized token follow
pub fn split_sentences(input: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut last = 0;

    for m in SENTENCE_END.find_iter(input) {
        let next = input[m.end()..].chars().next();
        if next.is_some_and(starts_sentence) {
            // punctuation is a single ASCII byte
            sentences.push(&input[last..m.start() + 1]);
            last = m.end();
        }
    }
    sentences.push(&input[last..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Naive keyword-count language detection
///
/// A non-empty hint wins. Zero hits or a tie for the top count yields `"auto"`.
pub fn detect_language(text: &str, hint: Option<&str>) -> String {
    if let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) {
        return hint.to_lowercase();
    }

    let counts: Vec<(&str, usize)> = LANGUAGE_CUES
        .iter()
        .map(|(code, re)| (*code, re.find_iter(text).count()))
        .collect();

    let max = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
    if max == 0 {
        return AUTO_LANG.to_string();
    }

    let mut leaders = counts.iter().filter(|(_, n)| *n == max);
    match (leaders.next(), leaders.next()) {
        (Some((code, _)), None) => code.to_string(),
        _ => AUTO_LANG.to_string(),
    }
}

/// Truncate to at most `max` characters, marking the cut with an ellipsis
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}
