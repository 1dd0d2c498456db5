use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Entities, EvidenceSpan};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b").unwrap());

static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bhttps?://[^\s)]+").unwrap());

/// Street name, house number, 4-5 digit postal code, city
static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b[A-ZÀ-ÖØ-Ý][a-zà-öø-ÿ]+(?:\s+[A-ZÀ-ÖØ-Ýa-zà-öø-ÿ]+)*\s+\d+[A-Za-z]?,?\s*(?:CH-)?\d{4,5}\s+[A-ZÀ-ÖØ-Ýa-zà-öø-ÿ]+\b",
    )
    .unwrap()
});

/// Explicit weekday/month tokens (EN/IT abbreviations) or numeric d/m[/y];
/// relative phrases are deliberately not matched
static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:",
        r"(?:Mon|Tue|Wed|Thu|Fri|Sat|Sun|Lun|Mar|Mer|Gio|Ven|Sab|Dom)",
        r"|\d{1,2}/\d{1,2}(?:/\d{2,4})?",
        r"|(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec|Gen|Mag|Giu|Lug|Ago|Set|Ott|Dic)\.?\s+\d{1,2}",
        r")\b"
    ))
    .unwrap()
});

/// Currency marker followed by a number with optional thousands/decimal groups
static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\b(?:CHF|EUR|USD|Fr)|[$€])\s?\d{1,3}(?:[.,]\d{3})*(?:[.,]\d{2})?\b").unwrap()
});

/// Entity mentions plus the evidence span for each of them
#[derive(Debug, Clone, Default)]
pub struct EntityExtraction {
    pub entities: Entities,
    /// Spans in kind order: emails, urls, addresses, dates, amounts
    pub spans: Vec<EvidenceSpan>,
}

fn collect(re: &Regex, text: &str) -> Vec<EvidenceSpan> {
    re.find_iter(text)
        .filter_map(|m| EvidenceSpan::snapshot(text, m.start(), m.end()))
        .collect()
}

fn literals(spans: &[EvidenceSpan]) -> Vec<String> {
    spans.iter().filter_map(|s| s.text.clone()).collect()
}

/// Deterministic pattern-based entity extraction; never fails
pub fn extract_entities(text: &str) -> EntityExtraction {
    let emails = collect(&EMAIL, text);
    let urls = collect(&URL, text);
    let addresses = collect(&ADDRESS, text);
    let dates = collect(&DATE, text);
    let amounts = collect(&AMOUNT, text);

    let entities = Entities {
        emails: literals(&emails),
        addresses: literals(&addresses),
        dates: literals(&dates),
        urls: literals(&urls),
        amounts: literals(&amounts),
    };

    let spans = [emails, urls, addresses, dates, amounts].concat();
    EntityExtraction { entities, spans }
}
