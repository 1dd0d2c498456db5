use std::sync::LazyLock;

use regex::Regex;

use crate::models::{EvidenceSpan, Label};

/// Canonical per-label keyword alternation (EN/DE/IT/FR)
///
/// The classifier takes the first hit as its hint span; the validator takes
/// every hit when it has to backfill evidence.
fn keyword_source(label: Label) -> &'static str {
    match label {
        Label::ScheduleMeeting => {
            r"meeting|appointment|termin|rückruf|vereinbaren|call\s+back|appuntamento|prendre\s+rendez[- ]vous|fixer\s+(?:un\s+)?rendez[- ]vous|rendez[- ]vous|rappel"
        }
        Label::PlanContact => {
            r"contact|reach\s*out|kontakt|contattare|pianificare\s+contatto|prendre\s+contact|recontacter|rappeler"
        }
        Label::UpdateContactInfoPostalAddress => {
            r"address|adresse\s+postale|adresse|indirizzo|plz|postleitzahl|zip|code\s+postal|cp"
        }
        Label::UpdateContactInfoNonPostal => {
            r"email|e-mail|mail|courriel|phone|telefon|tel|téléphone|telephone|nummer|numéro|numero"
        }
        Label::UpdateKycOriginOfAssets => {
            r"origin\s+of\s+assets|source\s+of\s+wealth|erbschaft|inheritance|herkunft\s+des\s+vermögens|origine\s+dei\s+beni|origine\s+des\s+fonds|source\s+des\s+fonds|provenance\s+des\s+avoirs"
        }
        Label::UpdateKycActivity => {
            r"activity|occupation|employment|job|beschäftigung|beruf|attività\s+lavorativa|attività|activité|profession|emploi|travail"
        }
        Label::UpdateKycPurposeOfBusinessrelation => concat!(
            r"purpose\s+of\s+(?:the\s+)?business\s*relation(?:ship)?|business\s+purpose|account\s+(?:will\s+be\s+)?used\s+for|used\s+to\s+pay|to\s+pay\s+bills|salary\s+deposit|direct\s+deposit|invest(?:ing|ments?)|savings?|recurring\s+transfers?|",
            r"zweck\s+der\s+geschäftsbeziehung|verwendungszweck|konto\s+(?:wird\s+)?(?:für|zum)\s+(?:lohn|gehalt|rechnungen|investitionen|sparen|daueraufträge)|",
            r"scopo\s+della\s+relazione|uso\s+del\s+conto|verrà\s+usato\s+per|per\s+pagare\s+le\s+bollette|accredito\s+stipendio|investimenti|risparmio|bonifici\s+ricorrenti|",
            r"but\s+de\s+la\s+relation\s+d'affaires|objectif\s+de\s+la\s+relation\s+d'affaires|raison\s+de\s+la\s+relation\s+commerciale|usage\s+du\s+compte|sera\s+utilisé\s+pour|pour\s+payer\s+les\s+factures|recevoir\s+le\s+salaire|investir|épargner|epargner|virements?\s+récurrents?"
        ),
        Label::UpdateKycTotalAssets => {
            r"total\s+assets|net\s+worth|vermögen\s+gesamt|gesamtvermögen|patrimonio\s+totale|actifs\s+totaux|patrimoine\s+total|fortune\s+totale"
        }
    }
}

/// Compiled registry, indexed by `Label::index`
static LABEL_KEYWORDS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    Label::ALL
        .iter()
        .map(|label| Regex::new(&format!(r"(?i)\b(?:{})\b", keyword_source(*label))).unwrap())
        .collect()
});

/// Weekday/month names and relative-date phrases
static TIME_HINTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:",
        r"aujourd'hui|demain|après[- ]demain|la\s+semaine\s+prochaine|semaine\s+prochaine|",
        r"lundi|mardi|mercredi|jeudi|vendredi|samedi|dimanche|",
        r"janvier|février|fevrier|mars|avril|mai|juin|juillet|août|aout|septembre|octobre|novembre|décembre|decembre|",
        r"today|tomorrow|next\s+week|mon(?:day)?|tue(?:sday)?|wed(?:nesday)?|thu(?:rsday)?|fri(?:day)?|sat(?:urday)?|sun(?:day)?|",
        r"übermorgen|nächste\s+woche|montag|dienstag|mittwoch|donnerstag|freitag|samstag|sonntag|",
        r"januar|februar|märz|maerz|april|juni|juli|august|september|oktober|november|dezember|",
        r"oggi|domani|dopodomani|settimana\s+prossima|prossima\s+settimana|",
        r"lunedì|martedì|mercoledì|giovedì|venerdì|sabato|domenica",
        r")\b"
    ))
    .unwrap()
});

/// The registry pattern for a label
pub fn keyword_pattern(label: Label) -> &'static Regex {
    &LABEL_KEYWORDS[label.index()]
}

fn collect_spans(re: &Regex, transcript: &str) -> Vec<EvidenceSpan> {
    re.find_iter(transcript)
        .filter_map(|m| EvidenceSpan::snapshot(transcript, m.start(), m.end()))
        .collect()
}

/// First keyword hit for the label, if any
pub fn first_keyword_span(label: Label, transcript: &str) -> Option<EvidenceSpan> {
    keyword_pattern(label)
        .find(transcript)
        .and_then(|m| EvidenceSpan::snapshot(transcript, m.start(), m.end()))
}

/// Every keyword hit for the label, in text order
pub fn keyword_spans(label: Label, transcript: &str) -> Vec<EvidenceSpan> {
    collect_spans(keyword_pattern(label), transcript)
}

/// Every time/date hint in text order
pub fn time_hint_spans(transcript: &str) -> Vec<EvidenceSpan> {
    collect_spans(&TIME_HINTS, transcript)
}
