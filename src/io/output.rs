use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::eval::{breakdown, score, SampleBreakdown};
use crate::models::{CandidateLabel, EvidenceSpan, Label, LabelMeta, ValidatedLabel};
use crate::pipeline::PipelineRun;

/// Characters of cleaned transcript shown in a report
pub const PREVIEW_CHARS: usize = 220;

/// Evaluation report for one transcript
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input: ReportInput,
    pub y_true: Vec<Label>,
    pub y_pred: Vec<Label>,
    pub evaluation: Evaluation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intermediate: Option<Intermediate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportInput {
    pub file_txt: String,
    pub file_json: String,
    pub prompt: String,
    pub transcript_preview: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Evaluation {
    Scored {
        /// Rounded to three decimals
        score: f64,
        #[serde(flatten)]
        breakdown: SampleBreakdown,
    },
    Missing(String),
}

/// Pipeline internals included on request
#[derive(Debug, Clone, Serialize)]
pub struct Intermediate {
    pub requests: Vec<String>,
    /// Stage 1 entity and request spans
    pub evidence_spans: Vec<EvidenceSpan>,
    pub candidates: Vec<CandidateLabel>,
    pub validated: Vec<ValidatedLabel>,
    pub labels_meta: Vec<LabelMeta>,
}

impl RunReport {
    /// Build a report; `y_true` is `None` when no ground truth was found
    pub fn new(
        input: ReportInput,
        run: &PipelineRun,
        y_true: Option<Vec<Label>>,
        dump: bool,
    ) -> Result<Self> {
        let y_pred = run.labels_final().to_vec();
        let y_true = y_true.unwrap_or_default();

        let evaluation = if y_true.is_empty() {
            Evaluation::Missing("No ground-truth JSON found; pass --json if needed.".to_string())
        } else {
            let batch_true = [y_true.iter().map(Label::as_str).collect::<Vec<_>>()];
            let batch_pred = [y_pred.iter().map(Label::as_str).collect::<Vec<_>>()];
            let value = score(&batch_true, &batch_pred).context("Evaluation failed")?;
            Evaluation::Scored {
                score: (value * 1000.0).round() / 1000.0,
                breakdown: breakdown(&y_true, &y_pred),
            }
        };

        let intermediate = dump.then(|| Intermediate {
            requests: run.extraction.requests.clone(),
            evidence_spans: run.extraction.evidence_spans(),
            candidates: run.classification.candidates.clone(),
            validated: run.validation.validated.clone(),
            labels_meta: run.finalized.labels_meta.clone(),
        });

        Ok(Self {
            input,
            y_true,
            y_pred,
            evaluation,
            intermediate,
        })
    }
}

/// First `PREVIEW_CHARS` characters, with an ellipsis when cut
pub fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().nth(PREVIEW_CHARS).is_some() {
        out.push('…');
    }
    out
}

/// Pretty JSON to a file, or stdout when `path` is `None`
pub fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create file: {:?}", path))?;
            serde_json::to_writer_pretty(file, value).context("Failed to write JSON")?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer_pretty(&mut handle, value).context("Failed to write JSON")?;
            writeln!(handle)?;
        }
    }
    Ok(())
}

/// Human-readable block listing the final labels
pub fn render_predicted(metas: &[LabelMeta]) -> String {
    let rule = "=".repeat(30);
    let mut output = format!("{rule}\nPredicted labels (final):\n");
    if metas.is_empty() {
        output.push_str("∅ none\n");
    }
    for meta in metas {
        output.push_str(&format!("• {} ({:.2})\n", meta.label, meta.score_final));
        output.push_str(&wrap_text(&meta.rationale, 76, "    "));
        output.push('\n');
    }
    output.push_str(&rule);
    output.push('\n');
    output
}

/// Wrap text at approximately the given width, indenting every line
fn wrap_text(text: &str, width: usize, indent: &str) -> String {
    let mut result = String::from(indent);
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if line_len + word_len + 1 > width && line_len > 0 {
            result.push('\n');
            result.push_str(indent);
            line_len = 0;
        }
        if line_len > 0 {
            result.push(' ');
            line_len += 1;
        }
        result.push_str(word);
        line_len += word_len;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(label: Label, score_final: f64, rationale: &str) -> LabelMeta {
        LabelMeta {
            label,
            score_final,
            threshold: 0.45,
            spans: vec![EvidenceSpan::new(0, 4)],
            rationale: rationale.to_string(),
        }
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short"), "short");
        let long = "ä".repeat(300);
        let cut = preview(&long);
        assert_eq!(cut.chars().count(), PREVIEW_CHARS + 1);
        assert!(cut.ends_with('…'));
        assert_eq!(preview(&"x".repeat(PREVIEW_CHARS)), "x".repeat(PREVIEW_CHARS));
    }

    #[test]
    fn test_render_predicted() {
        let text = render_predicted(&[meta(
            Label::ScheduleMeeting,
            0.45,
            "text quote: “meeting”",
        )]);
        assert!(text.contains("• schedule_meeting (0.45)"));
        assert!(text.contains("    text quote: “meeting”"));

        assert!(render_predicted(&[]).contains("∅ none"));
    }

    #[test]
    fn test_wrap_text() {
        let text = "This is a test of the text wrapping function that should wrap at 20 chars";
        let wrapped = wrap_text(text, 20, "  ");
        for line in wrapped.lines() {
            assert!(line.starts_with("  "));
            assert!(line.len() <= 27);
        }
    }

    #[test]
    fn test_evaluation_serializes_flat() {
        let scored = Evaluation::Scored {
            score: 0.778,
            breakdown: breakdown(&[Label::ScheduleMeeting], &[]),
        };
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["score"], 0.778);
        assert_eq!(json["fn"], 1);
        assert_eq!(json["missed"][0], "schedule_meeting");

        let missing = serde_json::to_value(Evaluation::Missing("none".to_string())).unwrap();
        assert_eq!(missing, "none");
    }
}
