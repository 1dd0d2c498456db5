//! Penalty-weighted multi-label scoring.
//!
//! Missing a true label costs twice as much as predicting an extra one. The
//! evaluator is strict: any unknown or repeated label id in either input is an
//! error, never silently ignored.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use crate::models::Label;

/// Cost of a true label that was not predicted
pub const FN_PENALTY: f64 = 2.0;
/// Cost of a predicted label that is not true
pub const FP_PENALTY: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("y_true and y_pred must have same length. Got {y_true} vs {y_pred}")]
    LengthMismatch { y_true: usize, y_pred: usize },

    #[error("{sample} contains duplicate label: '{label}'")]
    DuplicateLabel { sample: String, label: String },

    #[error("{sample} contains invalid label: '{label}'. Allowed labels: {allowed}")]
    InvalidLabel {
        sample: String,
        label: String,
        allowed: String,
    },
}

/// Check one sample and turn it into an 8-wide membership row
fn membership<S: AsRef<str>>(sample: &[S], name: &str) -> Result<[bool; 8], EvaluationError> {
    let mut seen = HashSet::new();
    for raw in sample {
        if !seen.insert(raw.as_ref()) {
            return Err(EvaluationError::DuplicateLabel {
                sample: name.to_string(),
                label: raw.as_ref().to_string(),
            });
        }
    }

    let mut row = [false; 8];
    for raw in sample {
        let Some(label) = Label::parse(raw.as_ref()) else {
            return Err(EvaluationError::InvalidLabel {
                sample: name.to_string(),
                label: raw.as_ref().to_string(),
                allowed: Label::ALL.map(|l| l.as_str()).join(", "),
            });
        };
        row[label.index()] = true;
    }
    Ok(row)
}

fn sample_score(truth: &[bool; 8], pred: &[bool; 8]) -> f64 {
    let mut true_count = 0usize;
    let mut fn_count = 0usize;
    let mut fp_count = 0usize;
    for (t, p) in truth.iter().zip(pred) {
        match (*t, *p) {
            (true, false) => {
                true_count += 1;
                fn_count += 1;
            }
            (true, true) => true_count += 1,
            (false, true) => fp_count += 1,
            (false, false) => {}
        }
    }

    let n_labels = truth.len();
    let max_err = FN_PENALTY * true_count as f64 + FP_PENALTY * (n_labels - true_count) as f64;
    let weighted = FN_PENALTY * fn_count as f64 + FP_PENALTY * fp_count as f64;
    if max_err <= 0.0 {
        return 1.0;
    }
    1.0 - weighted / max_err
}

/// Macro-averaged score of a batch, in [0, 1]
///
/// Every sample is validated before anything is scored. An empty batch scores 1.0.
pub fn score<S: AsRef<str>>(y_true: &[Vec<S>], y_pred: &[Vec<S>]) -> Result<f64, EvaluationError> {
    if y_true.len() != y_pred.len() {
        return Err(EvaluationError::LengthMismatch {
            y_true: y_true.len(),
            y_pred: y_pred.len(),
        });
    }

    let truth = y_true
        .iter()
        .enumerate()
        .map(|(i, s)| membership(s, &format!("y_true[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;
    let pred = y_pred
        .iter()
        .enumerate()
        .map(|(i, s)| membership(s, &format!("y_pred[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;

    if truth.is_empty() {
        return Ok(1.0);
    }

    let total: f64 = truth
        .iter()
        .zip(&pred)
        .map(|(t, p)| sample_score(t, p))
        .sum();
    Ok((total / truth.len() as f64).clamp(0.0, 1.0))
}

/// Readable single-sample comparison
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SampleBreakdown {
    #[serde(rename = "tp")]
    pub true_positives: usize,
    #[serde(rename = "fn")]
    pub false_negatives: usize,
    #[serde(rename = "fp")]
    pub false_positives: usize,
    /// True labels that were not predicted, in ground-truth order
    pub missed: Vec<Label>,
    /// Predicted labels that are not true, in prediction order
    pub extra: Vec<Label>,
}

pub fn breakdown(y_true: &[Label], y_pred: &[Label]) -> SampleBreakdown {
    let truth: HashSet<Label> = y_true.iter().copied().collect();
    let pred: HashSet<Label> = y_pred.iter().copied().collect();

    SampleBreakdown {
        true_positives: truth.intersection(&pred).count(),
        false_negatives: truth.difference(&pred).count(),
        false_positives: pred.difference(&truth).count(),
        missed: y_true.iter().filter(|l| !pred.contains(l)).copied().collect(),
        extra: y_pred.iter().filter(|l| !truth.contains(l)).copied().collect(),
    }
}
