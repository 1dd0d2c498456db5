use serde::Serialize;
use tracing::{debug, info};

use crate::config::{env_var, lookup_num, lookup_thresholds, Lookup, Thresholds};
use crate::models::{Label, LabelMeta, ValidatedLabel};

/// Configuration for Stage 4
#[derive(Debug, Clone)]
pub struct Stage4Config {
    /// Defaults already merged with any overrides
    pub thresholds: Thresholds,
    /// Sort by score descending (label id breaks ties)
    pub sort: bool,
    /// Keep at most this many labels
    pub top_k: Option<usize>,
    /// Minimum strong spans a label needs
    pub min_spans: usize,
}

impl Default for Stage4Config {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            sort: true,
            top_k: None,
            min_spans: 0,
        }
    }
}

impl Stage4Config {
    /// Defaults overlaid with the environment
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Overlay `FINALIZE_THRESHOLDS_JSON`, `FINALIZE_TOPK` and `FINALIZE_MIN_SPANS`
    pub fn with_env(self) -> Self {
        self.with_lookup(&env_var)
    }

    pub fn with_lookup(self, get: Lookup<'_>) -> Self {
        let thresholds = match lookup_thresholds(get) {
            Some(overrides) => self.thresholds.merged(&overrides),
            None => self.thresholds,
        };
        Self {
            thresholds,
            sort: self.sort,
            top_k: lookup_num(get, "FINALIZE_TOPK").or(self.top_k),
            min_spans: lookup_num(get, "FINALIZE_MIN_SPANS").unwrap_or(self.min_spans),
        }
    }
}

/// Result of Stage 4 finalization
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinalizeOutput {
    pub labels_final: Vec<Label>,
    pub labels_meta: Vec<LabelMeta>,
}

/// Execute Stage 4: thresholds, span gate, dedup, ordering and top-K
pub fn execute_stage4(validated: &[ValidatedLabel], config: &Stage4Config) -> FinalizeOutput {
    let mut labels_meta: Vec<LabelMeta> = Vec::new();

    for v in validated {
        let threshold = config.thresholds.get(v.label);
        let score = if v.score_adj.is_finite() {
            v.score_adj.clamp(0.0, 1.0)
        } else {
            0.0
        };

        if score < threshold || v.spans.len() < config.min_spans {
            debug!(
                "Stage 4: dropped {} (score {:.2} vs {:.2}, {} spans)",
                v.label,
                score,
                threshold,
                v.spans.len()
            );
            continue;
        }

        let meta = LabelMeta {
            label: v.label,
            score_final: score,
            threshold,
            spans: v.spans.clone(),
            rationale: v.rationale.clone(),
        };
        match labels_meta.iter_mut().find(|m| m.label == meta.label) {
            Some(prev) if prev.score_final < meta.score_final => *prev = meta,
            Some(_) => {}
            None => labels_meta.push(meta),
        }
    }

    if config.sort {
        labels_meta.sort_by(|a, b| {
            b.score_final
                .total_cmp(&a.score_final)
                .then_with(|| a.label.as_str().cmp(b.label.as_str()))
        });
    }
    if let Some(k) = config.top_k {
        labels_meta.truncate(k);
    }

    let labels_final: Vec<Label> = labels_meta.iter().map(|m| m.label).collect();
    info!(
        "Stage 4: {} of {} labels finalized",
        labels_final.len(),
        validated.len()
    );

    FinalizeOutput {
        labels_final,
        labels_meta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdOverrides;
    use crate::models::{EvidenceKind, EvidenceSpan};

    fn validated(label: Label, score_adj: f64, spans: usize) -> ValidatedLabel {
        ValidatedLabel {
            label,
            score_adj,
            rationale: format!("{} rationale", label),
            spans: (0..spans).map(|i| EvidenceSpan::new(i * 10, i * 10 + 5)).collect(),
            evidence: EvidenceKind::Keyword,
        }
    }

    #[test]
    fn test_config_with_lookup() {
        let get = |name: &str| match name {
            "FINALIZE_THRESHOLDS_JSON" => Some(r#"{"plan_contact": 0.9}"#.to_string()),
            "FINALIZE_TOPK" => Some("3".to_string()),
            "FINALIZE_MIN_SPANS" => Some("2".to_string()),
            _ => None,
        };
        let config = Stage4Config::default().with_lookup(&get);
        assert_eq!(config.thresholds.get(Label::PlanContact), 0.9);
        assert_eq!(config.thresholds.get(Label::ScheduleMeeting), 0.45);
        assert_eq!(config.top_k, Some(3));
        assert_eq!(config.min_spans, 2);

        let base = Stage4Config {
            top_k: Some(5),
            min_spans: 1,
            ..Default::default()
        };
        let kept = base.with_lookup(&|name: &str| {
            (name == "FINALIZE_TOPK").then(|| "many".to_string())
        });
        assert_eq!(kept.top_k, Some(5));
        assert_eq!(kept.min_spans, 1);
        assert_eq!(kept.thresholds, Thresholds::default());
    }

    #[test]
    fn test_threshold_gate() {
        let out = execute_stage4(
            &[
                validated(Label::ScheduleMeeting, 0.45, 1),
                validated(Label::UpdateKycActivity, 0.44, 1),
                validated(Label::UpdateKycOriginOfAssets, 0.40, 1),
            ],
            &Stage4Config::default(),
        );
        assert_eq!(
            out.labels_final,
            vec![Label::ScheduleMeeting, Label::UpdateKycOriginOfAssets]
        );
        assert_eq!(out.labels_meta[1].threshold, 0.40);
    }

    #[test]
    fn test_overrides_apply() {
        let mut overrides = ThresholdOverrides::new();
        overrides.insert(Label::UpdateKycActivity, 0.30);
        let config = Stage4Config {
            thresholds: Thresholds::default().merged(&overrides),
            ..Default::default()
        };
        let out = execute_stage4(&[validated(Label::UpdateKycActivity, 0.35, 0)], &config);
        assert_eq!(out.labels_final, vec![Label::UpdateKycActivity]);
        assert_eq!(out.labels_meta[0].threshold, 0.30);
    }

    #[test]
    fn test_min_spans_gate() {
        let config = Stage4Config {
            min_spans: 1,
            ..Default::default()
        };
        let out = execute_stage4(
            &[
                validated(Label::UpdateKycTotalAssets, 0.9, 0),
                validated(Label::PlanContact, 0.5, 1),
            ],
            &config,
        );
        assert_eq!(out.labels_final, vec![Label::PlanContact]);
    }

    #[test]
    fn test_dedup_keeps_best() {
        let out = execute_stage4(
            &[
                validated(Label::PlanContact, 0.5, 1),
                validated(Label::PlanContact, 0.7, 2),
                validated(Label::PlanContact, 0.6, 1),
            ],
            &Stage4Config::default(),
        );
        assert_eq!(out.labels_final, vec![Label::PlanContact]);
        assert_eq!(out.labels_meta[0].score_final, 0.7);
        assert_eq!(out.labels_meta[0].spans.len(), 2);
    }

    #[test]
    fn test_sort_and_top_k() {
        let input = [
            validated(Label::UpdateKycActivity, 0.5, 1),
            validated(Label::ScheduleMeeting, 0.6, 2),
            validated(Label::PlanContact, 0.5, 1),
        ];

        let out = execute_stage4(&input, &Stage4Config::default());
        assert_eq!(
            out.labels_final,
            vec![Label::ScheduleMeeting, Label::PlanContact, Label::UpdateKycActivity]
        );

        let unsorted = Stage4Config {
            sort: false,
            top_k: Some(2),
            ..Default::default()
        };
        let out = execute_stage4(&input, &unsorted);
        assert_eq!(
            out.labels_final,
            vec![Label::UpdateKycActivity, Label::ScheduleMeeting]
        );
    }

    #[test]
    fn test_meta_invariants() {
        let out = execute_stage4(
            &[
                validated(Label::UpdateKycTotalAssets, 1.4, 2),
                validated(Label::PlanContact, f64::NAN, 2),
            ],
            &Stage4Config::default(),
        );
        assert_eq!(out.labels_final, vec![Label::UpdateKycTotalAssets]);
        for meta in &out.labels_meta {
            assert!((0.0..=1.0).contains(&meta.score_final));
            assert!(meta.score_final >= meta.threshold);
        }
    }

    #[test]
    fn test_empty_input() {
        let out = execute_stage4(&[], &Stage4Config::default());
        assert_eq!(out, FinalizeOutput::default());
    }
}
