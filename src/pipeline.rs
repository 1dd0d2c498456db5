use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::config::{env_var, lookup_num, Lookup};
use crate::llm::{CompletionProvider, PromptRepository};
use crate::models::{ConversationArtifacts, Label};
use crate::stages::{
    execute_stage1, execute_stage2, execute_stage3, execute_stage4, preprocess,
    ClassificationOutput, ExtractionOutput, FinalizeOutput, PreprocessOutput, Stage1Config,
    Stage2Config, Stage3Config, Stage4Config, ValidationOutput,
};

/// Prompt template used when nothing else is configured
pub const DEFAULT_PROMPT_PATH: &str = "prompts/classifier.txt";

/// Configuration for a full pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Classifier prompt template, relative paths resolve against the working directory
    pub prompt_path: PathBuf,
    pub stage1: Stage1Config,
    pub stage2: Stage2Config,
    pub stage3: Stage3Config,
    pub stage4: Stage4Config,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prompt_path: PathBuf::from(DEFAULT_PROMPT_PATH),
            stage1: Stage1Config::default(),
            stage2: Stage2Config::default(),
            stage3: Stage3Config::default(),
            // final labels need at least one strong span
            stage4: Stage4Config {
                min_spans: 1,
                ..Default::default()
            },
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with `CLASSIFIER_PROMPT_PATH`, `LLM_TIMEOUT_SECS` and the
    /// validation/finalization variables
    pub fn from_env() -> Self {
        Self::from_lookup(&env_var)
    }

    pub fn from_lookup(get: Lookup<'_>) -> Self {
        let defaults = Self::default();
        let prompt_path = get("CLASSIFIER_PROMPT_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.prompt_path);

        let mut stage1 = defaults.stage1;
        let mut stage2 = defaults.stage2;
        if let Some(secs) = lookup_num::<u64>(get, "LLM_TIMEOUT_SECS") {
            stage1.timeout = Duration::from_secs(secs);
            stage2.timeout = Duration::from_secs(secs);
        }

        Self {
            prompt_path,
            stage1,
            stage2,
            stage3: Stage3Config::from_lookup(get),
            stage4: defaults.stage4.with_lookup(get),
        }
    }
}

/// Every intermediate artifact of one run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub preprocess: PreprocessOutput,
    pub extraction: ExtractionOutput,
    pub classification: ClassificationOutput,
    pub validation: ValidationOutput,
    pub finalized: FinalizeOutput,
}

impl PipelineRun {
    pub fn labels_final(&self) -> &[Label] {
        &self.finalized.labels_final
    }

    /// Markdown list of the final labels with their rationale
    pub fn summary_md(&self) -> String {
        if self.finalized.labels_meta.is_empty() {
            return "_No actions detected._".to_string();
        }
        let mut md = String::from("### Recommended actions\n");
        for meta in &self.finalized.labels_meta {
            md.push_str(&format!(
                "- **{}** ({:.2}): {}\n",
                meta.label, meta.score_final, meta.rationale
            ));
        }
        md
    }

    /// Package the run as a persistable conversation record
    pub fn into_artifacts(self, raw: &str, title: Option<String>) -> ConversationArtifacts {
        let summary_md = self.summary_md();
        let version = env!("CARGO_PKG_VERSION").to_string();
        let agent_versions: BTreeMap<String, String> =
            ["preprocess", "extract", "classify", "validate", "finalize"]
                .into_iter()
                .map(|stage| (stage.to_string(), version.clone()))
                .collect();

        ConversationArtifacts {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            lang: self.preprocess.lang,
            transcript_raw: raw.to_string(),
            transcript_clean: self.preprocess.transcript_clean,
            requests: self.extraction.requests,
            entities: self.extraction.entities,
            labels_final: self.finalized.labels_final,
            labels_meta: self.finalized.labels_meta,
            summary_md,
            created_at: chrono::Utc::now().to_rfc3339(),
            agent_versions,
        }
    }
}

/// Stateless stage sequencer; safe to share across concurrent runs
pub struct Pipeline {
    provider: Arc<dyn CompletionProvider>,
    prompts: Arc<PromptRepository>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        prompts: Arc<PromptRepository>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            provider,
            prompts,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run preprocess, extraction, classification, validation and finalization
    ///
    /// Errors only when the classifier prompt template cannot be loaded.
    pub async fn run(&self, raw: &str, lang_hint: Option<&str>) -> Result<PipelineRun> {
        let prep = preprocess(raw, lang_hint);
        info!(
            "Preprocessed {} chars into {} sentences (lang={})",
            prep.transcript_clean.len(),
            prep.sentences.len(),
            prep.lang
        );

        let extraction = execute_stage1(self.provider.as_ref(), &prep, &self.config.stage1).await;

        let classification = execute_stage2(
            self.provider.as_ref(),
            &self.prompts,
            &self.config.prompt_path,
            &prep.transcript_clean,
            &extraction.requests,
            &self.config.stage2,
        )
        .await
        .context("Classification failed")?;

        let validation = execute_stage3(
            &classification.candidates,
            &prep.transcript_clean,
            &self.config.stage3,
        );
        let finalized = execute_stage4(&validation.validated, &self.config.stage4);

        info!("Final labels: {:?}", finalized.labels_final);

        Ok(PipelineRun {
            preprocess: prep,
            extraction,
            classification,
            validation,
            finalized,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedProvider;
    use crate::llm::DisabledProvider;
    use std::io::Write;

    const SCENARIO: &str =
        "Let's schedule a meeting next week, and please update my email to jane@example.com";

    fn prompt_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Classify the conversation into action labels.").unwrap();
        file
    }

    fn pipeline(provider: Arc<dyn CompletionProvider>, prompt: &tempfile::NamedTempFile) -> Pipeline {
        let config = PipelineConfig {
            prompt_path: prompt.path().to_path_buf(),
            ..Default::default()
        };
        Pipeline::new(provider, Arc::new(PromptRepository::new()), config)
    }

    fn scripted(requests: &str, labels: &str) -> Arc<dyn CompletionProvider> {
        Arc::new(ScriptedProvider::new(vec![Some(requests), Some(labels)]))
    }

    #[tokio::test]
    async fn test_meeting_and_email_scenario() {
        let prompt = prompt_file();
        let provider = scripted(
            r#"{"requests": ["schedule a meeting next week", "update my email to jane@example.com"]}"#,
            r#"{"labels": ["schedule_meeting", "update_contact_info_non_postal"]}"#,
        );

        let run = pipeline(provider, &prompt).run(SCENARIO, None).await.unwrap();

        assert_eq!(run.extraction.entities.emails, vec!["jane@example.com"]);
        assert_eq!(
            run.labels_final(),
            &[Label::ScheduleMeeting, Label::UpdateContactInfoNonPostal]
        );

        let transcript = &run.preprocess.transcript_clean;
        for meta in &run.finalized.labels_meta {
            assert!(!meta.spans.is_empty());
            assert!((0.0..=1.0).contains(&meta.score_final));
            assert!(meta.score_final >= meta.threshold);
            for span in &meta.spans {
                assert!(span.start < span.end && span.end <= transcript.len());
            }
        }
        assert_eq!(
            run.finalized.labels_meta[0].spans[0].text.as_deref(),
            Some("meeting")
        );
    }

    #[tokio::test]
    async fn test_empty_transcript() {
        let prompt = prompt_file();
        let provider = scripted(r#"{"requests": []}"#, r#"{"labels": []}"#);

        let run = pipeline(provider, &prompt).run("", None).await.unwrap();

        assert_eq!(run.preprocess.transcript_clean, "");
        assert_eq!(run.preprocess.lang, "auto");
        assert!(run.labels_final().is_empty());
    }

    #[tokio::test]
    async fn test_hallucinated_label_without_evidence_is_dropped() {
        let prompt = prompt_file();
        let provider = scripted(
            r#"{"requests": ["schedule a meeting"]}"#,
            r#"["schedule_meeting", "update_kyc_total_assets", "made_up_label"]"#,
        );

        let run = pipeline(provider, &prompt)
            .run("Can we schedule a meeting?", None)
            .await
            .unwrap();

        assert_eq!(run.labels_final(), &[Label::ScheduleMeeting]);
        assert_eq!(run.classification.rejected, vec!["made_up_label"]);
    }

    #[tokio::test]
    async fn test_conflict_law() {
        let prompt = prompt_file();
        let provider = scripted(
            r#"{"requests": []}"#,
            r#"{"labels": ["plan_contact", "schedule_meeting"]}"#,
        );

        let run = pipeline(provider, &prompt)
            .run("Please contact me to set up a meeting.", None)
            .await
            .unwrap();

        assert_eq!(run.labels_final(), &[Label::ScheduleMeeting]);
    }

    #[tokio::test]
    async fn test_repeat_runs_are_stable() {
        let prompt = prompt_file();
        let requests = r#"{"requests": ["update my address"]}"#;
        let labels = r#"{"labels": ["update_contact_info_postal_address", "update_kyc_activity"]}"#;
        let text = "I moved, please update my address. My new job starts soon.";

        let first = pipeline(scripted(requests, labels), &prompt)
            .run(text, None)
            .await
            .unwrap();
        let second = pipeline(scripted(requests, labels), &prompt)
            .run(text, None)
            .await
            .unwrap();

        assert_eq!(first.labels_final(), second.labels_final());
        assert_eq!(first.finalized, second.finalized);
    }

    #[tokio::test]
    async fn test_missing_template_is_fatal() {
        let config = PipelineConfig {
            prompt_path: PathBuf::from("/nonexistent/prompts/classifier.txt"),
            ..Default::default()
        };
        let pipeline = Pipeline::new(
            Arc::new(DisabledProvider),
            Arc::new(PromptRepository::new()),
            config,
        );

        assert!(pipeline.run(SCENARIO, None).await.is_err());
    }

    #[tokio::test]
    async fn test_offline_run_degrades() {
        let prompt = prompt_file();
        let run = pipeline(Arc::new(DisabledProvider), &prompt)
            .run(SCENARIO, Some("en"))
            .await
            .unwrap();

        assert!(!run.extraction.requests.is_empty());
        assert!(run.classification.candidates.is_empty());
        assert!(run.labels_final().is_empty());
        assert_eq!(run.preprocess.lang, "en");
    }

    #[tokio::test]
    async fn test_into_artifacts() {
        let prompt = prompt_file();
        let provider = scripted(
            r#"{"requests": ["schedule a meeting next week"]}"#,
            r#"{"labels": ["schedule_meeting"]}"#,
        );
        let run = pipeline(provider, &prompt).run(SCENARIO, None).await.unwrap();

        let artifacts = run.into_artifacts(SCENARIO, Some("Call with Jane".to_string()));
        assert_eq!(artifacts.transcript_raw, SCENARIO);
        assert_eq!(artifacts.labels_final, vec![Label::ScheduleMeeting]);
        assert!(artifacts.summary_md.contains("**schedule_meeting**"));
        assert!(uuid::Uuid::parse_str(&artifacts.id).is_ok());
        assert!(chrono::DateTime::parse_from_rfc3339(&artifacts.created_at).is_ok());
        assert_eq!(artifacts.agent_versions.len(), 5);
    }

    #[tokio::test]
    async fn test_report_dump_carries_stage_internals() {
        let prompt = prompt_file();
        let provider = scripted(
            r#"{"requests": ["schedule a meeting next week"]}"#,
            r#"{"labels": ["schedule_meeting"]}"#,
        );
        let run = pipeline(provider, &prompt).run(SCENARIO, None).await.unwrap();

        let input = crate::io::ReportInput {
            file_txt: "call.txt".to_string(),
            file_json: "call.json".to_string(),
            prompt: "prompt.txt".to_string(),
            transcript_preview: crate::io::preview(SCENARIO),
        };
        let report =
            crate::io::RunReport::new(input, &run, Some(vec![Label::ScheduleMeeting]), true)
                .unwrap();
        let dumped = report.intermediate.unwrap();
        assert_eq!(dumped.evidence_spans, run.extraction.evidence_spans());
        // email entity plus the verbatim request
        assert!(dumped.evidence_spans.len() >= 2);
        assert_eq!(dumped.requests, vec!["schedule a meeting next week"]);
    }

    #[test]
    fn test_config_from_lookup() {
        let get = |name: &str| match name {
            "CLASSIFIER_PROMPT_PATH" => Some("custom/prompt.txt".to_string()),
            "LLM_TIMEOUT_SECS" => Some("7".to_string()),
            "VALIDATION_REQUIRE_SPAN" => Some("yes".to_string()),
            "FINALIZE_TOPK" => Some("2".to_string()),
            _ => None,
        };
        let config = PipelineConfig::from_lookup(&get);
        assert_eq!(config.prompt_path, PathBuf::from("custom/prompt.txt"));
        assert_eq!(config.stage1.timeout, Duration::from_secs(7));
        assert_eq!(config.stage2.timeout, Duration::from_secs(7));
        assert!(config.stage3.require_span);
        assert_eq!(config.stage4.top_k, Some(2));
        assert_eq!(config.stage4.min_spans, 1);

        let config = PipelineConfig::from_lookup(&|_: &str| None);
        assert_eq!(config.prompt_path, PathBuf::from(DEFAULT_PROMPT_PATH));
        assert_eq!(config.stage4.min_spans, 1);
    }
}
