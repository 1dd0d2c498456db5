pub mod config;
pub mod eval;
pub mod heuristics;
pub mod io;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod stages;

pub use config::{Thresholds, ThresholdOverrides};
pub use eval::{breakdown, score, EvaluationError, SampleBreakdown};
pub use io::{parse_ground_truth, read_ground_truth, read_transcript, RunReport};
pub use llm::{
    build_provider, CompletionConfig, CompletionError, CompletionOptions, CompletionProvider,
    DisabledProvider, PromptRepository,
};
pub use models::{ConversationArtifacts, EvidenceSpan, Label, LabelMeta};
pub use pipeline::{Pipeline, PipelineConfig, PipelineRun};
pub use stages::{preprocess, Stage1Config, Stage2Config, Stage3Config, Stage4Config};
