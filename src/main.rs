use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use talk2task::io::{ground_truth_path, preview, render_predicted, write_json, ReportInput};
use talk2task::{
    build_provider, read_ground_truth, read_transcript, CompletionConfig, CompletionProvider,
    ConversationArtifacts, DisabledProvider, Pipeline, PipelineConfig, PipelineRun,
    PromptRepository, RunReport,
};

#[derive(Parser)]
#[command(name = "talk2task")]
#[command(author, version, about = "Advisor-client transcript to action label pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every pipeline run
#[derive(clap::Args)]
struct PipelineArgs {
    /// Classifier prompt template (defaults to CLASSIFIER_PROMPT_PATH or prompts/classifier.txt)
    #[arg(long)]
    prompt: Option<PathBuf>,

    /// Language hint (ISO-639-1), skips detection
    #[arg(long)]
    lang: Option<String>,

    /// Never call the completion service; use the rule-based fallbacks
    #[arg(long)]
    offline: bool,

    /// Drop labels that end up without evidence spans during validation
    #[arg(long)]
    strict: bool,

    /// Minimum evidence spans for a final label
    #[arg(long)]
    min_spans: Option<usize>,

    /// Keep at most this many final labels
    #[arg(long)]
    top_k: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract action labels from a transcript
    Run {
        /// Input transcript file (plain text)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the conversation artifacts (JSON); stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Conversation title stored with the artifacts
        #[arg(long)]
        title: Option<String>,

        /// Include every intermediate stage result
        #[arg(long)]
        dump: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Run the pipeline on a transcript and score it against ground truth
    Eval {
        /// Transcript file (plain text)
        #[arg(short, long)]
        file: PathBuf,

        /// Ground-truth JSON (defaults to the transcript path with a .json extension)
        #[arg(long)]
        json: Option<PathBuf>,

        /// Include requests, candidates, validated labels and label metadata
        #[arg(long)]
        dump: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            output,
            title,
            dump,
            pipeline,
        } => {
            setup_logging(pipeline.verbose);
            run_transcript(input, output, title, dump, pipeline).await
        }
        Commands::Eval {
            file,
            json,
            dump,
            pipeline,
        } => {
            setup_logging(pipeline.verbose);
            eval_transcript(file, json, dump, pipeline).await
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn build_pipeline(args: &PipelineArgs) -> Result<Pipeline> {
    let mut config = PipelineConfig::from_env();
    if let Some(prompt) = &args.prompt {
        config.prompt_path = prompt.clone();
    }
    if args.strict {
        config.stage3.require_span = true;
    }
    if let Some(min_spans) = args.min_spans {
        config.stage4.min_spans = min_spans;
    }
    if args.top_k.is_some() {
        config.stage4.top_k = args.top_k;
    }

    let provider: Arc<dyn CompletionProvider> = if args.offline {
        info!("Offline mode: completion calls disabled");
        Arc::new(DisabledProvider)
    } else {
        let completion = CompletionConfig::from_env()
            .context("Completion service not configured (use --offline to skip it)")?;
        info!("Using {:?} model {}", completion.provider, completion.model);
        build_provider(completion)
    };

    Ok(Pipeline::new(
        provider,
        Arc::new(PromptRepository::new()),
        config,
    ))
}

#[derive(Serialize)]
struct DumpedRun<'a> {
    artifacts: &'a ConversationArtifacts,
    stages: &'a PipelineRun,
}

async fn run_transcript(
    input: PathBuf,
    output: Option<PathBuf>,
    title: Option<String>,
    dump: bool,
    args: PipelineArgs,
) -> Result<()> {
    info!("Loading transcript from {:?}", input);
    let raw = read_transcript(&input)?;
    let pipeline = build_pipeline(&args)?;

    let run = pipeline
        .run(&raw, args.lang.as_deref())
        .await
        .context("Pipeline run failed")?;

    if dump {
        let stages = run.clone();
        let artifacts = run.into_artifacts(&raw, title);
        write_json(
            &DumpedRun {
                artifacts: &artifacts,
                stages: &stages,
            },
            output.as_deref(),
        )?;
    } else {
        let artifacts = run.into_artifacts(&raw, title);
        write_json(&artifacts, output.as_deref())?;
    }

    if let Some(path) = output {
        info!("Artifacts written to {:?}", path);
    }
    Ok(())
}

async fn eval_transcript(
    file: PathBuf,
    json: Option<PathBuf>,
    dump: bool,
    args: PipelineArgs,
) -> Result<()> {
    info!("Evaluating transcript {:?}", file);
    let raw = read_transcript(&file)?;
    let json = json.unwrap_or_else(|| ground_truth_path(&file));
    let y_true = read_ground_truth(&json);

    let pipeline = build_pipeline(&args)?;
    let run = pipeline
        .run(&raw, args.lang.as_deref())
        .await
        .context("Pipeline run failed")?;

    let input = ReportInput {
        file_txt: file.display().to_string(),
        file_json: if y_true.is_some() {
            json.display().to_string()
        } else {
            "(missing)".to_string()
        },
        prompt: pipeline.config().prompt_path.display().to_string(),
        transcript_preview: preview(&run.preprocess.transcript_clean),
    };
    let report = RunReport::new(input, &run, y_true, dump)?;

    write_json(&report, None)?;
    println!();
    print!("{}", render_predicted(&run.finalized.labels_meta));
    Ok(())
}
