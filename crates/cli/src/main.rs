use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use highlight_cut_core::cache::domain::highlight_cache::HighlightCacheStore;
use highlight_cut_core::cache::infrastructure::json_file_cache_persistence::JsonFileCachePersistence;
use highlight_cut_core::pipeline::apply_highlight_cut_use_case::ApplyRequest;
use highlight_cut_core::pipeline::generate_plan_use_case::PlanRequest;
use highlight_cut_core::pipeline::highlight_tools::HighlightTools;
use highlight_cut_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use highlight_cut_core::pipeline::score_highlights_use_case::ScoreRequest;
use highlight_cut_core::pipeline::tool_result::ToolResult;
use highlight_cut_core::pipeline::trim_transcript_use_case::TrimRequest;
use highlight_cut_core::pipeline::validate_visual_use_case::VisualRequest;
use highlight_cut_core::scoring::infrastructure::directory_thumbnail_source::DirectoryThumbnailSource;
use highlight_cut_core::scoring::infrastructure::openai_compatible_provider::OpenAiCompatibleProvider;
use highlight_cut_core::shared::cancellation::CancellationToken;
use highlight_cut_core::shared::constants::{FRAME_CONCURRENCY_RANGE, MAX_TOLERANCE, MAX_VISUAL_TOP_N};
use highlight_cut_core::shared::settings::HighlightSettings;
use highlight_cut_core::timeline::infrastructure::json_file_timeline::{JsonFileTimeline, ProjectDocument};
use highlight_cut_core::transcript::domain::transcript_source::TranscriptSource;
use highlight_cut_core::transcript::infrastructure::json_transcript_source::JsonTranscriptSource;
use highlight_cut_core::transcript::infrastructure::whisper_cli_transcriber::WhisperCliTranscriber;

type CliError = Box<dyn std::error::Error + Send + Sync>;

/// Transcript-driven highlight cuts for a JSON project timeline.
#[derive(Parser)]
#[command(name = "highlight-cut")]
struct Cli {
    /// Project JSON file holding the timeline.
    project: PathBuf,

    /// Directory of `<asset>.json` transcripts (defaults to the project's directory).
    #[arg(long)]
    transcripts: Option<PathBuf>,

    /// Transcribe with the whisper CLI, reading media from this directory.
    #[arg(long)]
    whisper_media: Option<PathBuf>,

    /// Whisper model name.
    #[arg(long, default_value = "base")]
    whisper_model: String,

    /// Whisper timeout in seconds.
    #[arg(long, default_value = "1800")]
    whisper_timeout: u64,

    /// Directory of pre-extracted thumbnails (`<asset>/<ms>.jpg`).
    #[arg(long)]
    thumbnails: Option<PathBuf>,

    /// Settings file (defaults to the user config location).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Chat completions base URL, overriding settings.
    #[arg(long)]
    base_url: Option<String>,

    /// Text model, overriding settings.
    #[arg(long)]
    model: Option<String>,

    /// Score with rule features only.
    #[arg(long)]
    no_llm: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rank transcript chunks by highlight potential.
    Score(ScoreArgs),
    /// Re-rank the top candidates using their frames.
    ValidateVisual(VisualArgs),
    /// Select segments for the target duration.
    Plan(PlanArgs),
    /// Cut the timeline down to the plan.
    Apply(ApplyArgs),
    /// Delete transcript words from the timeline.
    Trim {
        /// Word indices to remove (comma-separated).
        #[arg(long, value_delimiter = ',', required = true)]
        words: Vec<usize>,
    },
    /// Score, validate (when thumbnails are given), plan and apply.
    Run {
        #[command(flatten)]
        score: ScoreArgs,
        #[command(flatten)]
        visual: VisualArgs,
        #[command(flatten)]
        plan: PlanArgs,
        #[command(flatten)]
        apply: ApplyArgs,
    },
}

#[derive(Args)]
struct ScoreArgs {
    /// Source asset id (defaults to the project's asset).
    #[arg(long)]
    asset: Option<String>,

    /// Minimum chunk length in seconds.
    #[arg(long)]
    segment_min: Option<f64>,

    /// Maximum chunk length in seconds.
    #[arg(long)]
    segment_max: Option<f64>,
}

#[derive(Args)]
struct VisualArgs {
    /// Number of top candidates to validate (1-20).
    #[arg(long)]
    top_n: Option<usize>,

    /// Concurrent vision requests (1-8).
    #[arg(long)]
    frame_concurrency: Option<usize>,
}

#[derive(Args)]
struct PlanArgs {
    /// Target highlight length in seconds.
    #[arg(long)]
    target: Option<f64>,

    /// Allowed deviation from the target (0.0-0.5).
    #[arg(long)]
    tolerance: Option<f64>,

    /// Do not promote a hook segment to the opening.
    #[arg(long)]
    no_hook: bool,
}

#[derive(Args)]
struct ApplyArgs {
    /// Add a caption track for the kept segments.
    #[arg(long)]
    captions: bool,

    /// Cut word gaps inside kept segments.
    #[arg(long)]
    remove_silence: bool,
}

fn main() {
    env_logger::init();

    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn run() -> Result<bool, CliError> {
    let cli = Cli::parse();
    validate(&cli)?;

    let settings = load_settings(&cli)?;
    let mut tools = build_tools(&cli, settings)?;
    let cancel = CancellationToken::new();

    let success = match &cli.command {
        Command::Score(args) => print_result(&tools.score_highlights(&score_request(&cli, args), &cancel))?,
        Command::ValidateVisual(args) => {
            print_result(&tools.validate_highlights_visual(&visual_request(args), &cancel))?
        }
        Command::Plan(args) => print_result(&tools.generate_highlight_plan(&plan_request(args), &cancel))?,
        Command::Apply(args) => print_result(&tools.apply_highlight_cut(&apply_request(args), &cancel))?,
        Command::Trim { words } => {
            let request = TrimRequest {
                video_asset_id: None,
                word_indices: words.clone(),
            };
            print_result(&tools.trim_transcript(&request, &cancel))?
        }
        Command::Run {
            score,
            visual,
            plan,
            apply,
        } => {
            print_result(&tools.score_highlights(&score_request(&cli, score), &cancel))?
                && (cli.thumbnails.is_none()
                    || print_result(&tools.validate_highlights_visual(&visual_request(visual), &cancel))?)
                && print_result(&tools.generate_highlight_plan(&plan_request(plan), &cancel))?
                && print_result(&tools.apply_highlight_cut(&apply_request(apply), &cancel))?
        }
    };

    tools.log_summary();
    Ok(success)
}

fn load_settings(cli: &Cli) -> Result<HighlightSettings, CliError> {
    let mut settings = match &cli.settings {
        Some(path) => HighlightSettings::load_from(path)?,
        None => HighlightSettings::load(),
    };
    if let Some(url) = &cli.base_url {
        settings.provider.base_url = url.clone();
    }
    if let Some(model) = &cli.model {
        settings.provider.model = model.clone();
    }
    Ok(settings)
}

fn build_tools(cli: &Cli, settings: HighlightSettings) -> Result<HighlightTools, CliError> {
    let document = ProjectDocument::load(&cli.project)?;
    let project_dir = cli
        .project
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let transcript_dir = cli.transcripts.clone().unwrap_or_else(|| project_dir.clone());

    let transcripts: Box<dyn TranscriptSource> = match &cli.whisper_media {
        Some(media_dir) => Box::new(
            WhisperCliTranscriber::new(
                media_dir,
                &transcript_dir,
                Duration::from_secs(cli.whisper_timeout),
            )
            .with_model(&cli.whisper_model),
        ),
        None => Box::new(JsonTranscriptSource::new(&transcript_dir)),
    };

    let cache = match settings.resolved_cache_dir() {
        Some(dir) => {
            log::debug!("Highlight cache at {}", dir.display());
            HighlightCacheStore::new(Box::new(JsonFileCachePersistence::new(&dir)))
        }
        None => HighlightCacheStore::default(),
    };

    let provider = if cli.no_llm {
        None
    } else {
        Some(OpenAiCompatibleProvider::new(&settings.provider)?)
    };

    let mut tools = HighlightTools::new(
        &document.id,
        Box::new(JsonFileTimeline::new(&cli.project)),
        transcripts,
        settings,
    )
    .with_cache(cache)
    .with_logger(Box::new(StdoutPipelineLogger::new()));
    if let Some(provider) = provider {
        tools = tools.with_provider(Box::new(provider));
    }
    if let Some(dir) = &cli.thumbnails {
        tools = tools.with_thumbnails(Box::new(DirectoryThumbnailSource::new(dir)));
    }
    if let Some(asset) = &document.asset_id {
        tools = tools.with_default_asset(asset);
    }
    Ok(tools)
}

fn score_request(cli: &Cli, args: &ScoreArgs) -> ScoreRequest {
    ScoreRequest {
        video_asset_id: args.asset.clone(),
        segment_min_seconds: args.segment_min,
        segment_max_seconds: args.segment_max,
        use_llm: Some(!cli.no_llm),
    }
}

fn visual_request(args: &VisualArgs) -> VisualRequest {
    VisualRequest {
        video_asset_id: None,
        top_n: args.top_n,
        frame_concurrency: args.frame_concurrency,
    }
}

fn plan_request(args: &PlanArgs) -> PlanRequest {
    PlanRequest {
        target_duration: args.target,
        tolerance: args.tolerance,
        include_hook: args.no_hook.then_some(false),
    }
}

fn apply_request(args: &ApplyArgs) -> ApplyRequest {
    ApplyRequest {
        add_captions: Some(args.captions),
        remove_silence: Some(args.remove_silence),
    }
}

fn print_result<T: Serialize>(result: &ToolResult<T>) -> Result<bool, CliError> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(result.success)
}

fn validate(cli: &Cli) -> Result<(), CliError> {
    if !cli.project.exists() {
        return Err(format!("Project file not found: {}", cli.project.display()).into());
    }
    for dir in [&cli.transcripts, &cli.whisper_media, &cli.thumbnails]
        .into_iter()
        .flatten()
    {
        if !dir.is_dir() {
            return Err(format!("Directory not found: {}", dir.display()).into());
        }
    }
    if cli.whisper_timeout == 0 {
        return Err("Whisper timeout must be positive".into());
    }

    let (visual, plan) = match &cli.command {
        Command::ValidateVisual(visual) => (Some(visual), None),
        Command::Plan(plan) => (None, Some(plan)),
        Command::Run { visual, plan, .. } => (Some(visual), Some(plan)),
        _ => (None, None),
    };
    if let Some(visual) = visual {
        if let Some(n) = visual.top_n {
            if !(1..=MAX_VISUAL_TOP_N).contains(&n) {
                return Err(format!("Top-N must be between 1 and {MAX_VISUAL_TOP_N}, got {n}").into());
            }
        }
        if let Some(c) = visual.frame_concurrency {
            let (lo, hi) = FRAME_CONCURRENCY_RANGE;
            if !(lo..=hi).contains(&c) {
                return Err(format!("Frame concurrency must be between {lo} and {hi}, got {c}").into());
            }
        }
    }
    if let Some(plan) = plan {
        if let Some(t) = plan.target {
            if t <= 0.0 {
                return Err(format!("Target must be positive, got {t}").into());
            }
        }
        if let Some(tol) = plan.tolerance {
            if !(0.0..=MAX_TOLERANCE).contains(&tol) {
                return Err(
                    format!("Tolerance must be between 0.0 and {MAX_TOLERANCE}, got {tol}").into(),
                );
            }
        }
    }
    Ok(())
}
