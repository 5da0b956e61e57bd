use crate::cache::domain::highlight_cache::HighlightCacheStore;
use crate::scoring::domain::chat_provider::ChatProvider;
use crate::scoring::domain::thumbnail_source::ThumbnailSource;
use crate::shared::cancellation::CancellationToken;
use crate::shared::settings::HighlightSettings;
use crate::timeline::domain::timeline_port::TimelinePort;
use crate::transcript::domain::transcript_source::TranscriptSource;

use super::apply_highlight_cut_use_case::{ApplyHighlightCutUseCase, ApplyRequest, ApplyResponse};
use super::generate_plan_use_case::{GeneratePlanUseCase, PlanRequest, PlanResponse};
use super::pipeline_context::PipelineContext;
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use super::score_highlights_use_case::{ScoreHighlightsUseCase, ScoreRequest, ScoreResponse};
use super::tool_result::ToolResult;
use super::trim_transcript_use_case::{TrimRequest, TrimResponse, TrimTranscriptUseCase};
use super::validate_visual_use_case::{ValidateVisualUseCase, VisualRequest, VisualResponse};

/// The highlight tool surface for one project.
///
/// Operations are meant to run in order (score, optionally validate, plan,
/// apply); each later one needs the previous one's fingerprint-fresh output
/// and fails with a stable error code otherwise. Nothing here returns a bare
/// error.
pub struct HighlightTools {
    project_id: String,
    default_asset_id: Option<String>,
    timeline: Box<dyn TimelinePort>,
    transcripts: Box<dyn TranscriptSource>,
    provider: Option<Box<dyn ChatProvider>>,
    thumbnails: Option<Box<dyn ThumbnailSource>>,
    cache: HighlightCacheStore,
    settings: HighlightSettings,
    logger: Box<dyn PipelineLogger>,
}

impl HighlightTools {
    pub fn new(
        project_id: &str,
        timeline: Box<dyn TimelinePort>,
        transcripts: Box<dyn TranscriptSource>,
        settings: HighlightSettings,
    ) -> Self {
        Self {
            project_id: project_id.to_string(),
            default_asset_id: None,
            timeline,
            transcripts,
            provider: None,
            thumbnails: None,
            cache: HighlightCacheStore::default(),
            settings,
            logger: Box::new(NullPipelineLogger),
        }
    }

    pub fn with_provider(mut self, provider: Box<dyn ChatProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_thumbnails(mut self, thumbnails: Box<dyn ThumbnailSource>) -> Self {
        self.thumbnails = Some(thumbnails);
        self
    }

    pub fn with_cache(mut self, cache: HighlightCacheStore) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_default_asset(mut self, asset_id: &str) -> Self {
        self.default_asset_id = Some(asset_id.to_string());
        self
    }

    pub fn settings(&self) -> &HighlightSettings {
        &self.settings
    }

    pub fn log_summary(&self) {
        self.logger.summary();
    }

    fn parts(&mut self) -> (PipelineContext<'_>, &mut dyn PipelineLogger) {
        let ctx = PipelineContext {
            project_id: &self.project_id,
            default_asset_id: self.default_asset_id.as_deref(),
            timeline: self.timeline.as_ref(),
            transcripts: self.transcripts.as_ref(),
            provider: self.provider.as_deref(),
            thumbnails: self.thumbnails.as_deref(),
            cache: &self.cache,
            settings: &self.settings,
        };
        (ctx, self.logger.as_mut())
    }

    pub fn score_highlights(
        &mut self,
        request: &ScoreRequest,
        cancel: &CancellationToken,
    ) -> ToolResult<ScoreResponse> {
        let (ctx, logger) = self.parts();
        ToolResult::from_result(
            ScoreHighlightsUseCase::new(ctx)
                .run(request, cancel, logger)
                .map(|response| {
                    let message = if response.from_cache {
                        format!("Reused {} cached scored segments", response.segments.len())
                    } else {
                        format!("Scored {} segments", response.segments.len())
                    };
                    let (warnings, degraded) = (response.warnings.clone(), response.degraded);
                    ToolResult::ok(response, message).with_warnings(warnings, degraded)
                }),
        )
    }

    pub fn validate_highlights_visual(
        &mut self,
        request: &VisualRequest,
        cancel: &CancellationToken,
    ) -> ToolResult<VisualResponse> {
        let (ctx, logger) = self.parts();
        ToolResult::from_result(
            ValidateVisualUseCase::new(ctx)
                .run(request, cancel, logger)
                .map(|response| {
                    let message = format!(
                        "Validated {} candidates, {} with usable frames",
                        response.candidates, response.valid_frames
                    );
                    let (warnings, degraded) = (response.warnings.clone(), response.degraded);
                    ToolResult::ok(response, message).with_warnings(warnings, degraded)
                }),
        )
    }

    pub fn generate_highlight_plan(
        &mut self,
        request: &PlanRequest,
        cancel: &CancellationToken,
    ) -> ToolResult<PlanResponse> {
        let (ctx, logger) = self.parts();
        ToolResult::from_result(
            GeneratePlanUseCase::new(ctx)
                .run(request, cancel, logger)
                .map(|response| {
                    let message = format!(
                        "Planned {} segments, {:.1}s of {:.1}s target",
                        response.plan.segments.len(),
                        response.plan.actual_duration,
                        response.plan.target_duration
                    );
                    let warnings = response.warnings.clone();
                    ToolResult::ok(response, message).with_warnings(warnings, false)
                }),
        )
    }

    pub fn apply_highlight_cut(
        &mut self,
        request: &ApplyRequest,
        cancel: &CancellationToken,
    ) -> ToolResult<ApplyResponse> {
        let (ctx, logger) = self.parts();
        ToolResult::from_result(
            ApplyHighlightCutUseCase::new(ctx)
                .run(request, cancel, logger)
                .map(|response| {
                    let message = format!(
                        "Timeline cut from {:.1}s to {:.1}s",
                        response.diff.original_duration, response.diff.final_duration
                    );
                    let warnings = response.warnings.clone();
                    ToolResult::ok(response, message).with_warnings(warnings, false)
                }),
        )
    }

    pub fn trim_transcript(
        &mut self,
        request: &TrimRequest,
        cancel: &CancellationToken,
    ) -> ToolResult<TrimResponse> {
        let (ctx, logger) = self.parts();
        ToolResult::from_result(TrimTranscriptUseCase::new(ctx).run(request, cancel, logger).map(
            |response| {
                let message = format!(
                    "Removed {} words ({:.2}s)",
                    response.words_removed, response.diff.removed_duration
                );
                ToolResult::ok(response, message)
            },
        ))
    }
}
