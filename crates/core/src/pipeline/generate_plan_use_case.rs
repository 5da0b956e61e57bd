use serde::Serialize;

use crate::selection::domain::highlight_plan::HighlightPlan;
use crate::selection::domain::segment_selector::SegmentSelector;
use crate::shared::cancellation::CancellationToken;

use super::highlight_error::HighlightError;
use super::pipeline_context::PipelineContext;
use super::pipeline_logger::{timed, PipelineLogger};

#[derive(Clone, Debug, Default)]
pub struct PlanRequest {
    pub target_duration: Option<f64>,
    pub tolerance: Option<f64>,
    pub include_hook: Option<bool>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    #[serde(flatten)]
    pub plan: HighlightPlan,
    #[serde(skip)]
    pub warnings: Vec<String>,
}

pub struct GeneratePlanUseCase<'a> {
    ctx: PipelineContext<'a>,
}

impl<'a> GeneratePlanUseCase<'a> {
    pub fn new(ctx: PipelineContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn run(
        &self,
        request: &PlanRequest,
        cancel: &CancellationToken,
        logger: &mut dyn PipelineLogger,
    ) -> Result<PlanResponse, HighlightError> {
        cancel.check()?;
        let settings = self.ctx.settings;
        let snapshot = self.ctx.snapshot()?;
        let state = self.ctx.scored_state(&snapshot)?;
        let segments = state.scored_segments.unwrap_or_default();

        let selector = SegmentSelector::new(
            request.target_duration.unwrap_or(settings.target_duration),
            request.tolerance.unwrap_or(settings.tolerance),
            request.include_hook.unwrap_or(settings.include_hook),
        );
        let plan = timed(logger, "select", || selector.select(&segments));
        if plan.is_empty() {
            return Err(HighlightError::EmptyPlan);
        }

        let mut warnings = Vec::new();
        if plan.actual_duration < plan.min_duration() || plan.actual_duration > plan.max_duration() {
            warnings.push(format!(
                "Plan runs {:.1}s, outside the {:.1}s-{:.1}s window",
                plan.actual_duration,
                plan.min_duration(),
                plan.max_duration()
            ));
        }
        logger.info(&format!(
            "Planned {} of {} segments, {:.1}s",
            plan.segments.len(),
            plan.total_segments,
            plan.actual_duration
        ));

        self.ctx.cache.update(self.ctx.project_id, |state| {
            state.highlight_plan = Some(plan.clone());
        });
        Ok(PlanResponse { plan, warnings })
    }
}
